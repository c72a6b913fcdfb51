//! Sampling helpers for frequency and count vectors.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Gamma, Normal};

use crate::errors::{Result, SimulationError};

/// Normalize non-negative weights to sum to one.
///
/// Returns `None` if any weight is negative or non-finite, or if all weights are zero.
pub fn normalize(weights: &[f64]) -> Option<Vec<f64>> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.) {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if !(total > 0.) || !total.is_finite() {
        return None;
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// Draw `n` trials from a multinomial with (possibly unnormalized) `weights`.
///
/// The draw is a chain of conditional binomials, so the counts always sum to `n`.
pub fn multinomial<R: Rng + ?Sized>(rng: &mut R, n: u64, weights: &[f64]) -> Result<Vec<u64>> {
    let probabilities = normalize(weights).ok_or_else(|| {
        SimulationError::SamplingError(format!(
            "invalid multinomial weights over {} categories",
            weights.len()
        ))
    })?;

    let last = probabilities.len() - 1;
    let mut counts = Vec::with_capacity(probabilities.len());
    let mut remaining = n;
    let mut remaining_mass = 1.;
    for (idx, p) in probabilities.into_iter().enumerate() {
        if remaining == 0 {
            counts.push(0);
            continue;
        }
        if idx == last {
            counts.push(remaining);
            remaining = 0;
            continue;
        }
        let q = if remaining_mass > 0. {
            (p / remaining_mass).clamp(0., 1.)
        } else {
            1.
        };
        let draw = Binomial::new(remaining, q)
            .map_err(|e| SimulationError::SamplingError(format!("{}", e)))?
            .sample(rng);
        counts.push(draw);
        remaining -= draw;
        remaining_mass -= p;
    }

    Ok(counts)
}

/// Draw a frequency vector of length `size` from a symmetric Dirichlet distribution.
pub fn dirichlet<R: Rng + ?Sized>(
    rng: &mut R,
    concentration: f64,
    size: usize,
) -> Result<Vec<f64>> {
    let gamma = Gamma::new(concentration, 1.)
        .map_err(|e| SimulationError::SamplingError(format!("{}", e)))?;
    let draws: Vec<f64> = (0..size).map(|_| gamma.sample(rng)).collect();
    normalize(&draws).ok_or_else(|| {
        SimulationError::SamplingError(format!(
            "Dirichlet draw with concentration {concentration} degenerated to zero"
        ))
    })
}

/// Draw `size` multiplicative noise factors from `Normal(1, sd)`, clipped below at zero.
///
/// A standard deviation of zero yields factors of exactly one without consuming randomness.
pub fn noise_factors<R: Rng + ?Sized>(rng: &mut R, sd: f64, size: usize) -> Result<Vec<f64>> {
    if sd == 0. {
        return Ok(vec![1.; size]);
    }
    let normal = Normal::new(1., sd).map_err(|e| SimulationError::SamplingError(format!("{}", e)))?;
    Ok((0..size).map(|_| normal.sample(rng).max(0.)).collect())
}
