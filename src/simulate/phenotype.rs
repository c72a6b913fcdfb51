//! Phenotype model for simulated variants.
//!
//! Effects of amino-acid mutations on a latent phenotype are drawn once from a compound normal
//! distribution (a weighted mixture of Gaussians). Mutations to stop codons share one fixed
//! effect. The latent phenotype of a variant is the wildtype latent phenotype plus the sum of its
//! mutational effects, and maps to the observed phenotype through a sigmoid.

use rand::Rng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::rng::with_default_rng;
use crate::core::substitutions::{AaSubstitution, parse_substitutions};
use crate::core::variants::{BarcodeVariant, decode_gene};
use crate::encoding::{AMINO_ACIDS, STOP};
use crate::errors::{Result, SimulationError};

/// A function mapping a variant to a non-negative phenotype.
///
/// The phenotype is the expected enrichment of the variant relative to wildtype after selection,
/// so values above 1 are beneficial.
///
/// Phenotypes are evaluated while `simulate_sample_counts` holds the default generator, so
/// implementations must not call seeded entry points such as [`PhenotypeSimulator::new`]; those
/// calls fail with a `SamplingError`.
pub trait PhenotypeFunction {
    fn phenotype(&self, variant: &BarcodeVariant) -> Result<f64>;
}

impl<F> PhenotypeFunction for F
where
    F: Fn(&BarcodeVariant) -> Result<f64>,
{
    fn phenotype(&self, variant: &BarcodeVariant) -> Result<f64> {
        self(variant)
    }
}

/// Assigns the same phenotype to every variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPhenotype(pub f64);

impl PhenotypeFunction for ConstantPhenotype {
    fn phenotype(&self, _variant: &BarcodeVariant) -> Result<f64> {
        Ok(self.0)
    }
}

/// One Gaussian of the compound normal distribution of mutational effects.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NormalComponent {
    /// Relative weight; weights of all components need not sum to one.
    pub weight: f64,
    pub mean: f64,
    pub sd: f64,
}

impl NormalComponent {
    pub fn new(weight: f64, mean: f64, sd: f64) -> Self {
        Self { weight, mean, sd }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PhenotypeModel {
    /// Seed for the default generator; `None` continues the current stream.
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,

    /// Latent phenotype of the wildtype.
    #[serde(default = "default_wt_latent")]
    pub wt_latent: f64,

    /// Compound normal distribution of mutational effects on the latent phenotype.
    #[serde(default = "default_components")]
    pub components: Vec<NormalComponent>,

    /// Effect of a stop codon at any site.
    #[serde(default = "default_stop_effect")]
    pub stop_effect: f64,
}

fn default_seed() -> Option<u64> {
    Some(1)
}

fn default_wt_latent() -> f64 {
    1.
}

fn default_components() -> Vec<NormalComponent> {
    vec![
        NormalComponent::new(0.4, -0.5, 1.),
        NormalComponent::new(0.6, -5., 2.5),
    ]
}

fn default_stop_effect() -> f64 {
    -10.
}

impl Default for PhenotypeModel {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            wt_latent: default_wt_latent(),
            components: default_components(),
            stop_effect: default_stop_effect(),
        }
    }
}

impl PhenotypeModel {
    fn validate(&self) -> Result<()> {
        if !self.wt_latent.is_finite() || !self.stop_effect.is_finite() {
            return Err(SimulationError::ConfigurationError(format!(
                "wildtype latent phenotype ({}) and stop effect ({}) must be finite",
                self.wt_latent, self.stop_effect
            )));
        }
        if self.components.is_empty() {
            return Err(SimulationError::ConfigurationError(
                "compound normal distribution has no components".to_string(),
            ));
        }
        for component in self.components.iter() {
            if !component.mean.is_finite() || !component.sd.is_finite() || component.sd < 0. {
                return Err(SimulationError::ConfigurationError(format!(
                    "invalid compound normal component {:?}",
                    component
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhenotypeSimulator {
    wt_latent: f64,
    mutation_effects: HashMap<AaSubstitution, f64>,
}

impl PhenotypeSimulator {
    /// Draw mutational effects for `geneseq` with the default generator.
    pub fn new(geneseq: &str, model: &PhenotypeModel) -> Result<Self> {
        with_default_rng(model.seed, |rng| Self::with_rng(geneseq, model, rng))
    }

    /// Draw mutational effects for `geneseq` with `rng`, ignoring `model.seed`.
    pub fn with_rng<R: Rng + ?Sized>(
        geneseq: &str,
        model: &PhenotypeModel,
        rng: &mut R,
    ) -> Result<Self> {
        let codons = decode_gene(&geneseq.to_uppercase())?;
        model.validate()?;

        // weights are relative, so a component is always selected
        let selector = WeightedIndex::new(model.components.iter().map(|c| c.weight)).map_err(|e| {
            SimulationError::ConfigurationError(format!("invalid compound normal weights: {}", e))
        })?;
        let normals = model
            .components
            .iter()
            .map(|c| {
                Normal::new(c.mean, c.sd)
                    .map_err(|e| SimulationError::ConfigurationError(format!("{}", e)))
            })
            .collect::<Result<Vec<Normal<f64>>>>()?;

        let mut mutation_effects = HashMap::with_capacity(codons.len() * (AMINO_ACIDS.len() - 1));
        for (idx, codon) in codons.iter().enumerate() {
            let wt_aa = codon.translate();
            for &mut_aa in AMINO_ACIDS.iter().filter(|&&aa| aa != wt_aa) {
                let effect = if mut_aa == STOP {
                    model.stop_effect
                } else {
                    normals[selector.sample(rng)].sample(rng)
                };
                mutation_effects.insert(AaSubstitution::new(wt_aa, idx + 1, mut_aa), effect);
            }
        }

        log::debug!(
            "Drew {} mutational effects for {} sites.",
            mutation_effects.len(),
            codons.len()
        );

        Ok(Self {
            wt_latent: model.wt_latent,
            mutation_effects,
        })
    }

    pub fn wt_latent(&self) -> f64 {
        self.wt_latent
    }

    /// Effects of every single amino-acid mutation on the latent phenotype.
    pub fn mutation_effects(&self) -> &HashMap<AaSubstitution, f64> {
        &self.mutation_effects
    }

    pub fn mutation_effect(&self, substitution: &AaSubstitution) -> Result<f64> {
        self.mutation_effects
            .get(substitution)
            .copied()
            .ok_or_else(|| {
                SimulationError::LookupError(format!("no mutational effect for {substitution}"))
            })
    }

    pub fn latent_phenotype_of(&self, substitutions: &[AaSubstitution]) -> Result<f64> {
        substitutions
            .iter()
            .try_fold(self.wt_latent, |acc, substitution| {
                Ok(acc + self.mutation_effect(substitution)?)
            })
    }

    /// Latent phenotype of space-delimited amino-acid substitutions such as `M1V *3R`.
    pub fn latent_phenotype_from_str(&self, substitutions: &str) -> Result<f64> {
        let substitutions: Vec<AaSubstitution> =
            parse_substitutions(substitutions).map_err(|e| match e {
                SimulationError::ParseError(message) => SimulationError::LookupError(message),
                e => e,
            })?;
        self.latent_phenotype_of(&substitutions)
    }

    pub fn latent_phenotype(&self, variant: &BarcodeVariant) -> Result<f64> {
        self.latent_phenotype_of(&variant.aa_substitutions)
    }

    pub fn observed_phenotype(&self, variant: &BarcodeVariant) -> Result<f64> {
        Ok(Self::latent_to_observed_phenotype(
            self.latent_phenotype(variant)?,
        ))
    }

    /// Sigmoid transform from latent to observed phenotype.
    pub fn latent_to_observed_phenotype(latent: f64) -> f64 {
        1. / (1. + (-latent - 3.).exp())
    }
}

impl PhenotypeFunction for PhenotypeSimulator {
    fn phenotype(&self, variant: &BarcodeVariant) -> Result<f64> {
        self.observed_phenotype(variant)
    }
}
