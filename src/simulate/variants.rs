//! Simulation of barcoded codon variant libraries.

use itertools::Itertools;
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::rng::with_default_rng;
use crate::core::substitutions::{NucleotideSubstitution, join_substitutions};
use crate::core::variants::{CodonVariantTable, VariantRow, decode_gene};
use crate::encoding::{CODONS, Codon, NUCLEOTIDES};
use crate::errors::{Result, SimulationError};

/// Safety factor between barcode complexity and the number of variants in a library.
const BARCODE_COMPLEXITY_FACTOR: u128 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LibrarySpec {
    pub name: String,

    /// Mean of the Poisson distribution of codon mutations per variant.
    pub average_mutations: f64,

    pub variant_count: usize,
}

/// Number of sequences supporting each barcode-variant call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum VariantCallSupport {
    /// Every variant has the same support.
    Fixed(u32),
    /// Support is drawn uniformly from the inclusive range.
    Range(u32, u32),
}

impl Default for VariantCallSupport {
    fn default() -> Self {
        VariantCallSupport::Fixed(1)
    }
}

impl VariantCallSupport {
    fn bounds(&self) -> (u32, u32) {
        match *self {
            VariantCallSupport::Fixed(support) => (support, support),
            VariantCallSupport::Range(low, high) => (low, high),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VariantSpec {
    pub barcode_length: usize,
    pub libraries: Vec<LibrarySpec>,
    #[serde(default)]
    pub variant_call_support: VariantCallSupport,
}

impl VariantSpec {
    fn validate(&self) -> Result<()> {
        if self.libraries.is_empty() {
            return Err(SimulationError::ConfigurationError(
                "empty library specifications".to_string(),
            ));
        }

        if let Some(name) = self
            .libraries
            .iter()
            .map(|library| &library.name)
            .duplicates()
            .next()
        {
            return Err(SimulationError::ConfigurationError(format!(
                "library {name} is specified more than once"
            )));
        }

        let (low, high) = self.variant_call_support.bounds();
        if low > high {
            return Err(SimulationError::ConfigurationError(format!(
                "invalid variant call support range ({low}, {high})"
            )));
        }

        let complexity = (NUCLEOTIDES.len() as u128).checked_pow(self.barcode_length as u32);
        for library in self.libraries.iter() {
            if !library.average_mutations.is_finite() || library.average_mutations < 0. {
                return Err(SimulationError::ConfigurationError(format!(
                    "invalid average mutations {} for library {}",
                    library.average_mutations, library.name
                )));
            }
            let required = BARCODE_COMPLEXITY_FACTOR * library.variant_count as u128;
            if complexity.is_some_and(|complexity| required > complexity) {
                return Err(SimulationError::ConfigurationError(format!(
                    "barcode length {} too short for {} variants in library {}",
                    self.barcode_length, library.variant_count, library.name
                )));
            }
        }

        Ok(())
    }
}

/// Simulate barcoded variants of `geneseq`.
///
/// If `seed` is given, the default generator is reseeded before simulating.
pub fn simulate_variants(
    geneseq: &str,
    spec: &VariantSpec,
    seed: Option<u64>,
) -> Result<Vec<VariantRow>> {
    with_default_rng(seed, |rng| simulate_variants_with_rng(geneseq, spec, rng))
}

/// Simulate barcoded variants of `geneseq` and collect them in a [`CodonVariantTable`].
pub fn simulate_codon_variant_table(
    geneseq: &str,
    spec: &VariantSpec,
    seed: Option<u64>,
) -> Result<CodonVariantTable> {
    let rows = simulate_variants(geneseq, spec, seed)?;
    CodonVariantTable::new(geneseq, &rows)
}

pub fn simulate_variants_with_rng<R: Rng + ?Sized>(
    geneseq: &str,
    spec: &VariantSpec,
    rng: &mut R,
) -> Result<Vec<VariantRow>> {
    let geneseq = geneseq.to_uppercase();
    let codons = decode_gene(&geneseq)?;
    spec.validate()?;

    let mutation_distributions = spec
        .libraries
        .iter()
        .map(|library| {
            if library.average_mutations == 0. {
                return Ok(None);
            }
            Poisson::new(library.average_mutations)
                .map(Some)
                .map_err(|e| SimulationError::ConfigurationError(format!("{}", e)))
        })
        .collect::<Result<Vec<Option<Poisson<f64>>>>>()?;

    let (low, high) = spec.variant_call_support.bounds();
    let mut rows = Vec::with_capacity(spec.libraries.iter().map(|lib| lib.variant_count).sum());

    for (library, mutation_distribution) in spec.libraries.iter().zip(mutation_distributions) {
        log::debug!(
            "Simulating {} variants for library {}...",
            library.variant_count,
            library.name
        );
        let mut existing_barcodes: HashSet<String> = HashSet::with_capacity(library.variant_count);

        for _ in 0..library.variant_count {
            let mut barcode = random_barcode(rng, spec.barcode_length);
            while existing_barcodes.contains(&barcode) {
                barcode = random_barcode(rng, spec.barcode_length);
            }
            existing_barcodes.insert(barcode.clone());

            let variant_call_support = rng.random_range(low..=high);

            let n_mutations = mutation_distribution
                .as_ref()
                .map_or(0, |distribution| distribution.sample(rng) as usize);
            let substitutions = random_substitutions(rng, &codons, n_mutations)?;

            rows.push(VariantRow {
                barcode,
                substitutions: join_substitutions(&substitutions),
                library: library.name.clone(),
                variant_call_support,
            });
        }
    }

    log::info!(
        "Simulated {} variants in {} libraries.",
        rows.len(),
        spec.libraries.len()
    );

    Ok(rows)
}

fn random_barcode<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| NUCLEOTIDES[rng.random_range(0..NUCLEOTIDES.len())].encode() as char)
        .collect()
}

/// Mutate `n_mutations` distinct codons and list the resulting nucleotide substitutions in
/// increasing position.
fn random_substitutions<R: Rng + ?Sized>(
    rng: &mut R,
    codons: &[Codon],
    n_mutations: usize,
) -> Result<Vec<NucleotideSubstitution>> {
    if n_mutations > codons.len() {
        return Err(SimulationError::ExhaustionError(format!(
            "cannot place {} codon mutations in a gene of {} codons",
            n_mutations,
            codons.len()
        )));
    }

    let mut substitutions = Vec::new();
    let mut sites = rand::seq::index::sample(rng, codons.len(), n_mutations).into_vec();
    sites.sort_unstable();

    for idx in sites {
        let wildtype = codons[idx];
        let mutant = random_mutant_codon(rng, &wildtype);
        for (offset, (wt_nt, mut_nt)) in wildtype
            .nucleotides()
            .iter()
            .zip(mutant.nucleotides())
            .enumerate()
        {
            if wt_nt != mut_nt {
                substitutions.push(NucleotideSubstitution {
                    wildtype: *wt_nt,
                    position: 3 * idx + offset + 1,
                    mutant: *mut_nt,
                });
            }
        }
    }

    Ok(substitutions)
}

/// Draw a codon uniformly among all codons other than `wildtype`.
pub(crate) fn random_mutant_codon<R: Rng + ?Sized>(rng: &mut R, wildtype: &Codon) -> Codon {
    let candidates: Vec<Codon> = CODONS.iter().filter(|c| *c != wildtype).copied().collect();
    // 63 candidates, never empty
    *candidates.choose(rng).unwrap_or(wildtype)
}
