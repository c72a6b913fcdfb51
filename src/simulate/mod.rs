//! The three simulation stages: barcoded variants, their phenotypes, and sequencing counts.

pub mod counts;
pub mod phenotype;
pub mod variants;

pub use counts::{
    CountSpec, PostSample, PreSample, PreSampleCount, SampleCount, SimulatedPreSample,
    simulate_sample_counts,
};
pub use phenotype::{ConstantPhenotype, PhenotypeFunction, PhenotypeModel, PhenotypeSimulator};
pub use variants::{VariantSpec, simulate_codon_variant_table, simulate_variants};
