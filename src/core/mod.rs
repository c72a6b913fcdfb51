//! This module contains the core datatypes of the library.

pub mod rng;
pub mod sampling;
pub mod substitutions;
pub mod variants;

pub use substitutions::{AaSubstitution, CodonSubstitution, NucleotideSubstitution};
pub use variants::{BarcodeVariant, CodonVariantTable, VariantRow};
