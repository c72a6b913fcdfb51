//! Reading wildtype sequences and reading or writing simulation tables.

mod sequence;
mod tables;

pub use sequence::{read_wildtype, read_wildtype_from};
pub use tables::{MutationEffectRow, TableIO, mutation_effect_rows};
