use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::errors::{Result, SimulationError};
use crate::simulate::phenotype::PhenotypeSimulator;

/// CSV tables with one record per row and a header naming the fields.
pub trait TableIO: Sized {
    fn write_table<W: io::Write>(records: &[Self], writer: W) -> Result<()>;
    fn read_table<R: io::Read>(reader: R) -> Result<Vec<Self>>;

    fn write_table_to_file(records: &[Self], path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|err| {
            SimulationError::WriteError(format!("Failed to create {}: {err}", path.display()))
        })?;
        log::info!("Writing {} records to {}.", records.len(), path.display());
        Self::write_table(records, io::BufWriter::new(file))
    }

    fn read_table_from_file(path: &Path) -> Result<Vec<Self>> {
        let file = std::fs::File::open(path).map_err(|err| {
            SimulationError::ReadError(format!("Failed to open {}: {err}", path.display()))
        })?;
        let records = Self::read_table(io::BufReader::new(file))?;
        log::info!("Read {} records from {}.", records.len(), path.display());
        Ok(records)
    }
}

impl<T: Serialize + DeserializeOwned> TableIO for T {
    fn write_table<W: io::Write>(records: &[Self], writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in records {
            writer.serialize(record).map_err(|err| {
                SimulationError::WriteError(format!("Failed to write record: {err}"))
            })?;
        }
        writer
            .flush()
            .map_err(|err| SimulationError::WriteError(format!("Failed to flush table: {err}")))
    }

    fn read_table<R: io::Read>(reader: R) -> Result<Vec<Self>> {
        csv::Reader::from_reader(reader)
            .deserialize()
            .enumerate()
            .map(|(idx, record)| {
                record.map_err(|err| {
                    SimulationError::ReadError(format!("Failed to parse record {}: {err}", idx + 1))
                })
            })
            .collect()
    }
}

/// Effect of a single amino-acid mutation on the latent phenotype.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MutationEffectRow {
    pub mutation: String,
    pub effect: f64,
}

/// Mutational effects of `simulator` ordered by site and mutant amino acid.
pub fn mutation_effect_rows(simulator: &PhenotypeSimulator) -> Vec<MutationEffectRow> {
    let mut effects: Vec<_> = simulator.mutation_effects().iter().collect();
    effects.sort_by_key(|(substitution, _)| (substitution.site, substitution.mutant));
    effects
        .into_iter()
        .map(|(substitution, effect)| MutationEffectRow {
            mutation: substitution.to_string(),
            effect: *effect,
        })
        .collect()
}
