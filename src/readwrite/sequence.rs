use seq_io::fasta;
use std::io;

use crate::errors::{Result, SimulationError};

/// Read the wildtype gene from the first record of a FASTA file.
pub fn read_wildtype(path: &str) -> Result<String> {
    let reader = fasta::Reader::from_path(path)
        .map_err(|err| SimulationError::ReadError(format!("Failed to open {path}: {err}")))?;
    read_first_record(reader, path)
}

/// Read the wildtype gene from the first FASTA record of `reader`.
pub fn read_wildtype_from<R: io::Read>(reader: R) -> Result<String> {
    read_first_record(fasta::Reader::new(reader), "input")
}

fn read_first_record<R: io::Read>(mut reader: fasta::Reader<R>, source: &str) -> Result<String> {
    let record = reader
        .next()
        .ok_or_else(|| SimulationError::ReadError(format!("No sequence found in {source}")))?
        .map_err(|err| {
            SimulationError::ReadError(format!("Failed to read sequence from {source}: {err}"))
        })?;

    let sequence: Vec<u8> = record
        .full_seq()
        .iter()
        .filter(|byte| !byte.is_ascii_whitespace())
        .map(u8::to_ascii_uppercase)
        .collect();
    let sequence = String::from_utf8(sequence).map_err(|_| {
        SimulationError::ReadError(format!("Sequence in {source} is not valid text"))
    })?;

    log::debug!("Read wildtype of length {} from {source}.", sequence.len());
    Ok(sequence)
}
