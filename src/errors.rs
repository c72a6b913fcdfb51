//! All errors that can occur in the dmsim library.

use std::fmt;

pub type Result<T> = std::result::Result<T, SimulationError>;

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationError {
    /// Invalid inputs, detected before any random numbers are drawn.
    ConfigurationError(String),
    /// Malformed substitution or sequence strings.
    ParseError(String),
    /// A random draw could not be satisfied, e.g. no unmutated site is left.
    ExhaustionError(String),
    /// A substitution without an entry in the mutational effect table.
    LookupError(String),
    /// Degenerate probability vectors or invalid phenotype values.
    SamplingError(String),
    ReadError(String),
    WriteError(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::ConfigurationError(message) => {
                write!(f, "ConfigurationError: {}", message)
            }
            SimulationError::ParseError(message) => write!(f, "ParseError: {}", message),
            SimulationError::ExhaustionError(message) => {
                write!(f, "ExhaustionError: {}", message)
            }
            SimulationError::LookupError(message) => write!(f, "LookupError: {}", message),
            SimulationError::SamplingError(message) => write!(f, "SamplingError: {}", message),
            SimulationError::ReadError(message) => write!(f, "ReadError: {}", message),
            SimulationError::WriteError(message) => write!(f, "WriteError: {}", message),
        }
    }
}

impl std::error::Error for SimulationError {}
