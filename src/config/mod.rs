//! Configuration data structures for simulation setups.

mod settings;

pub use settings::{Settings, SettingsError};
