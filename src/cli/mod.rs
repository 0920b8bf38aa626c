//! Command line interface for the `log-ingest` binary

pub mod commands;
pub mod error;
pub mod store;

pub use error::CliError;
pub use store::ConfiguredStore;
