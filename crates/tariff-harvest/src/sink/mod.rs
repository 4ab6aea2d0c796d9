//! Destinations for the final, deduplicated collection.
//!
//! Every destination implements [`DatasetSink`]; the run command builds the
//! set selected by configuration and hands each the same sorted records.

pub mod json;
pub mod sqlite;

pub use json::JsonFileSink;
pub use sqlite::SqliteSink;

use crate::config::{HarvestConfig, SinkKind};
use crate::types::{HsCodeRecord, WriteError};

/// Something the final records can be written to.
pub trait DatasetSink {
    /// Human-readable destination, for logs.
    fn describe(&self) -> String;

    fn write(&mut self, records: &[HsCodeRecord]) -> Result<(), WriteError>;
}

/// Open every sink the configuration asks for.
///
/// Opening happens before any fetching so an unusable output path aborts
/// the run up front.
pub fn open_sinks(config: &HarvestConfig) -> Result<Vec<Box<dyn DatasetSink>>, WriteError> {
    let mut sinks: Vec<Box<dyn DatasetSink>> = Vec::new();

    if matches!(config.sink, SinkKind::Json | SinkKind::Both) {
        sinks.push(Box::new(JsonFileSink::create(&config.output)?));
    }
    if matches!(config.sink, SinkKind::Sqlite | SinkKind::Both) {
        sinks.push(Box::new(SqliteSink::open(&config.database_path())?));
    }

    Ok(sinks)
}
