//! Driver seam: the trait a graph database client implements.
//!
//! The connection layer is driver-agnostic. Everything above this trait
//! (retry, classification, transactions, logging) works against a plain
//! synchronous call surface, which also makes fakes trivial in tests.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ConnectionConfig;

/// One result row keyed by RETURN item name.
pub type Row = Map<String, Value>;

/// Failure surfaced by a driver. Drivers report free-text messages; the
/// connection layer classifies them, see [`super::errors::classify`].
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait GraphDriver {
    fn connect(&mut self, config: &ConnectionConfig) -> Result<(), DriverError>;

    fn disconnect(&mut self);

    /// Run a read statement and return its rows.
    fn run_query(&mut self, text: &str, params: &Map<String, Value>)
        -> Result<Vec<Row>, DriverError>;

    /// Run a write statement and return the affected-entity count.
    fn run_statement(
        &mut self,
        text: &str,
        params: &Map<String, Value>,
    ) -> Result<u64, DriverError>;

    fn begin_tx(&mut self) -> Result<(), DriverError>;

    fn commit_tx(&mut self) -> Result<(), DriverError>;

    fn rollback_tx(&mut self) -> Result<(), DriverError>;
}
