//! Driver abstraction layer.
//!
//! Provides a trait-based interface over the wire-protocol driver so the
//! query executor can fetch, cap and classify results without knowing which
//! engine sits on the other end.

mod mock;
mod postgres;
mod types;

pub use mock::{CallLog, MockDriver};
pub use postgres::PostgresDriver;
pub use types::{Row, Value};

use crate::config::ConnectionConfig;
use async_trait::async_trait;
use thiserror::Error;

/// Structured hint a driver attaches when it knows what kind of failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The engine could not be reached or refused the credentials.
    Connection,
    /// The statement failed to parse or analyze.
    Syntax,
    /// A fetched value could not be converted to a cell.
    Data,
}

/// Error reported by a driver.
///
/// `class` is `None` when the driver exposes no structured code; callers then
/// fall back to inspecting `message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    pub class: Option<FailureClass>,
}

impl DriverError {
    /// Creates an unclassified driver error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            class: None,
        }
    }

    /// Creates a driver error known to be a connection failure.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            class: Some(FailureClass::Connection),
        }
    }

    /// Creates a driver error known to be a syntax/analysis failure.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            class: Some(FailureClass::Syntax),
        }
    }
}

impl DriverError {
    /// Creates a driver error for a value that could not be converted.
    pub fn data(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            class: Some(FailureClass::Data),
        }
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opens connections to the engine.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opens a new connection using the supplied parameters.
    async fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Connection>>;
}

/// A single open connection.
#[async_trait]
pub trait Connection: Send {
    /// Executes one statement and returns a cursor over its result set.
    ///
    /// Statements without a result description yield a cursor with no columns.
    async fn execute<'c>(&'c mut self, sql: &'c str) -> DriverResult<Box<dyn Cursor + 'c>>;

    /// Closes the connection. Later calls are no-ops.
    async fn close(&mut self) -> DriverResult<()>;
}

/// A result set being read row by row.
#[async_trait]
pub trait Cursor: Send {
    /// Column names of the result set, empty for statements without results.
    fn columns(&self) -> &[String];

    /// Fetches the next row, or `None` once the result set is exhausted.
    async fn fetch_one(&mut self) -> DriverResult<Option<Row>>;

    /// Fetches up to `limit` rows.
    async fn fetch_many(&mut self, limit: usize) -> DriverResult<Vec<Row>> {
        let mut rows = Vec::with_capacity(limit.min(1024));
        while rows.len() < limit {
            match self.fetch_one().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Releases the cursor. Later calls are no-ops.
    async fn close(&mut self) -> DriverResult<()>;
}
