//! Query execution and the query adapter's response document.

mod classify;
mod executor;

pub use classify::{class_from_message, classify};
pub use executor::{QueryExecutor, QueryOutcome};

use crate::config::QueryRequest;
use crate::db::{Driver, Row};
use crate::error::BridgeError;
use serde::Serialize;
use tracing::warn;

/// Response document written by the query adapter.
///
/// Result fields are present only on success; `error` fields only on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl QueryResponse {
    /// Builds a success response from an execution outcome.
    pub fn success(outcome: QueryOutcome) -> Self {
        Self {
            success: true,
            row_count: Some(outcome.rows.len()),
            columns: Some(outcome.columns),
            rows: Some(outcome.rows),
            execution_time_ms: Some(outcome.execution_time.as_millis() as u64),
            has_more: Some(outcome.has_more),
            error: None,
            error_type: None,
        }
    }

    /// Builds a failure response from a classified error.
    pub fn failure(error: &BridgeError) -> Self {
        Self {
            success: false,
            columns: None,
            rows: None,
            row_count: None,
            execution_time_ms: None,
            has_more: None,
            error: Some(error.to_string()),
            error_type: Some(error.error_type().to_string()),
        }
    }
}

/// Runs a query request against `driver` and builds its response document.
pub async fn run_query(driver: &dyn Driver, request: &QueryRequest) -> QueryResponse {
    match QueryExecutor::new(driver).execute(request).await {
        Ok(outcome) => QueryResponse::success(outcome),
        Err(e) => {
            warn!("{}: {}", e.category(), e);
            QueryResponse::failure(&e)
        }
    }
}
