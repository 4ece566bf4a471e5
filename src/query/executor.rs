//! Single-statement query execution.
//!
//! Opens a connection, runs one statement, fetches up to the row cap and
//! releases the cursor and connection on every exit path.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::classify::classify;
use crate::config::QueryRequest;
use crate::db::{Connection, Cursor, Driver, DriverResult, Row};
use crate::error::Result;

/// Query executor that runs one statement per request.
pub struct QueryExecutor<'a> {
    driver: &'a dyn Driver,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(driver: &'a dyn Driver) -> Self {
        Self { driver }
    }

    /// Executes the request and returns the outcome or a classified error.
    ///
    /// Close failures are logged and never replace the outcome.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let start = Instant::now();

        let mut conn = self
            .driver
            .connect(&request.connection)
            .await
            .map_err(classify)?;

        let fetched = fetch_statement(conn.as_mut(), &request.sql, request.max_rows).await;
        let execution_time = start.elapsed();

        if let Err(e) = conn.close().await {
            warn!("Ignoring error while closing connection: {e}");
        }

        let batch = fetched.map_err(classify)?;
        info!(
            "Fetched {} rows in {:?} (has_more: {})",
            batch.rows.len(),
            execution_time,
            batch.has_more
        );

        Ok(QueryOutcome {
            columns: batch.columns,
            rows: batch.rows,
            has_more: batch.has_more,
            execution_time,
        })
    }
}

/// Successful query execution outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Column names, empty for statements without results.
    pub columns: Vec<String>,
    /// Rows, at most `max_rows` of them.
    pub rows: Vec<Row>,
    /// Whether at least one row existed beyond the cap.
    pub has_more: bool,
    /// Wall clock from connect-start to fetch-complete.
    pub execution_time: Duration,
}

#[derive(Debug)]
struct ResultBatch {
    columns: Vec<String>,
    rows: Vec<Row>,
    has_more: bool,
}

/// Runs `sql` and fetches its rows, closing the cursor before returning.
async fn fetch_statement(
    conn: &mut dyn Connection,
    sql: &str,
    max_rows: usize,
) -> DriverResult<ResultBatch> {
    debug!("Executing statement ({} bytes)", sql.len());
    let mut cursor = conn.execute(sql).await?;

    let fetched = fetch_capped(cursor.as_mut(), max_rows).await;

    if let Err(e) = cursor.close().await {
        warn!("Ignoring error while closing cursor: {e}");
    }

    fetched
}

/// Pulls at most `max_rows` rows, then probes one more to detect truncation.
async fn fetch_capped(cursor: &mut dyn Cursor, max_rows: usize) -> DriverResult<ResultBatch> {
    let columns = cursor.columns().to_vec();
    if columns.is_empty() {
        return Ok(ResultBatch {
            columns,
            rows: Vec::new(),
            has_more: false,
        });
    }

    let rows = cursor.fetch_many(max_rows).await?;

    let has_more = if rows.len() == max_rows {
        match cursor.fetch_one().await {
            Ok(next) => next.is_some(),
            Err(e) => {
                debug!("Probe fetch failed, assuming no more rows: {e}");
                false
            }
        }
    } else {
        false
    };

    Ok(ResultBatch {
        columns,
        rows,
        has_more,
    })
}
