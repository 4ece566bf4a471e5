//! Mock driver for testing.
//!
//! Serves a scripted result set from memory and records every connect, fetch
//! and close so tests can check the executor's fetch and cleanup discipline.

use super::{Connection, Cursor, Driver, DriverError, DriverResult, Row, Value};
use crate::config::ConnectionConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters shared between a mock driver and everything it hands out.
#[derive(Debug, Default)]
pub struct CallLog {
    connects: AtomicUsize,
    rows_fetched: AtomicUsize,
    cursors_closed: AtomicUsize,
    connections_closed: AtomicUsize,
}

impl CallLog {
    /// Number of successful connects.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of rows pulled from cursors, including probe fetches.
    pub fn rows_fetched(&self) -> usize {
        self.rows_fetched.load(Ordering::SeqCst)
    }

    /// Number of cursors closed.
    pub fn cursors_closed(&self) -> usize {
        self.cursors_closed.load(Ordering::SeqCst)
    }

    /// Number of connections closed.
    pub fn connections_closed(&self) -> usize {
        self.connections_closed.load(Ordering::SeqCst)
    }
}

/// A mock driver that returns a predefined result set.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    columns: Vec<String>,
    rows: Vec<Row>,
    connect_error: Option<DriverError>,
    execute_error: Option<DriverError>,
    fetch_error: Option<(usize, DriverError)>,
    close_error: Option<DriverError>,
    log: Arc<CallLog>,
}

impl MockDriver {
    /// Creates a mock driver whose statements return no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves the given columns and rows for every statement.
    pub fn with_result(mut self, columns: &[&str], rows: Vec<Row>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.rows = rows;
        self
    }

    /// Serves a single `n` column holding `0..count`.
    pub fn with_row_count(self, count: usize) -> Self {
        let rows = (0..count).map(|i| vec![Value::Int(i as i64)]).collect();
        self.with_result(&["n"], rows)
    }

    /// Fails every connect with `error`.
    pub fn failing_connect(mut self, error: DriverError) -> Self {
        self.connect_error = Some(error);
        self
    }

    /// Fails every execute with `error`.
    pub fn failing_execute(mut self, error: DriverError) -> Self {
        self.execute_error = Some(error);
        self
    }

    /// Fails the fetch of the row at `index` with `error`.
    pub fn failing_fetch_at(mut self, index: usize, error: DriverError) -> Self {
        self.fetch_error = Some((index, error));
        self
    }

    /// Fails every cursor and connection close with `error`.
    pub fn failing_close(mut self, error: DriverError) -> Self {
        self.close_error = Some(error);
        self
    }

    /// Returns the call log shared with connections and cursors.
    pub fn log(&self) -> Arc<CallLog> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn connect(&self, _config: &ConnectionConfig) -> DriverResult<Box<dyn Connection>> {
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        self.log.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            script: self.clone(),
            closed: false,
        }))
    }
}

struct MockConnection {
    script: MockDriver,
    closed: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute<'c>(&'c mut self, _sql: &'c str) -> DriverResult<Box<dyn Cursor + 'c>> {
        if self.closed {
            return Err(DriverError::new("connection already closed"));
        }
        if let Some(error) = &self.script.execute_error {
            return Err(error.clone());
        }
        Ok(Box::new(MockCursor {
            script: &self.script,
            position: 0,
            closed: false,
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.script
            .log
            .connections_closed
            .fetch_add(1, Ordering::SeqCst);
        match &self.script.close_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

struct MockCursor<'c> {
    script: &'c MockDriver,
    position: usize,
    closed: bool,
}

#[async_trait]
impl<'c> Cursor for MockCursor<'c> {
    fn columns(&self) -> &[String] {
        &self.script.columns
    }

    async fn fetch_one(&mut self) -> DriverResult<Option<Row>> {
        if let Some((index, error)) = &self.script.fetch_error {
            if *index == self.position {
                return Err(error.clone());
            }
        }
        let row = self.script.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
            self.script.log.rows_fetched.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.script.log.cursors_closed.fetch_add(1, Ordering::SeqCst);
        match &self.script.close_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
