//! impyla-bridge - JSON-over-stdio adapters for SQL queries and SQL templates.
//!
//! This library exposes the core modules for use by the binaries and
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod plugins;
pub mod query;
pub mod template;
