//! Integration tests for impyla-bridge.
//!
//! Set DATABASE_URL to also run the live database tests.

pub mod cli_test;
pub mod connection_test;
pub mod template_test;
