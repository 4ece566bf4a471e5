//! Connection integration tests.
//!
//! Tests connection failures end to end through the PostgreSQL driver.

use impyla_bridge::config::{AuthMechanism, ConnectionConfig, QueryRequest};
use impyla_bridge::db::PostgresDriver;
use impyla_bridge::query::{run_query, QueryExecutor};

/// Helper to get test connection settings from the environment.
fn get_test_config() -> Option<ConnectionConfig> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ConnectionConfig::from_connection_string(&url).ok()
}

fn request(connection: ConnectionConfig, sql: &str) -> QueryRequest {
    QueryRequest {
        connection,
        sql: sql.to_string(),
        max_rows: 100,
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_to_unknown_host() {
    let mut config = ConnectionConfig::new("bad-host");
    config.port = 21050;
    config.timeout = 5;

    let response = run_query(&PostgresDriver::new(), &request(config, "SELECT 1")).await;

    assert!(!response.success);
    assert_eq!(response.error_type.as_deref(), Some("ConnectionError"));
    assert!(response.rows.is_none());
    assert!(response.columns.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_to_closed_port() {
    let mut config = ConnectionConfig::new("127.0.0.1");
    config.port = 1;
    config.timeout = 5;

    let error = QueryExecutor::new(&PostgresDriver::new())
        .execute(&request(config, "SELECT 1"))
        .await
        .unwrap_err();

    assert_eq!(error.error_type(), "ConnectionError");
    assert!(
        error.to_string().contains("127.0.0.1:1"),
        "Expected target in message, got: {error}"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_kerberos_is_reported_as_connection_error() {
    let mut config = ConnectionConfig::new("localhost");
    config.auth_mechanism = AuthMechanism::Kerberos;

    let response = run_query(&PostgresDriver::new(), &request(config, "SELECT 1")).await;
    assert_eq!(response.error_type.as_deref(), Some("ConnectionError"));
}

#[tokio::test]
async fn test_wrong_password() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.auth_mechanism = AuthMechanism::Plain;
    config.password = Some("definitely-not-the-password".to_string());
    if config.user().is_none() {
        config.user = Some("postgres".to_string());
    }

    let response = run_query(&PostgresDriver::new(), &request(config, "SELECT 1")).await;
    // Trust authentication accepts any password, so only check failures.
    if !response.success {
        assert_eq!(response.error_type.as_deref(), Some("ConnectionError"));
    }
}

#[tokio::test]
async fn test_unknown_database() {
    let Some(mut config) = get_test_config() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    config.database = "impyla_bridge_missing_db".to_string();

    let response = run_query(&PostgresDriver::new(), &request(config, "SELECT 1")).await;
    assert!(!response.success);
    assert_eq!(response.error_type.as_deref(), Some("ConnectionError"));
}
