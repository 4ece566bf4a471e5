//! PostgreSQL wire-protocol driver.
//!
//! Provides `PostgresDriver`, which opens a single sqlx connection (no pool)
//! and streams rows lazily so the executor only pulls what it needs.

use super::{Connection, Cursor, Driver, DriverError, DriverResult, Row, Value};
use crate::config::{AuthMechanism, ConnectionConfig};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgDatabaseError, PgRow, PgSslMode};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{
    Column as SqlxColumn, ConnectOptions, Connection as SqlxConnection, Executor, Row as SqlxRow,
    Statement, TypeInfo, ValueRef,
};
use tracing::debug;

/// Application name reported to the server.
const APPLICATION_NAME: &str = "impyla-bridge";

/// PostgreSQL wire-protocol driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

impl PostgresDriver {
    /// Creates a new driver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn connect(&self, config: &ConnectionConfig) -> DriverResult<Box<dyn Connection>> {
        let options = connect_options(config)?;
        debug!("Connecting to {}", config.display_string());

        let result = if config.timeout == 0 {
            options.connect().await
        } else {
            tokio::time::timeout(config.timeout(), options.connect())
                .await
                .map_err(|_| {
                    DriverError::connection(format!(
                        "Connection to {}:{} timed out after {} seconds",
                        config.host, config.port, config.timeout
                    ))
                })?
        };

        let conn = result.map_err(|e| map_connection_error(e, config))?;
        debug!("Connected to {}", config.display_string());
        Ok(Box::new(PostgresConnection { conn: Some(conn) }))
    }
}

/// Builds sqlx connect options from the request's connection settings.
fn connect_options(config: &ConnectionConfig) -> DriverResult<PgConnectOptions> {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .application_name(APPLICATION_NAME);

    if config.timeout > 0 {
        options = options.options([("statement_timeout", config.timeout * 1000)]);
    }

    match config.auth_mechanism {
        AuthMechanism::Kerberos => {
            return Err(DriverError::connection(format!(
                "Cannot connect to {}:{}: authentication mechanism {} is not supported by this driver",
                config.host,
                config.port,
                config.auth_mechanism.as_str()
            )));
        }
        mechanism => {
            if let Some(user) = config.user() {
                options = options.username(user);
            }
            if mechanism.sends_credentials() {
                if let Some(password) = config.password() {
                    options = options.password(password);
                }
            }
        }
    }

    options = if config.use_ssl {
        match config.ca_cert() {
            Some(ca_cert) => options
                .ssl_mode(PgSslMode::VerifyCa)
                .ssl_root_cert(ca_cert),
            None => options.ssl_mode(PgSslMode::Require),
        }
    } else {
        options.ssl_mode(PgSslMode::Disable)
    };

    Ok(options)
}

/// An open PostgreSQL connection. `None` once closed.
struct PostgresConnection {
    conn: Option<PgConnection>,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn execute<'c>(&'c mut self, sql: &'c str) -> DriverResult<Box<dyn Cursor + 'c>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DriverError::new("connection already closed"))?;

        // Describe first so statements without a result set run to completion
        // instead of being streamed.
        let columns: Vec<String> = {
            let statement = Executor::prepare(&mut *conn, sql)
                .await
                .map_err(map_error)?;
            statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect()
        };

        if columns.is_empty() {
            let outcome = sqlx::query(sql)
                .execute(&mut *conn)
                .await
                .map_err(map_error)?;
            debug!("Statement affected {} rows", outcome.rows_affected());
            return Ok(Box::new(PostgresCursor {
                columns,
                rows: None,
            }));
        }

        let rows = sqlx::query(sql).fetch(conn);
        Ok(Box::new(PostgresCursor {
            columns,
            rows: Some(rows),
        }))
    }

    async fn close(&mut self) -> DriverResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().await.map_err(map_error),
            None => Ok(()),
        }
    }
}

/// Lazily streamed result set. `rows` is `None` for statements without
/// results and after close.
struct PostgresCursor<'c> {
    columns: Vec<String>,
    rows: Option<BoxStream<'c, Result<PgRow, sqlx::Error>>>,
}

#[async_trait]
impl<'c> Cursor for PostgresCursor<'c> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn fetch_one(&mut self) -> DriverResult<Option<Row>> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        let row = rows.try_next().await.map_err(map_error)?;
        row.as_ref().map(convert_row).transpose()
    }

    async fn close(&mut self) -> DriverResult<()> {
        // Dropping the stream abandons any rows still in flight.
        self.rows = None;
        Ok(())
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> DriverResult<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let type_name = col.type_info().name();
            convert_value(row, i, type_name).map_err(|e| {
                DriverError::data(format!(
                    "Cannot decode column '{}' of type {type_name}: {e}",
                    col.name()
                ))
            })
        })
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Only SQL NULL becomes `Value::Null`; a value that cannot be decoded is an
/// error.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<T, sqlx::Error>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<T, _>(index)
    }

    fn text(value: impl ToString) -> Value {
        Value::String(value.to_string())
    }

    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => Value::Bool(get(row, index)?),
        "INT2" | "SMALLINT" => Value::Int(get::<i16>(row, index)? as i64),
        "INT4" | "INT" | "INTEGER" => Value::Int(get::<i32>(row, index)? as i64),
        "INT8" | "BIGINT" => Value::Int(get(row, index)?),
        "OID" => Value::Int(get::<Oid>(row, index)?.0 as i64),
        "FLOAT4" | "REAL" => Value::Float(get::<f32>(row, index)? as f64),
        "FLOAT8" | "DOUBLE PRECISION" => Value::Float(get(row, index)?),
        "NUMERIC" | "DECIMAL" => text(get::<Decimal>(row, index)?),
        "MONEY" => text(get::<PgMoney>(row, index)?.to_decimal(2)),
        "BYTEA" => Value::Bytes(get(row, index)?),
        "DATE" => text(get::<NaiveDate>(row, index)?),
        "TIME" => text(get::<NaiveTime>(row, index)?),
        "TIMESTAMP" => text(get::<NaiveDateTime>(row, index)?),
        "TIMESTAMPTZ" => Value::String(get::<DateTime<Utc>>(row, index)?.to_rfc3339()),
        "INTERVAL" => Value::String(format_interval(&get::<PgInterval>(row, index)?)),
        "UUID" => text(get::<Uuid>(row, index)?),
        "JSON" | "JSONB" => Value::Json(get(row, index)?),
        "VOID" => Value::Null,

        "BOOL[]" => json_array(get::<Vec<Option<bool>>>(row, index)?),
        "INT2[]" => json_array(get::<Vec<Option<i16>>>(row, index)?),
        "INT4[]" => json_array(get::<Vec<Option<i32>>>(row, index)?),
        "INT8[]" => json_array(get::<Vec<Option<i64>>>(row, index)?),
        "FLOAT4[]" => json_array(get::<Vec<Option<f32>>>(row, index)?),
        "FLOAT8[]" => json_array(get::<Vec<Option<f64>>>(row, index)?),
        "NUMERIC[]" => json_array(to_strings(get::<Vec<Option<Decimal>>>(row, index)?)),
        "UUID[]" => json_array(to_strings(get::<Vec<Option<Uuid>>>(row, index)?)),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            json_array(get::<Vec<Option<String>>>(row, index)?)
        }

        // Everything else must decode as text.
        _ => Value::String(get(row, index)?),
    };

    Ok(value)
}

fn json_array<T: Into<JsonValue>>(items: Vec<Option<T>>) -> Value {
    Value::Json(JsonValue::Array(
        items
            .into_iter()
            .map(|item| item.map_or(JsonValue::Null, Into::into))
            .collect(),
    ))
}

fn to_strings<T: ToString>(items: Vec<Option<T>>) -> Vec<Option<String>> {
    items
        .into_iter()
        .map(|item| item.map(|v| v.to_string()))
        .collect()
}

/// Formats an interval as an ISO 8601 duration, e.g. `P1M2DT3.5S`.
fn format_interval(interval: &PgInterval) -> String {
    let sign = if interval.microseconds < 0 { "-" } else { "" };
    let micros = interval.microseconds.unsigned_abs();
    let (secs, frac) = (micros / 1_000_000, micros % 1_000_000);

    let seconds = if frac == 0 {
        format!("{sign}{secs}")
    } else {
        let frac = format!("{frac:06}");
        format!("{sign}{secs}.{}", frac.trim_end_matches('0'))
    };
    format!("P{}M{}DT{seconds}S", interval.months, interval.days)
}

/// Maps errors raised while connecting, naming the target in the message.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> DriverError {
    let mut mapped = map_error(error);
    if mapped.class.is_none() {
        // Anything that fails before the session exists is a connection problem.
        mapped.class = Some(super::FailureClass::Connection);
    }
    mapped.message = format!(
        "Cannot connect to {}:{}: {}",
        config.host, config.port, mapped.message
    );
    mapped
}

/// Maps a sqlx error to a driver error, classifying it where the error is structured.
fn map_error(error: sqlx::Error) -> DriverError {
    let message = format_error(&error);

    match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DriverError::connection(message),
        sqlx::Error::Database(db_error) => match db_error.code().as_deref() {
            // 08: connection exception, 28: invalid authorization, 3D000: unknown database
            Some(code) if code.starts_with("08") || code.starts_with("28") || code == "3D000" => {
                DriverError::connection(message)
            }
            // 42: syntax error or access rule violation (includes unknown tables/columns)
            Some(code) if code.starts_with("42") => DriverError::syntax(message),
            _ => DriverError::new(message),
        },
        _ => DriverError::new(message),
    }
}

/// Formats an error with the server's detail and hint when available.
fn format_error(error: &sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
