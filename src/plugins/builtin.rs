//! Native plugins compiled into the render adapter.
//!
//! Referenced from `plugin_paths` as `builtin:<name>`.

use chrono::{Datelike, Local, NaiveDate, TimeDelta};
use minijinja::value::Kwargs;
use minijinja::{Error, ErrorKind, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Names of the available native plugins.
pub const BUILTIN_PLUGINS: &[&str] = &["date_utils"];

/// Returns the symbols of the native plugin called `name`, if there is one.
pub fn lookup(name: &str) -> Option<Vec<(String, Value)>> {
    match name {
        "date_utils" => Some(date_utils()),
        _ => None,
    }
}

fn date_utils() -> Vec<(String, Value)> {
    vec![
        ("today".to_string(), Value::from_function(today)),
        ("days_ago".to_string(), Value::from_function(days_ago)),
        (
            "first_of_month".to_string(),
            Value::from_function(first_of_month),
        ),
        ("format_list".to_string(), Value::from_function(format_list)),
    ]
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn today() -> String {
    local_today().format(DATE_FORMAT).to_string()
}

fn days_ago(n: i64) -> Result<String, Error> {
    let date = TimeDelta::try_days(n)
        .and_then(|delta| local_today().checked_sub_signed(delta))
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("days_ago({n}) is out of range"),
            )
        })?;
    Ok(date.format(DATE_FORMAT).to_string())
}

fn first_of_month() -> String {
    let today = local_today();
    today
        .with_day(1)
        .unwrap_or(today)
        .format(DATE_FORMAT)
        .to_string()
}

/// Joins `items` for a SQL `IN` list, single-quoting each one unless
/// called with `quote=false`.
fn format_list(items: Vec<Value>, kwargs: Kwargs) -> Result<String, Error> {
    let quote = kwargs.get::<Option<bool>>("quote")?.unwrap_or(true);
    kwargs.assert_all_used()?;

    let formatted: Vec<String> = items
        .iter()
        .map(|item| {
            let text = match item.as_str() {
                Some(s) => s.to_string(),
                None => item.to_string(),
            };
            if quote {
                format!("'{}'", text.replace('\'', "''"))
            } else {
                text
            }
        })
        .collect();
    Ok(formatted.join(", "))
}
