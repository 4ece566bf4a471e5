//! Failure classification for driver errors.

use crate::db::{DriverError, FailureClass};
use crate::error::BridgeError;

/// Substrings that mark a failure to reach or authenticate with the engine.
const CONNECTION_HINTS: &[&str] = &["connect"];

/// Substrings that mark a statement the engine could not parse or analyze.
const SYNTAX_HINTS: &[&str] = &["syntax", "parse", "analysis"];

/// Converts a driver error into the adapter's error taxonomy.
///
/// The driver's structured class wins; otherwise the message is searched for
/// keyword hints, connection hints first.
pub fn classify(error: DriverError) -> BridgeError {
    let class = error
        .class
        .or_else(|| class_from_message(&error.message));

    match class {
        Some(FailureClass::Connection) => BridgeError::connection(error.message),
        Some(FailureClass::Syntax) => BridgeError::sql_syntax(error.message),
        Some(FailureClass::Data) | None => BridgeError::query(error.message),
    }
}

/// Infers a failure class from error text alone.
pub fn class_from_message(message: &str) -> Option<FailureClass> {
    let message = message.to_lowercase();

    if CONNECTION_HINTS.iter().any(|hint| message.contains(hint)) {
        Some(FailureClass::Connection)
    } else if SYNTAX_HINTS.iter().any(|hint| message.contains(hint)) {
        Some(FailureClass::Syntax)
    } else {
        None
    }
}
