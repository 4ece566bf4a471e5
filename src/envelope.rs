//! The JSON envelope shared by both adapters.
//!
//! A request arrives as one JSON document; a response leaves as one JSON
//! document followed by a newline.

use crate::error::{BridgeError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use tracing::error;

/// Exit code for well-formed input, whatever the `success` flag says.
pub const EXIT_OK: i32 = 0;

/// Exit code for malformed input or an uncaught failure.
pub const EXIT_FAILURE: i32 = 1;

/// Parses a request document.
///
/// Both invalid JSON and a document of the wrong shape are malformed input.
pub fn parse_request<T: DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input).map_err(|e| BridgeError::malformed_input(e.to_string()))
}

/// Writes `response` as a single JSON document plus a trailing newline.
pub fn write_response<W, T>(mut writer: W, response: &T, pretty: bool) -> Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let encoded = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    }
    .map_err(|e| BridgeError::internal(format!("Failed to encode response: {e}")))?;

    writeln!(writer, "{encoded}")
        .and_then(|()| writer.flush())
        .map_err(|e| BridgeError::internal(format!("Failed to write response: {e}")))
}

/// Top-level failure payload, used when no adapter response could be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub success: bool,
    pub error: String,
    pub error_type: String,
}

impl ErrorPayload {
    /// Builds a payload from an error.
    pub fn new(error: &BridgeError) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            error_type: error.error_type().to_string(),
        }
    }

    /// The process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

/// Logs `error`, writes its payload to stdout and returns the exit code.
pub fn report_failure(error: &BridgeError, pretty: bool) -> i32 {
    error!("{}: {}", error.category(), error);
    let payload = ErrorPayload::new(error);
    if let Err(e) = write_response(std::io::stdout().lock(), &payload, pretty) {
        error!("{e}");
    }
    payload.exit_code()
}
