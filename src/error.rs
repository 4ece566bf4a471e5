//! Error types for impyla-bridge.
//!
//! Defines the error enum shared by both adapters. Every variant maps to the
//! `error_type` tag reported in the JSON response.

use thiserror::Error;

/// Main error type for adapter operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Connection or authentication failures (host unreachable, bad credentials, etc.)
    #[error("{0}")]
    Connection(String),

    /// SQL syntax or analysis failures reported by the engine.
    #[error("{0}")]
    SqlSyntax(String),

    /// Any other failure while executing or fetching a query.
    #[error("{0}")]
    Query(String),

    /// Template could not be parsed.
    #[error("{message}")]
    TemplateSyntax {
        message: String,
        line: Option<usize>,
    },

    /// Template referenced a variable or function that does not exist.
    #[error("{0}")]
    Undefined(String),

    /// Any other template engine failure, tagged with the engine's error kind.
    #[error("{message}")]
    Template { kind: String, message: String },

    /// The request document on stdin was not valid.
    #[error("Invalid JSON input: {0}")]
    MalformedInput(String),

    /// Command-line arguments could not be parsed.
    #[error("Invalid arguments: {0}")]
    Usage(String),

    /// Internal failures (I/O on stdio, runtime setup, etc.)
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an SQL syntax error with the given message.
    pub fn sql_syntax(msg: impl Into<String>) -> Self {
        Self::SqlSyntax(msg.into())
    }

    /// Creates a generic query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a template syntax error, optionally pointing at a line.
    pub fn template_syntax(msg: impl Into<String>, line: Option<usize>) -> Self {
        Self::TemplateSyntax {
            message: msg.into(),
            line,
        }
    }

    /// Creates an undefined-variable error with the given message.
    pub fn undefined(msg: impl Into<String>) -> Self {
        Self::Undefined(msg.into())
    }

    /// Creates a template error carrying the engine's error kind name.
    pub fn template(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Creates a malformed-input error with the given message.
    pub fn malformed_input(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Creates a usage error with the given message.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the `error_type` tag written to the JSON response.
    pub fn error_type(&self) -> &str {
        match self {
            Self::Connection(_) => "ConnectionError",
            Self::SqlSyntax(_) => "SQLSyntaxError",
            Self::Query(_) => "GenericError",
            Self::TemplateSyntax { .. } => "TemplateSyntaxError",
            Self::Undefined(_) => "UndefinedError",
            Self::Template { kind, .. } => kind,
            Self::MalformedInput(_) => "MalformedInputError",
            Self::Usage(_) => "UsageError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Returns the error category as a string for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::SqlSyntax(_) | Self::Query(_) => "Query Error",
            Self::TemplateSyntax { .. } | Self::Undefined(_) | Self::Template { .. } => {
                "Template Error"
            }
            Self::MalformedInput(_) | Self::Usage(_) => "Input Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the template line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::TemplateSyntax { line, .. } => *line,
            _ => None,
        }
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
