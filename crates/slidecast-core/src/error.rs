//! Unified error type for slidecast.
//!
//! All crates funnel their failures into [`Error`]. Callers never see the
//! variant zoo directly: [`Error::kind`] collapses it onto the four kinds a
//! render can fail with, and [`Error::report`] produces the structured result
//! handed back across the API boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unified error type covering all failure modes in slidecast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data failed validation (missing files, unknown effect, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "preset", "ledger entry").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The encoding engine failed while producing the artifact.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Diagnostic text reported by the engine.
        message: String,
    },

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Media probing failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A filesystem operation on a named resource failed.
    #[error("System error ({context}): {source}")]
    System {
        /// What was being attempted (e.g. "write ledger /data/ledger.json").
        context: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The operation was cancelled or timed out.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The caller-visible failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Encoding,
    System,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Encoding => "encoding",
            ErrorKind::System => "system",
        };
        f.write_str(s)
    }
}

/// Structured error result: a kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    /// Collapse this error onto its caller-visible kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Encoding { .. } | Error::Tool { .. } | Error::Probe(_) => ErrorKind::Encoding,
            Error::Io { .. } | Error::System { .. } | Error::Cancelled(_) | Error::Internal(_) => {
                ErrorKind::System
            }
        }
    }

    /// Build the structured report for this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Encoding { .. } => 500,
            Error::Tool { .. } => 502,
            Error::Probe(_) => 422,
            Error::Io { .. } => 500,
            Error::System { .. } => 500,
            Error::Cancelled(_) => 499,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Encoding`].
    pub fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::System`].
    pub fn system(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::System {
            context: context.into(),
            source,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
