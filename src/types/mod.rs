#![forbid(unsafe_code)]

//! Error types shared by the connection manager, metadata engine and plan model.

use std::fmt;

use thiserror::Error;

use crate::db::ConfigError;

/// Failure reported by the underlying database driver.
///
/// The `title` is the machine-readable classification of the failure (for
/// example `CredentialsExpired`) and is what callers match on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverError {
    /// Full status code, e.g. `Neo.ClientError.Security.CredentialsExpired`.
    pub code: Option<String>,
    /// Last segment of the status code.
    pub title: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl DriverError {
    /// Creates an unclassified driver error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            title: None,
            message: message.into(),
        }
    }

    /// Creates a driver error from a dotted status code; the title is derived
    /// from the last segment.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let title = code.rsplit('.').next().map(str::to_owned);
        Self {
            code: Some(code),
            title,
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// A single shape mismatch found while decoding a schema payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeIssue {
    /// Dotted path of the offending field, e.g. `Person.properties.id.indexed`.
    pub path: String,
    /// Kind the decoder expected.
    pub expected: &'static str,
    /// Kind actually present, or `missing`.
    pub found: &'static str,
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.path, self.expected, self.found
        )
    }
}

/// Every issue found in one payload. Decoding never yields partial output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeErrors {
    /// Individual issues in payload order.
    pub issues: Vec<DecodeIssue>,
}

impl DecodeErrors {
    pub(crate) fn push(
        &mut self,
        path: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) {
        self.issues.push(DecodeIssue {
            path: path.into(),
            expected,
            found,
        });
    }

    /// Returns `true` when no issue was recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of recorded issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }
}

impl fmt::Display for DecodeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Error propagated verbatim from the driver.
    #[error("driver: {0}")]
    Driver(#[from] DriverError),
    /// The connection has been closed.
    #[error("not connected")]
    NotConnected,
    /// A single row was expected but the result was empty.
    #[error("result contains no records")]
    NoRecord,
    /// A single row was expected but more were produced.
    #[error("result contains more than one record")]
    MultipleRecords,
    /// A value did not have the expected shape.
    #[error("unexpected value at {path}: expected {expected}, found {found}")]
    UnexpectedValue {
        /// Where the value was read from.
        path: String,
        /// Expected value kind.
        expected: &'static str,
        /// Actual value kind.
        found: &'static str,
    },
    /// The schema payload could not be decoded.
    #[error("decoding schema: {0}")]
    Decode(DecodeErrors),
    /// An ordinal does not map to any variant of a closed enum.
    #[error("invalid {kind} value: {value}")]
    InvalidEnumValue {
        /// Name of the enum.
        kind: &'static str,
        /// Offending ordinal.
        value: i64,
    },
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GraphError {
    /// Machine-readable driver title, when the failure came from the driver.
    pub fn title(&self) -> Option<&str> {
        match self {
            GraphError::Driver(err) => err.title.as_deref(),
            _ => None,
        }
    }

    /// Shorthand for a titled driver error.
    pub fn driver(code: impl Into<String>, message: impl Into<String>) -> Self {
        GraphError::Driver(DriverError::with_code(code, message))
    }
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_comes_from_last_code_segment() {
        let err = GraphError::driver(
            "Neo.ClientError.Security.CredentialsExpired",
            "password change required",
        );
        assert_eq!(err.title(), Some("CredentialsExpired"));
        assert_eq!(GraphError::NotConnected.title(), None);
    }

    #[test]
    fn decode_errors_render_all_issues() {
        let mut errs = DecodeErrors::default();
        errs.push("Person.count", "integer", "string");
        errs.push("KNOWS.properties", "map", "missing");
        let err = GraphError::Decode(errs);
        assert_eq!(
            err.to_string(),
            "decoding schema: Person.count: expected integer, found string; \
             KNOWS.properties: expected map, found missing"
        );
    }
}
