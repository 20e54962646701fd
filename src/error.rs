//! Error types for sqlport.

use thiserror::Error;

/// The main error type for parsing, generating and streaming schemas.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input contained no SQL statements.
    #[error("Empty input: no SQL statements found")]
    EmptyInput,

    /// A statement did not match the shape its leading keywords promised.
    #[error("Malformed statement at byte {offset}: {message} in '{fragment}'")]
    MalformedStatement {
        fragment: String,
        offset: usize,
        message: String,
    },

    /// A recognized statement category using syntax that is not modeled.
    #[error("Unsupported construct ({category}): '{fragment}'")]
    UnsupportedConstruct { category: String, fragment: String },

    /// Reading the input stream failed.
    #[error("Stream IO error: {0}")]
    StreamIo(#[from] std::io::Error),

    /// An error raised inside a worker task of the parallel pool.
    #[error("Worker error in statement #{statement}: {source}")]
    Worker {
        statement: usize,
        source: Box<ConvertError>,
    },

    /// `generate` was handed a schema with nothing in it.
    #[error("Cannot generate SQL from an empty schema")]
    EmptySchema,

    #[error("Unknown dialect: '{0}'. Expected: mysql, postgres, sqlite, oracle, or sqlserver")]
    UnknownDialect(String),

    #[error("Could not detect the source dialect; pass it explicitly")]
    UndetectedDialect,

    #[error("Configuration error: {0}")]
    Config(String),

    /// Raised by a streaming callback to stop delivery.
    #[error("Callback error: {0}")]
    Callback(String),

    /// A pool task panicked or was cancelled.
    #[error("Worker pool failure: {0}")]
    Pool(String),
}

impl ConvertError {
    /// Create a malformed statement error.
    pub fn malformed(
        fragment: impl Into<String>,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedStatement {
            fragment: fragment.into(),
            offset,
            message: message.into(),
        }
    }

    /// Create an unsupported construct error.
    pub fn unsupported(category: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            category: category.into(),
            fragment: fragment.into(),
        }
    }

    /// Wrap an error surfaced from a concurrent task.
    pub fn worker(statement: usize, source: ConvertError) -> Self {
        Self::Worker {
            statement,
            source: Box::new(source),
        }
    }

    /// Shift the byte offset of a malformed statement error by `base`.
    ///
    /// Extraction routines report offsets relative to the statement; the
    /// streaming layers know where the statement started in the input.
    pub fn at_offset(self, base: usize) -> Self {
        match self {
            Self::MalformedStatement {
                fragment,
                offset,
                message,
            } => Self::MalformedStatement {
                fragment,
                offset: base + offset,
                message,
            },
            other => other,
        }
    }
}

/// Result type alias for sqlport operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::malformed("CREATE TABLE", 12, "expected table name");
        assert_eq!(
            err.to_string(),
            "Malformed statement at byte 12: expected table name in 'CREATE TABLE'"
        );
    }

    #[test]
    fn test_at_offset_only_shifts_malformed() {
        let err = ConvertError::malformed("x", 3, "bad").at_offset(100);
        assert!(matches!(err, ConvertError::MalformedStatement { offset: 103, .. }));

        let err = ConvertError::EmptyInput.at_offset(100);
        assert!(matches!(err, ConvertError::EmptyInput));
    }

    #[test]
    fn test_worker_wraps_source() {
        let err = ConvertError::worker(4, ConvertError::EmptyInput);
        assert_eq!(
            err.to_string(),
            "Worker error in statement #4: Empty input: no SQL statements found"
        );
    }
}
