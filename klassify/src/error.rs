//! Error types for klassify

use thiserror::Error;

/// Result type alias for klassify operations
pub type Result<T> = std::result::Result<T, KlassifyError>;

/// Errors that can occur while generating artifacts
#[derive(Error, Debug)]
pub enum KlassifyError {
    /// Missing or invalid setting. Fatal.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database unreachable, login rejected, or the transport broke. Fatal.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The generation query failed for one table
    #[error("Generation failed for table {table}: {message}")]
    GenerationError { table: String, message: String },

    /// The artifact for one table could not be written
    #[error("Write failed for table {table}: {message}")]
    WriteError { table: String, message: String },
}

impl KlassifyError {
    /// Create a GenerationError scoped to `table`
    pub fn generation(table: impl Into<String>, message: impl ToString) -> Self {
        KlassifyError::GenerationError {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a WriteError scoped to `table`
    pub fn write(table: impl Into<String>, message: impl ToString) -> Self {
        KlassifyError::WriteError {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error ends the run.
    ///
    /// Generation and write failures only affect the table they were raised for.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            KlassifyError::GenerationError { .. } | KlassifyError::WriteError { .. }
        )
    }
}

impl From<config::ConfigError> for KlassifyError {
    fn from(err: config::ConfigError) -> Self {
        KlassifyError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_table_errors_are_not_fatal() {
        assert!(!KlassifyError::generation("Orders", "boom").is_fatal());
        assert!(!KlassifyError::write("Orders", "disk full").is_fatal());
        assert!(KlassifyError::ConnectionError("refused".into()).is_fatal());
        assert!(KlassifyError::ConfigError("database".into()).is_fatal());
    }

    #[test]
    fn test_messages_name_the_table() {
        let err = KlassifyError::generation("Orders", "Invalid object name");
        assert_eq!(
            err.to_string(),
            "Generation failed for table Orders: Invalid object name"
        );
    }
}
