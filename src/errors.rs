//! Error types for the reflexion memory engine
//!
//! Every failure falls into one of three kinds: bad input, corrupt data on
//! disk, or an incomplete deployment (missing schema files). I/O failures
//! are reported separately as external errors.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for episode, graph and pattern operations
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Bad enum value or out-of-range numeric parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session id resolves outside the episodes directory
    #[error("Path traversal attempt detected in session_id '{session_id}'")]
    PathTraversal { session_id: String },

    /// A file expected to hold valid JSON could not be parsed
    #[error("Data corrupted at '{}': {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    /// Shape document required for validation is absent
    #[error("Required schema file not found: {}. Cannot validate {kind}", path.display())]
    SchemaMissing { path: PathBuf, kind: String },

    /// Shape document exists but cannot be read or parsed
    #[error("Failed to read schema file '{}': {reason}", path.display())]
    SchemaUnreadable { path: PathBuf, reason: String },

    /// Candidate data does not conform to its shape document
    #[error("Invalid {kind} - JSON Schema validation failed: {}", violations.join("; "))]
    SchemaViolation { kind: String, violations: Vec<String> },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used for reporting and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    DataCorruption,
    Configuration,
    External,
}

impl MemoryError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::InvalidInput(_)
            | MemoryError::PathTraversal { .. }
            | MemoryError::SchemaViolation { .. }
            | MemoryError::Serialization(_) => ErrorKind::InputValidation,
            MemoryError::Corrupted { .. } => ErrorKind::DataCorruption,
            MemoryError::SchemaMissing { .. }
            | MemoryError::SchemaUnreadable { .. }
            | MemoryError::ConfigError(_) => ErrorKind::Configuration,
            MemoryError::Io(_) => ErrorKind::External,
        }
    }

    /// Process exit code: 1 logic, 2 configuration, 3 external
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InputValidation | ErrorKind::DataCorruption => 1,
            ErrorKind::Configuration => 2,
            ErrorKind::External => 3,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        MemoryError::InvalidInput(msg.into())
    }
}

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;
