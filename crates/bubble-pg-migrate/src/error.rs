//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, bad env override)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error while talking to the source API
    #[error("Source transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Source API returned a non-success status or an unusable body
    #[error("Source API error for '{entity}' (status {status}): {message}")]
    Api {
        entity: String,
        status: u16,
        message: String,
    },

    /// Destination database connection or query error
    #[error("Destination database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A source record is missing a field or carries the wrong shape.
    /// Caught per record by the driver and counted as `failed`.
    #[error("Malformed source record: field '{field}': {reason}")]
    MalformedField { field: String, reason: String },

    /// An unknown entity type name was requested (CLI `--entity` typo etc.)
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    /// IO error (config file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a malformed-field error for a source record.
    pub fn field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrateError::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Exit code for the CLI process.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::UnknownEntity(_) => 1,
            MigrateError::Http(_) | MigrateError::Api { .. } => 2,
            MigrateError::Target(_) | MigrateError::Pool { .. } => 3,
            MigrateError::MalformedField { .. } => 4,
            MigrateError::Yaml(_) | MigrateError::Json(_) => 5,
            MigrateError::Cancelled => 6,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
