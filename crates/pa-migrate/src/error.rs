//! Error types for the migration library.

use crate::core::ObjectKind;
use thiserror::Error;

pub const EXIT_CONFIG_ERROR: u8 = 1;
pub const EXIT_TRANSFER_ERROR: u8 = 2;
pub const EXIT_CONNECTION_ERROR: u8 = 3;
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An environment could not be reached or refused the credentials.
    #[error("Connection to {environment} failed: {message}")]
    Connectivity {
        environment: String,
        message: String,
    },

    /// Named object does not exist on the source server.
    #[error("{kind} {name} not found")]
    NotFound { kind: ObjectKind, name: String },

    /// Target refused a create or update.
    #[error("Target rejected {object}: {message}")]
    RemoteRejection { object: String, message: String },

    /// MDX query failed against the source server.
    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    /// Transfer of a single object failed
    #[error("Transfer failed for {object}: {message}")]
    Transfer { object: String, message: String },

    /// Server answered with a body we could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connectivity error for a named environment.
    pub fn connectivity(environment: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Connectivity {
            environment: environment.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: ObjectKind, name: impl Into<String>) -> Self {
        MigrateError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a RemoteRejection error
    pub fn rejected(object: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::RemoteRejection {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(object: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => EXIT_CONFIG_ERROR,
            MigrateError::Connectivity { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            _ => EXIT_TRANSFER_ERROR,
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
