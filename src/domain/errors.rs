//! Domain error types
//!
//! This module defines the error hierarchy for Harbor. All errors are
//! domain-specific and don't expose third-party types: HTTP, PDF and
//! database failures are converted at the adapter boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Main Harbor error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum HarborError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document extraction/processing errors
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Medical-NLP service errors
    #[error("NLP service error: {0}")]
    Nlp(#[from] NlpError),

    /// Document store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// PHI detection errors
    #[error("Detection error: {0}")]
    Detection(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Document extraction errors
///
/// Raised by document handlers on unrecoverable extraction failures and
/// caught one layer up, at the processing-pipeline boundary, where they are
/// converted into a failure [`DocumentProcessingResult`].
///
/// [`DocumentProcessingResult`]: crate::domain::document::DocumentProcessingResult
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input file does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// No registered handler accepts the file
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// File exceeds the configured size cap
    #[error("File too large: {size} bytes exceeds the {limit} byte limit ({path})")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// Encrypted document that empty-password decryption could not open
    #[error("Document is password protected: {0}")]
    PasswordProtected(PathBuf),

    /// Corrupt or structurally invalid document
    #[error("Corrupt document {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// No encoding in the candidate list could decode the file
    #[error("Undecodable text file {path}: {message}")]
    Undecodable { path: PathBuf, message: String },

    /// Generic extraction failure
    #[error("Extraction failed for {path}: {message}")]
    ExtractionFailed { path: PathBuf, message: String },
}

impl DocumentError {
    /// Path of the file that caused the error, when one is known.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound(path)
            | Self::PasswordProtected(path)
            | Self::TooLarge { path, .. }
            | Self::Corrupt { path, .. }
            | Self::Undecodable { path, .. }
            | Self::ExtractionFailed { path, .. } => Some(path),
            Self::UnsupportedFormat(_) => None,
        }
    }
}

/// Medical-NLP service errors
///
/// Errors that occur when talking to the remote entity-extraction service.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum NlpError {
    /// Failed to connect to the NLP service
    #[error("Failed to connect to NLP service: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Invalid response from the service
    #[error("Invalid response from NLP service: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Service reported itself unavailable
    #[error("NLP service unavailable: {0}")]
    Unavailable(String),
}

/// Document store errors
///
/// Errors that occur when interacting with PostgreSQL.
/// These errors don't expose tokio-postgres types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to connect or acquire a pooled connection
    #[error("Failed to connect to document store: {0}")]
    ConnectionFailed(String),

    /// Schema creation failed
    #[error("Failed to initialize schema: {0}")]
    SchemaFailed(String),

    /// Query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Insert/update failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Row conversion failed
    #[error("Failed to deserialize row: {0}")]
    DeserializationFailed(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for HarborError {
    fn from(err: std::io::Error) -> Self {
        HarborError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for HarborError {
    fn from(err: serde_json::Error) -> Self {
        HarborError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for HarborError {
    fn from(err: toml::de::Error) -> Self {
        HarborError::Configuration(format!("TOML parse error: {err}"))
    }
}
