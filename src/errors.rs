//! Error types for the Lumina workspace.
//!
//! This module defines the error types that categorize the failures that can
//! occur while managing notes, files and AI requests.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the Lumina workspace.
#[derive(Error, Debug)]
pub enum LuminaError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An uploaded payload could not be read or encoded.
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// The underlying key-value store refused a write because it is full.
    #[error("Storage quota exceeded for key {key}: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    /// Note was not found when performing an operation.
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// File was not found when performing an operation.
    #[error("File not found: {id}")]
    FileNotFound { id: String },

    /// The AI service did not produce a result.
    #[error("AI request failed: {0}")]
    Ai(#[from] AiFailure),

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}

/// Why a request to the generative model produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiFailure {
    /// No API key was configured.
    #[error("no API key configured")]
    MissingApiKey,

    /// The request never reached the service or the connection broke.
    #[error("network error: {0}")]
    Network(String),

    /// The service rejected the credentials.
    #[error("authentication rejected (HTTP {status})")]
    Auth { status: u16 },

    /// The service refused the request because of rate or quota limits.
    #[error("quota exhausted (HTTP {status})")]
    Quota { status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service answered but returned no text.
    #[error("model returned no text")]
    EmptyResponse,

    /// Any other non-success answer from the service.
    #[error("service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl AiFailure {
    /// Maps an HTTP status from the AI endpoint to a failure kind.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => AiFailure::Auth { status },
            429 => AiFailure::Quota { status },
            _ => AiFailure::Api { status, message },
        }
    }
}
