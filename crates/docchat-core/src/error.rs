//! Error taxonomy shared by the core library and the UI.
//!
//! Each class is surfaced differently: configuration errors abort startup,
//! document errors are shown next to the document, service errors become an
//! assistant reply, and validation errors are an inline warning.

use std::path::PathBuf;

use thiserror::Error;

/// Missing or invalid settings. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {key}")]
    MissingEnv { key: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// An uploaded document could not be turned into text.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("not a PDF file: {}", .0.display())]
    NotPdf(PathBuf),

    #[error("could not read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse PDF: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("could not extract text from page {page}: {source}")]
    PageText {
        page: u32,
        #[source]
        source: lopdf::Error,
    },
}

/// A remote collaborator (vector store or completion API) failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response from {service}: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },

    #[error("completion returned no choices")]
    EmptyCompletion,

    #[error("match '{id}' has no text metadata")]
    MissingMetadataText { id: String },

    #[error("request did not finish: {0}")]
    Interrupted(String),
}

/// A submission was rejected before any state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a message.")]
    EmptyInput,

    #[error("Still waiting for the previous answer.")]
    RequestPending,
}
