//! Error types for the provider.
//!
//! Every error surfaces to the runtime as exactly one [`Diagnostic`]. Only
//! [`ProviderError::NotFound`] is a warning; everything else halts the
//! operation with an error.

use thiserror::Error;

use crate::convert::ConvertError;
use crate::schema::{Diagnostic, DiagnosticSeverity};

/// Failures below the HTTP status line: the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within the client timeout.
    #[error("request timed out")]
    Timeout,
    /// The request was cancelled because the provider is stopping.
    #[error("request cancelled")]
    Cancelled,
    /// Connection, TLS or body read failure.
    #[error("{0}")]
    Request(String),
}

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request failed before a response was received.
    #[error("Failed to {operation}: {source}")]
    Transport {
        /// The operation, e.g. `GET /api/org/usage-group-sets/1`.
        operation: String,
        /// The underlying failure.
        #[source]
        source: TransportError,
    },

    /// The API answered with an unexpected status code.
    #[error("API returned status {status} during {operation}: {body}")]
    Api {
        /// The operation, e.g. `PUT /api/org/usage-group-sets/1`.
        operation: String,
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: String,
    },

    /// The requested resource was not found.
    #[error("Resource not found at {0}")]
    NotFound(String),

    /// A request or response body could not be (de)serialized.
    #[error("Failed to parse JSON during {operation}: {message}")]
    Json {
        /// What was being parsed, e.g. `unmarshal response`.
        operation: String,
        /// The parser message.
        message: String,
    },

    /// A runtime value could not be converted into a model.
    #[error("Value conversion error: {0}")]
    Conversion(#[from] ConvertError),

    /// A required identifier was missing before a call was made.
    #[error("{summary}: {detail}")]
    FailedPrecondition {
        /// Short summary, e.g. `Missing Usage Group Set ID`.
        summary: String,
        /// Human-readable detail.
        detail: String,
    },

    /// The shared version for this apply could not be created.
    #[error("Version creation error: {0}")]
    VersionCreation(String),

    /// An import identifier did not have the expected shape.
    #[error("Invalid import ID: {0}")]
    InvalidImportId(String),

    /// A configuration error occurred.
    #[error("Configuration error: {summary}: {detail}")]
    Configuration {
        /// Short summary, e.g. `Missing API Key`.
        summary: String,
        /// Human-readable detail.
        detail: String,
    },

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// An internal error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),
}

impl ProviderError {
    /// A precondition error for a required identifier that is empty.
    pub fn missing_id(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::FailedPrecondition {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// A configuration error with a summary and detail.
    pub fn configuration(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Configuration {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// A JSON error for the given operation.
    pub fn json(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Json {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// The diagnostic severity of this error.
    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            Self::NotFound(_) => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Error,
        }
    }

    /// The short diagnostic summary.
    pub fn summary(&self) -> &str {
        match self {
            Self::Transport { .. } => "HTTP Request Error",
            Self::Api { .. } => "API Error",
            Self::NotFound(_) => "Resource Not Found",
            Self::Json { .. } => "JSON Error",
            Self::Conversion(_) => "Value Conversion Error",
            Self::FailedPrecondition { summary, .. } => summary,
            Self::VersionCreation(_) => "Version Creation Error",
            Self::InvalidImportId(_) => "Invalid Import ID Format",
            Self::Configuration { summary, .. } => summary,
            Self::Validation(_) => "Validation Error",
            Self::UnknownResource(_) => "Unknown Resource Type",
            Self::Sdk(_) => "Internal Error",
        }
    }

    /// The detailed diagnostic message.
    pub fn detail(&self) -> String {
        match self {
            Self::FailedPrecondition { detail, .. } | Self::Configuration { detail, .. } => {
                detail.clone()
            },
            Self::Conversion(err) => err.to_string(),
            Self::VersionCreation(msg)
            | Self::InvalidImportId(msg)
            | Self::Validation(msg)
            | Self::UnknownResource(msg)
            | Self::Sdk(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Convert this error into a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            severity: self.severity(),
            summary: self.summary().to_string(),
            detail: Some(self.detail()),
            attribute: None,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        err.to_diagnostic()
    }
}
