//! Template loading errors

use std::path::PathBuf;

use jobpack_types::DocType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A template failed schema validation
///
/// `path` locates the offending node in JSON-pointer-like notation, e.g.
/// `sections[2].fields[0].options`.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} (at {path})")]
pub struct TemplateValidationError {
    pub message: String,
    pub path: String,
}

impl TemplateValidationError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Errors raised by the template registry
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{source_name}' is invalid: {error}")]
    Invalid {
        source_name: String,
        error: TemplateValidationError,
    },

    #[error("Template '{source_name}' is not valid JSON: {error}")]
    Json {
        source_name: String,
        error: serde_json::Error,
    },

    #[error("No template registered for {0}")]
    NotFound(DocType),

    #[error("Template for {0} is defined more than once")]
    Duplicate(DocType),

    #[error("Failed to read templates from {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl TemplateError {
    /// The underlying schema violation, when there is one
    pub fn validation(&self) -> Option<&TemplateValidationError> {
        match self {
            TemplateError::Invalid { error, .. } => Some(error),
            _ => None,
        }
    }
}
