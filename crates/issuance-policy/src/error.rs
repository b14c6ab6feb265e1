use std::path::PathBuf;

use thiserror::Error;

/// Errors loading an issuer policy
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid policy JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Policy has no rules")]
    Empty,

    #[error("Unknown jurisdiction '{0}'")]
    UnknownJurisdiction(String),

    #[error("Failed to read policy file {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}
