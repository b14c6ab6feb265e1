//! Engine error taxonomy

use issuance_policy::IssuerCheck;
use template_engine::{TemplateError, TemplateValidationError};
use thiserror::Error;

use crate::ports::{GenerationError, StoreError};

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by document engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed template; fatal at load, never expected at runtime
    #[error("Template validation failed: {0}")]
    TemplateValidation(TemplateValidationError),

    #[error("{0} not found")]
    NotFound(String),

    /// Ownership, plan-tier or verification gate
    #[error("Access denied: {0}")]
    Access(String),

    /// Issuance blocked by missing issuer fields
    #[error("Issuance blocked, missing required issuer fields: {}", .0.missing_required.join(", "))]
    Validation(IssuerCheck),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Draft has changed since it was loaded (expected version {expected}, found {actual})")]
    Conflict { expected: u64, actual: u64 },

    #[error("Document was already issued as {0}")]
    AlreadyIssued(String),

    #[error("Table in section '{section_id}' must keep at least {min_rows} row(s)")]
    TableRowMinimum { section_id: String, min_rows: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl EngineError {
    /// Whether repeating the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Generation(_) | EngineError::Storage(_))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }
}

impl From<TemplateError> for EngineError {
    fn from(e: TemplateError) -> Self {
        match e {
            TemplateError::NotFound(doc_type) => {
                EngineError::NotFound(format!("Template for {}", doc_type))
            }
            TemplateError::Invalid { error, .. } => EngineError::TemplateValidation(error),
            other => EngineError::TemplateValidation(TemplateValidationError::new(
                other.to_string(),
                "$",
            )),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { expected, actual } => EngineError::Conflict { expected, actual },
            StoreError::Backend(message) => EngineError::Storage(message),
        }
    }
}

impl From<GenerationError> for EngineError {
    fn from(e: GenerationError) -> Self {
        EngineError::Generation(e.to_string())
    }
}
