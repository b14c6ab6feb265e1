//! Collaborator interfaces
//!
//! The engine reads jobs and business profiles, persists drafts and asks
//! for narrative text through these traits. In-memory implementations
//! live in [`crate::memory`]; the HTTP service provides SQLite and HTTP
//! backed ones.

use async_trait::async_trait;
use jobpack_types::{AuditEvent, BusinessProfile, DocType, DocumentDraft, JobRecord, TradeType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Draft persistence failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("{0}")]
    Backend(String),
}

/// Text generation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    #[error("Generator timed out after {0} ms")]
    Timeout(u64),

    #[error("Generator returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Read access to jobs and business profiles
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<BusinessProfile>, StoreError>;
}

/// One draft per `(job_id, doc_type)`
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, job_id: &str, doc_type: DocType) -> Result<Option<DocumentDraft>, StoreError>;

    /// Full overwrite. When `expected_version` is given and the stored
    /// version differs, fails with `StoreError::Conflict`. Returns the new
    /// version. The export log is not part of a save and is left as stored.
    async fn save(
        &self,
        draft: &DocumentDraft,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// Append to the draft's export log. Neither the version nor any other
    /// part of the draft changes.
    async fn append_export(
        &self,
        job_id: &str,
        doc_type: DocType,
        event: &AuditEvent,
    ) -> Result<(), StoreError>;
}

/// Request for one narrative field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub doc_type: DocType,
    pub section_id: String,
    pub field_id: String,
    pub label: String,
    pub job_title: String,
    pub trade: TradeType,
    /// Free-form job context (notes, scope, summary)
    pub context: String,
}

/// Opaque text generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
