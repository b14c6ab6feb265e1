//! In-memory collaborator implementations
//!
//! Used by tests and by the HTTP service when no database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jobpack_types::{AuditEvent, BusinessProfile, DocType, DocumentDraft, JobRecord};
use tokio::sync::RwLock;

use crate::ports::{
    DraftStore, GenerationError, GenerationRequest, JobSource, StoreError, TextGenerator,
};

/// Jobs and profiles held in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryJobSource {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
    profiles: Arc<RwLock<HashMap<String, BusinessProfile>>>,
}

impl InMemoryJobSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_job(&self, job: JobRecord) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn put_profile(&self, profile: BusinessProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl JobSource for InMemoryJobSource {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<BusinessProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}

type DraftKey = (String, DocType);

/// Drafts held in memory, keyed by `(job_id, doc_type)`
#[derive(Debug, Default, Clone)]
pub struct InMemoryDraftStore {
    drafts: Arc<RwLock<HashMap<DraftKey, DocumentDraft>>>,
    exports: Arc<RwLock<HashMap<DraftKey, Vec<AuditEvent>>>>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drafts.read().await.is_empty()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn get(&self, job_id: &str, doc_type: DocType) -> Result<Option<DocumentDraft>, StoreError> {
        let key = (job_id.to_string(), doc_type);
        let Some(mut draft) = self.drafts.read().await.get(&key).cloned() else {
            return Ok(None);
        };
        draft.exports = self
            .exports
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default();
        Ok(Some(draft))
    }

    async fn save(
        &self,
        draft: &DocumentDraft,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut drafts = self.drafts.write().await;
        let key = (draft.job_id.clone(), draft.doc_type);
        let current = drafts.get(&key).map(|d| d.version).unwrap_or(0);

        if let Some(expected) = expected_version {
            if expected != current {
                return Err(StoreError::Conflict {
                    expected,
                    actual: current,
                });
            }
        }

        let mut stored = draft.clone();
        stored.version = current + 1;
        stored.exports.clear();
        drafts.insert(key, stored);
        Ok(current + 1)
    }

    async fn append_export(
        &self,
        job_id: &str,
        doc_type: DocType,
        event: &AuditEvent,
    ) -> Result<(), StoreError> {
        self.exports
            .write()
            .await
            .entry((job_id.to_string(), doc_type))
            .or_default()
            .push(event.clone());
        Ok(())
    }
}

/// Generator that never produces text; narrative fields stay empty
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTextGenerator;

#[async_trait]
impl TextGenerator for NoopTextGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(String::new())
    }
}

/// Generator answering from a fixed `field_id -> text` table
#[derive(Debug, Default, Clone)]
pub struct FixedTextGenerator {
    responses: HashMap<String, String>,
}

impl FixedTextGenerator {
    pub fn new<I, K, V>(responses: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl TextGenerator for FixedTextGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(self
            .responses
            .get(&request.field_id)
            .cloned()
            .unwrap_or_default())
    }
}
