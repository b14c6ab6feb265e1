//! Editor session with debounced persistence
//!
//! Edits land in the session's in-memory model immediately. A save is
//! scheduled after [`EngineConfig::save_debounce`](crate::EngineConfig)
//! of inactivity; each new edit pushes it back. A failed save keeps the
//! in-memory model and reports whether retrying can help.

use std::sync::Arc;
use std::time::Duration;

use jobpack_types::{Caller, DocType, DocumentDraft, RenderModel};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::editor::{apply_edit, EditOp};
use crate::error::EngineResult;
use crate::merge::merge_models;
use crate::service::DocumentService;

/// Persistence state as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SaveStatus {
    /// Nothing edited since the session opened
    Idle,
    /// Edits waiting for the debounce window to close
    Pending,
    Saving,
    Saved { version: u64 },
    Failed { message: String, retryable: bool },
}

struct SessionState {
    model: RenderModel,
    /// Stored version the next save expects
    version: u64,
    /// Bumped on every edit
    generation: u64,
    /// Generation last written to the store
    saved_generation: u64,
    status: SaveStatus,
}

impl SessionState {
    fn is_dirty(&self) -> bool {
        self.generation != self.saved_generation
    }
}

struct SessionInner {
    service: DocumentService,
    caller: Caller,
    job_id: String,
    doc_type: DocType,
    debounce: Duration,
    state: Mutex<SessionState>,
    /// Serializes store writes so two saves never race on one version
    save_lock: Mutex<()>,
}

/// One user editing one draft
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

impl EditorSession {
    /// Open the draft for `(job_id, doc_type)`, prefilling it when none
    /// exists yet
    pub async fn open(
        service: DocumentService,
        caller: Caller,
        job_id: &str,
        doc_type: DocType,
        include_markup: bool,
    ) -> EngineResult<Self> {
        let (draft, created) = service
            .load_or_create(&caller, job_id, doc_type, include_markup)
            .await?;
        debug!(job_id, doc_type = %doc_type, created, "Editor session opened");
        Ok(Self::from_draft(service, caller, draft))
    }

    /// Session around an already loaded draft
    pub fn from_draft(service: DocumentService, caller: Caller, draft: DocumentDraft) -> Self {
        let debounce = service.config().save_debounce;
        Self {
            inner: Arc::new(SessionInner {
                service,
                caller,
                job_id: draft.job_id,
                doc_type: draft.doc_type,
                debounce,
                state: Mutex::new(SessionState {
                    model: draft.data,
                    version: draft.version,
                    generation: 0,
                    saved_generation: 0,
                    status: SaveStatus::Idle,
                }),
                save_lock: Mutex::new(()),
            }),
        }
    }

    pub async fn model(&self) -> RenderModel {
        self.inner.state.lock().await.model.clone()
    }

    pub async fn status(&self) -> SaveStatus {
        self.inner.state.lock().await.status.clone()
    }

    /// Stored version the session is based on
    pub async fn version(&self) -> u64 {
        self.inner.state.lock().await.version
    }

    /// Apply an edit in memory and (re)schedule the debounced save
    pub async fn apply(&self, op: &EditOp) -> EngineResult<RenderModel> {
        let generation = {
            let mut state = self.inner.state.lock().await;
            let next = apply_edit(&state.model, op)?;
            state.model = next;
            state.generation += 1;
            state.status = SaveStatus::Pending;
            state.generation
        };
        self.schedule(generation);
        Ok(self.model().await)
    }

    fn schedule(&self, generation: u64) {
        let session = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(session.inner.debounce).await;
            if session.inner.state.lock().await.generation != generation {
                // superseded by a later edit
                return;
            }
            // failures are recorded in the status
            let _ = session.persist().await;
        });
    }

    /// Save now, without waiting for the debounce window
    pub async fn flush(&self) -> EngineResult<u64> {
        self.persist().await
    }

    /// Repeat a failed save
    pub async fn retry(&self) -> EngineResult<u64> {
        self.persist().await
    }

    /// Flush pending edits and end the session
    pub async fn close(self) -> EngineResult<u64> {
        self.persist().await
    }

    async fn persist(&self) -> EngineResult<u64> {
        let _guard = self.inner.save_lock.lock().await;

        let (model, generation, expected) = {
            let mut state = self.inner.state.lock().await;
            if !state.is_dirty() {
                return Ok(state.version);
            }
            state.status = SaveStatus::Saving;
            (state.model.clone(), state.generation, state.version)
        };

        let inner = &self.inner;
        let result = inner
            .service
            .save_draft(
                &inner.caller,
                &inner.job_id,
                inner.doc_type,
                model,
                None,
                Some(expected),
            )
            .await;

        let mut state = inner.state.lock().await;
        match result {
            Ok(draft) => {
                state.version = draft.version;
                state.saved_generation = generation;
                state.status = if state.is_dirty() {
                    SaveStatus::Pending
                } else {
                    SaveStatus::Saved {
                        version: draft.version,
                    }
                };
                debug!(job_id = %inner.job_id, version = draft.version, "Editor saved");
                Ok(draft.version)
            }
            Err(e) => {
                warn!(job_id = %inner.job_id, error = %e, "Editor save failed; edits kept in memory");
                state.status = SaveStatus::Failed {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                };
                Err(e)
            }
        }
    }

    /// Regenerate from the job and merge into the in-memory model.
    /// On failure, including a conflict with a newer stored draft, the
    /// in-memory model is left as it was.
    pub async fn regenerate(&self, include_markup: bool) -> EngineResult<RenderModel> {
        let _guard = self.inner.save_lock.lock().await;
        let (base, generation, expected) = {
            let state = self.inner.state.lock().await;
            (state.model.clone(), state.generation, state.version)
        };

        let inner = &self.inner;
        let result = inner
            .service
            .regenerate(
                &inner.caller,
                &inner.job_id,
                inner.doc_type,
                Some(base),
                include_markup,
                Some(expected),
            )
            .await;

        let mut state = inner.state.lock().await;
        match result {
            Ok(draft) => {
                state.version = draft.version;
                if state.generation == generation {
                    state.model = draft.data;
                    state.saved_generation = generation;
                    state.status = SaveStatus::Saved {
                        version: draft.version,
                    };
                    return Ok(state.model.clone());
                }
                // edited while regenerating: local values win
                let merged = merge_models(&state.model, &draft.data);
                state.model = merged;
                state.generation += 1;
                state.status = SaveStatus::Pending;
                let next = state.generation;
                let model = state.model.clone();
                drop(state);
                self.schedule(next);
                Ok(model)
            }
            Err(e) => {
                state.status = SaveStatus::Failed {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                };
                Err(e)
            }
        }
    }

    /// Flush pending edits, then approve the stored draft
    pub async fn approve(&self) -> EngineResult<DocumentDraft> {
        self.flush().await?;
        let _guard = self.inner.save_lock.lock().await;
        let inner = &self.inner;
        let draft = inner
            .service
            .approve(&inner.caller, &inner.job_id, inner.doc_type)
            .await?;
        inner.state.lock().await.version = draft.version;
        Ok(draft)
    }
}
