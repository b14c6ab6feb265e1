//! Tamper-evident lifecycle history for document drafts
//!
//! Every prefill, save, regeneration, approval and issuance appends an
//! event whose hash covers the previous event, so rewriting history
//! anywhere but the tail breaks `verify()`. Exports are logged as
//! unchained events in a separate append-only list on the draft.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::model::RenderModel;

/// Lifecycle events recorded against a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Prefilled,
    Saved {
        version: u64,
    },
    Regenerated,
    Approved,
    Issued {
        issued_record_id: String,
        document_hash: String,
    },
    Exported {
        format: String,
        audience: String,
    },
}

impl AuditAction {
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::Prefilled => "prefilled",
            AuditAction::Saved { .. } => "saved",
            AuditAction::Regenerated => "regenerated",
            AuditAction::Approved => "approved",
            AuditAction::Issued { .. } => "issued",
            AuditAction::Exported { .. } => "exported",
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: String,
    pub action: AuditAction,
    pub actor_id: String,
    /// Render model record id at the time of the event
    pub record_id: String,
    pub previous_hash: Option<String>,
    pub details: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        actor_id: &str,
        record_id: &str,
        previous_hash: Option<String>,
        details: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            action,
            actor_id: actor_id.to_string(),
            record_id: record_id.to_string(),
            previous_hash,
            details,
        }
    }

    /// Event that links to nothing, for the append-only export log
    pub fn unchained(action: AuditAction, actor_id: &str, record_id: &str) -> Self {
        Self::new(action, actor_id, record_id, None, None)
    }

    /// Compute the hash of this event (for chain linking)
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_id.as_bytes());
        hasher.update(self.timestamp.as_bytes());
        hasher.update(format!("{:?}", self.action).as_bytes());
        hasher.update(self.actor_id.as_bytes());
        hasher.update(self.record_id.as_bytes());
        if let Some(ref prev) = self.previous_hash {
            hasher.update(prev.as_bytes());
        }
        if let Some(ref details) = self.details {
            hasher.update(details.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Chain of audit events with hash linking
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChain {
    pub events: Vec<AuditEvent>,
    /// Record id of the model the chain was opened for
    pub document_id: String,
    pub created_at: String,
}

impl AuditChain {
    pub fn new(document_id: &str) -> Self {
        Self {
            events: Vec::new(),
            document_id: document_id.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Get the hash of the last event (for linking)
    pub fn last_hash(&self) -> Option<String> {
        self.events.last().map(|e| e.compute_hash())
    }

    /// Append an event, automatically linking to previous hash
    pub fn append(
        &mut self,
        action: AuditAction,
        actor_id: &str,
        record_id: &str,
        details: Option<String>,
    ) -> &AuditEvent {
        let previous_hash = self.last_hash();
        let event = AuditEvent::new(action, actor_id, record_id, previous_hash, details);
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Verify the integrity of the chain
    pub fn verify(&self) -> Result<(), String> {
        let mut expected_prev: Option<String> = None;

        for (i, event) in self.events.iter().enumerate() {
            if event.previous_hash != expected_prev {
                return Err(format!(
                    "Chain broken at event {}: expected prev {:?}, got {:?}",
                    i, expected_prev, event.previous_hash
                ));
            }
            expected_prev = Some(event.compute_hash());
        }

        Ok(())
    }

    /// Most recent event of the given kind
    pub fn last_of(&self, label: &str) -> Option<&AuditEvent> {
        self.events.iter().rev().find(|e| e.action.label() == label)
    }

    /// One line per event for display
    pub fn summary(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| {
                format!(
                    "[{}] {} - {}",
                    e.timestamp.split('T').next().unwrap_or(&e.timestamp),
                    e.actor_id,
                    e.action.label()
                )
            })
            .collect()
    }
}

/// SHA-256 of raw bytes, hex encoded
pub fn hash_document(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of the canonical JSON form of a render model
pub fn hash_model(model: &RenderModel) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(model)?;
    Ok(hash_document(&bytes))
}
