//! Shared types for the job pack document engine
//!
//! Template schema, render model, persisted drafts, collaborator inputs
//! and the lifecycle audit chain. Everything here is plain data; behaviour
//! lives in the engine crates.

pub mod audit;
pub mod draft;
pub mod job;
pub mod model;
pub mod template;

pub use audit::{hash_document, hash_model, AuditAction, AuditChain, AuditEvent};
pub use draft::{DocumentDraft, DraftStatus, IssuerProfile, LifecycleState};
pub use job::{
    round_cents, BusinessProfile, Caller, JobRecord, MaterialLine, PlanTier, PropertyType,
    TradeType,
};
pub use model::{FieldValue, OvisWarning, RenderModel, RenderSection};
pub use template::{
    Column, DocType, DocumentTemplate, Field, FieldType, OvisCheck, OvisSeverity, Section, Table,
    TableRow, UnknownDocType,
};
