//! Document generation and lifecycle engine
//!
//! Turns a job record and business profile into an editable render model,
//! keeps user edits through regeneration, and moves the persisted draft
//! through DRAFT, APPROVED and ISSUED.
//!
//! - [`prefill`]: template + job + profile into a populated model
//! - [`editor`] and [`merge`]: pure model edits and the non-destructive merge
//! - [`session`]: in-memory editing with debounced saves
//! - [`lifecycle`]: approval and the issuance gate
//! - [`service`]: the operations exposed to callers

pub mod access;
pub mod config;
pub mod editor;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod merge;
pub mod ports;
pub mod prefill;
pub mod service;
pub mod session;

pub use access::Action;
pub use config::EngineConfig;
pub use editor::{
    add_table_row, apply_edit, mutate_field, mutate_table_cell, recalculate_totals,
    remove_table_row, EditOp,
};
pub use error::{EngineError, EngineResult};
pub use lifecycle::Issuance;
pub use memory::{FixedTextGenerator, InMemoryDraftStore, InMemoryJobSource, NoopTextGenerator};
pub use merge::merge_models;
pub use ports::{
    DraftStore, GenerationError, GenerationRequest, JobSource, StoreError, TextGenerator,
};
pub use prefill::{PrefillContext, Totals, GST_RATE};
pub use service::{DocumentService, IssueOutcome};
pub use session::{EditorSession, SaveStatus};
