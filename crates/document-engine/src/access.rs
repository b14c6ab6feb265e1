//! Entitlement gates: ownership, plan tier and verification

use jobpack_types::{Caller, DocType, JobRecord, PlanTier};

use crate::error::{EngineError, EngineResult};

/// Document types available on the free plan
pub const FREE_DOC_TYPES: &[DocType] = &[DocType::ToolboxTalk, DocType::Maintenance];

/// What the caller is trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read or edit an existing draft
    Edit,
    /// Prefill or regenerate, which calls the text generator
    Generate,
    Issue { strict: bool },
}

/// Caller must own the job
pub fn ensure_owner(caller: &Caller, job: &JobRecord) -> EngineResult<()> {
    if job.user_id != caller.user_id {
        return Err(EngineError::Access(format!(
            "Job {} belongs to another account",
            job.id
        )));
    }
    Ok(())
}

/// Plan and verification requirements for `action` on `doc_type`
pub fn ensure_entitled(caller: &Caller, doc_type: DocType, action: Action) -> EngineResult<()> {
    let gated = matches!(action, Action::Generate | Action::Issue { .. });
    if gated && caller.plan == PlanTier::Free && !FREE_DOC_TYPES.contains(&doc_type) {
        return Err(EngineError::Access(format!(
            "{} requires a paid plan",
            doc_type.display_name()
        )));
    }
    if matches!(action, Action::Issue { strict: true }) && !caller.verified {
        return Err(EngineError::Access(
            "Business verification is required before issuing documents".to_string(),
        ));
    }
    Ok(())
}

/// Ownership followed by entitlement
pub fn authorize(
    caller: &Caller,
    job: &JobRecord,
    doc_type: DocType,
    action: Action,
) -> EngineResult<()> {
    ensure_owner(caller, job)?;
    ensure_entitled(caller, doc_type, action)
}
