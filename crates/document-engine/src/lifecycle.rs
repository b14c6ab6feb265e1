//! Draft lifecycle: DRAFT, APPROVED, ISSUED
//!
//! Approval is an in-place flag that never resets. Issuance passes the
//! issuer gate, snapshots the business profile and is terminal for the
//! draft.

use chrono::{DateTime, Utc};
use issuance_policy::{check_issuer, IssuerCheck, Jurisdiction, PolicySet};
use jobpack_types::{
    hash_model, AuditAction, BusinessProfile, DocumentDraft, DraftStatus, IssuerProfile, JobRecord,
};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Mark the draft approved. Returns `false` when it already was.
pub fn approve(draft: &mut DocumentDraft, actor_id: &str) -> bool {
    if draft.approved {
        return false;
    }
    draft.approved = true;
    draft.updated_at = Utc::now();
    let record_id = draft.data.record_id.clone();
    draft
        .history
        .append(AuditAction::Approved, actor_id, &record_id, None);
    true
}

/// Issuer completeness check for `draft`, with model-level gaps and OVIS
/// messages carried as non-blocking warnings
pub fn evaluate_issuer(
    policy: &PolicySet,
    job: &JobRecord,
    profile: &BusinessProfile,
    draft: &DocumentDraft,
) -> IssuerCheck {
    let jurisdiction = Jurisdiction::resolve([job.state.as_deref(), profile.state.as_deref()]);
    let requirements = policy.requirements_for(&jurisdiction, job.trade_type, draft.doc_type);
    let mut check = check_issuer(profile, &requirements);

    for (section, label) in draft.data.missing_required_fields() {
        check
            .warnings
            .push(format!("{} is empty (section {})", label, section));
    }
    check
        .warnings
        .extend(draft.data.ovis_warnings.iter().map(|w| w.message.clone()));
    check
}

/// Result of a successful issue
#[derive(Debug, Clone, PartialEq)]
pub struct Issuance {
    pub issued_record_id: String,
    pub issued_at: DateTime<Utc>,
    pub issuer: IssuerProfile,
    pub check: IssuerCheck,
}

/// Pass the issuance gate.
///
/// With `strict`, any missing required issuer field fails with
/// [`EngineError::Validation`] and the draft is left as it was. Without
/// it, gaps are reported in the returned check but do not block.
pub fn issue(
    draft: &mut DocumentDraft,
    policy: &PolicySet,
    job: &JobRecord,
    profile: &BusinessProfile,
    strict: bool,
    actor_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<Issuance> {
    if draft.is_issued() {
        let id = draft
            .issued_record_id
            .clone()
            .unwrap_or_else(|| draft.data.record_id.clone());
        return Err(EngineError::AlreadyIssued(id));
    }

    let check = evaluate_issuer(policy, job, profile, draft);
    if strict && !check.passes() {
        return Err(EngineError::Validation(check));
    }

    let document_hash = hash_model(&draft.data)
        .map_err(|e| EngineError::InvalidInput(format!("Model could not be serialized: {}", e)))?;
    let issued_record_id = Uuid::new_v4().to_string();

    draft.issued_record_id = Some(issued_record_id.clone());
    draft.issued_at = Some(now);
    let issuer = IssuerProfile::snapshot(profile, now);
    draft.issuer = Some(issuer.clone());
    draft.status = DraftStatus::Issued;
    draft.approved = true;
    draft.updated_at = now;

    let record_id = draft.data.record_id.clone();
    draft.history.append(
        AuditAction::Issued {
            issued_record_id: issued_record_id.clone(),
            document_hash,
        },
        actor_id,
        &record_id,
        (!check.is_clean()).then(|| format!("{} warning(s) at issue", check.warnings.len())),
    );

    info!(
        job_id = %draft.job_id,
        doc_type = %draft.doc_type,
        issued_record_id = %issued_record_id,
        strict,
        "Document issued"
    );
    Ok(Issuance {
        issued_record_id,
        issued_at: now,
        issuer,
        check,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobpack_types::{DocType, LifecycleState, RenderModel, TradeType};
    use pretty_assertions::assert_eq;

    fn draft() -> DocumentDraft {
        let model = RenderModel {
            title: "SWMS".to_string(),
            record_id: "rec-1".to_string(),
            timestamp: Utc::now(),
            doc_type: DocType::Swms,
            disclaimer: "Draft".to_string(),
            sections: vec![],
            ovis_warnings: vec![],
        };
        DocumentDraft::new("job-1", "user-1", model)
    }

    fn job() -> JobRecord {
        JobRecord {
            id: "job-1".to_string(),
            user_id: "user-1".to_string(),
            title: "Repaint".to_string(),
            trade_type: TradeType::Painter,
            property_type: Default::default(),
            address: None,
            state: Some("VIC".to_string()),
            client_name: None,
            client_email: None,
            client_phone: None,
            notes: None,
            summary: None,
            scope_of_work: None,
            inclusions: None,
            exclusions: None,
            client_notes: None,
            estimated_hours: None,
            start_date: None,
            completion_date: None,
            contract_value: None,
            materials: vec![],
        }
    }

    fn profile(abn: Option<&str>) -> BusinessProfile {
        BusinessProfile {
            user_id: "user-1".to_string(),
            business_name: Some("Brush & Roll".to_string()),
            abn: abn.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_approve_once() {
        let mut d = draft();
        assert!(approve(&mut d, "user-1"));
        assert!(!approve(&mut d, "user-1"));
        assert_eq!(d.lifecycle_state(), LifecycleState::Approved);
        assert_eq!(d.history.events.len(), 1);
    }

    #[test]
    fn test_strict_issue_blocked_without_abn() {
        let mut d = draft();
        let err = issue(
            &mut d,
            &PolicySet::default(),
            &job(),
            &profile(None),
            true,
            "user-1",
            Utc::now(),
        )
        .unwrap_err();

        match err {
            EngineError::Validation(check) => {
                assert!(check.missing_required.contains(&"ABN".to_string()))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(d.status, DraftStatus::Draft);
        assert!(d.issued_record_id.is_none());
        assert!(!d.approved);
    }

    #[test]
    fn test_issue_snapshots_profile() {
        let mut d = draft();
        let now = Utc::now();
        issue(
            &mut d,
            &PolicySet::default(),
            &job(),
            &profile(Some("51 824 753 556")),
            true,
            "user-1",
            now,
        )
        .unwrap();

        assert_eq!(d.status, DraftStatus::Issued);
        assert!(d.approved);
        assert_eq!(d.issued_at, Some(now));
        let issued_id = d.issued_record_id.clone().unwrap();
        assert_ne!(issued_id, d.data.record_id);

        let issuer = d.issuer.as_ref().unwrap();
        assert_eq!(issuer.abn.as_deref(), Some("51 824 753 556"));
        assert_eq!(issuer.captured_at, now);
        assert!(d.history.verify().is_ok());
        assert!(d.history.last_of("issued").is_some());
    }

    #[test]
    fn test_non_strict_issue_reports_gaps() {
        let mut d = draft();
        let issuance = issue(
            &mut d,
            &PolicySet::default(),
            &job(),
            &profile(None),
            false,
            "user-1",
            Utc::now(),
        )
        .unwrap();

        assert!(!issuance.check.passes());
        assert_eq!(d.issued_record_id.as_ref(), Some(&issuance.issued_record_id));
        assert!(d.is_issued());
    }

    #[test]
    fn test_issue_is_terminal() {
        let mut d = draft();
        let p = profile(Some("51824753556"));
        issue(&mut d, &PolicySet::default(), &job(), &p, false, "user-1", Utc::now()).unwrap();
        let first = d.issued_record_id.clone().unwrap();

        let err =
            issue(&mut d, &PolicySet::default(), &job(), &p, false, "user-1", Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyIssued(ref id) if *id == first));
        assert_eq!(d.issued_record_id, Some(first));
    }
}
