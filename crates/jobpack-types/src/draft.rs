//! Persisted document drafts and issuer snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditChain, AuditEvent};
use crate::job::BusinessProfile;
use crate::model::RenderModel;
use crate::template::DocType;

/// Persisted status of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    #[default]
    Draft,
    Issued,
}

impl DraftStatus {
    pub fn code(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "DRAFT",
            DraftStatus::Issued => "ISSUED",
        }
    }

    pub fn parse_code(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(DraftStatus::Draft),
            "ISSUED" => Some(DraftStatus::Issued),
            _ => None,
        }
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Lifecycle position derived from `status` and `approved`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Draft,
    Approved,
    Issued,
}

/// Snapshot of the business identity at the moment of issuance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerProfile {
    pub business_name: Option<String>,
    pub abn: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub licence_number: Option<String>,
    pub insurance_policy: Option<String>,
    pub logo_url: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl IssuerProfile {
    /// Freeze the live profile; later profile edits do not reach the copy
    pub fn snapshot(profile: &BusinessProfile, captured_at: DateTime<Utc>) -> Self {
        Self {
            business_name: profile.business_name.clone(),
            abn: profile.abn.clone(),
            contact_name: profile.contact_name.clone(),
            phone: profile.phone.clone(),
            email: profile.email.clone(),
            address: profile.address.clone(),
            licence_number: profile.licence_number.clone(),
            insurance_policy: profile.insurance_policy.clone(),
            logo_url: profile.logo_url.clone(),
            captured_at,
        }
    }
}

/// One draft per `(job_id, doc_type)`; latest write wins unless the caller
/// supplies an expected `version`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub job_id: String,
    pub doc_type: DocType,
    pub user_id: String,
    pub data: RenderModel,
    pub approved: bool,
    pub status: DraftStatus,
    pub issued_record_id: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issuer: Option<IssuerProfile>,
    /// Incremented by the store on every save
    #[serde(default)]
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: AuditChain,
    /// Exports, appended by the store outside `history` and `version` so
    /// an export never invalidates an editor's expected version
    #[serde(default)]
    pub exports: Vec<AuditEvent>,
}

impl DocumentDraft {
    /// Fresh, unapproved draft around a newly prefilled model
    pub fn new(job_id: &str, user_id: &str, data: RenderModel) -> Self {
        let history = AuditChain::new(&data.record_id);
        Self {
            job_id: job_id.to_string(),
            doc_type: data.doc_type,
            user_id: user_id.to_string(),
            data,
            approved: false,
            status: DraftStatus::Draft,
            issued_record_id: None,
            issued_at: None,
            issuer: None,
            version: 0,
            updated_at: Utc::now(),
            history,
            exports: Vec::new(),
        }
    }

    pub fn is_issued(&self) -> bool {
        self.status == DraftStatus::Issued
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        match (self.status, self.approved) {
            (DraftStatus::Issued, _) => LifecycleState::Issued,
            (DraftStatus::Draft, true) => LifecycleState::Approved,
            (DraftStatus::Draft, false) => LifecycleState::Draft,
        }
    }

    /// Disclaimer and OVIS warnings are dropped from exports once the
    /// document is approved or issued
    pub fn suppresses_warnings(&self) -> bool {
        self.approved || self.is_issued()
    }
}
