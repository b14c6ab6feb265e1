//! Document service: the engine's operation surface
//!
//! Every operation authorizes the caller against the job first, then
//! works on the one draft stored per `(job_id, doc_type)`. Failures
//! before the final store write leave the stored draft unchanged.

use std::sync::Arc;

use chrono::Utc;
use issuance_policy::{IssuerCheck, PolicySet};
use jobpack_types::{
    AuditAction, AuditEvent, BusinessProfile, Caller, DocType, DocumentDraft, IssuerProfile,
    JobRecord, RenderModel,
};
use serde::Serialize;
use template_engine::TemplateRegistry;
use tracing::{debug, info, warn};

use crate::access::{authorize, Action};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle;
use crate::merge::merge_models;
use crate::ports::{DraftStore, JobSource, TextGenerator};
use crate::prefill::{self, PrefillContext};

/// Draft plus the issuer snapshot and the gate's findings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOutcome {
    pub draft: DocumentDraft,
    pub issuer: IssuerProfile,
    pub check: IssuerCheck,
}

/// Document engine with its collaborators
#[derive(Clone)]
pub struct DocumentService {
    templates: Arc<TemplateRegistry>,
    policy: Arc<PolicySet>,
    jobs: Arc<dyn JobSource>,
    drafts: Arc<dyn DraftStore>,
    generator: Arc<dyn TextGenerator>,
    config: EngineConfig,
}

impl DocumentService {
    pub fn new(
        templates: Arc<TemplateRegistry>,
        policy: Arc<PolicySet>,
        jobs: Arc<dyn JobSource>,
        drafts: Arc<dyn DraftStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            templates,
            policy,
            jobs,
            drafts,
            generator,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn policy(&self) -> &PolicySet {
        &self.policy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ============================================================
    // Loading
    // ============================================================

    /// Load the job and authorize `action` on it
    pub async fn authorized_job(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        action: Action,
    ) -> EngineResult<JobRecord> {
        let job = self
            .jobs
            .get_job(job_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("Job {}", job_id)))?;
        authorize(caller, &job, doc_type, action)?;
        Ok(job)
    }

    /// Business profile of the job owner; an owner without a profile gets
    /// an empty one, which the issuance gate then reports on
    async fn profile_for(&self, job: &JobRecord) -> EngineResult<BusinessProfile> {
        Ok(self
            .jobs
            .get_profile(&job.user_id)
            .await?
            .unwrap_or_else(|| BusinessProfile {
                user_id: job.user_id.clone(),
                ..Default::default()
            }))
    }

    async fn require_draft(&self, job_id: &str, doc_type: DocType) -> EngineResult<DocumentDraft> {
        self.drafts
            .get(job_id, doc_type)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("{} draft for job {}", doc_type, job_id)))
    }

    /// Prefilled model for `job`, narrative text and OVIS included
    async fn fresh_model(
        &self,
        job: &JobRecord,
        doc_type: DocType,
        include_markup: bool,
    ) -> EngineResult<RenderModel> {
        let template = self.templates.get(doc_type)?;
        let profile = self.profile_for(job).await?;
        let ctx = PrefillContext::new(job, &profile, include_markup);

        let mut model = prefill::build_model(&template, &ctx);
        let generated = prefill::fill_narrative(
            &mut model,
            job,
            self.generator.as_ref(),
            self.config.generation_timeout,
        )
        .await?;
        prefill::finalize(&template, &mut model);

        debug!(
            job_id = %job.id,
            doc_type = %doc_type,
            generated,
            warnings = model.ovis_warnings.len(),
            "Built fresh model"
        );
        Ok(model)
    }

    /// Store `draft`, updating its version on success
    async fn store(
        &self,
        draft: &mut DocumentDraft,
        expected_version: Option<u64>,
    ) -> EngineResult<()> {
        draft.version = self.drafts.save(draft, expected_version).await?;
        Ok(())
    }

    // ============================================================
    // Operations
    // ============================================================

    /// Existing draft, if any
    pub async fn get_draft(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
    ) -> EngineResult<Option<DocumentDraft>> {
        self.authorized_job(caller, job_id, doc_type, Action::Edit)
            .await?;
        Ok(self.drafts.get(job_id, doc_type).await?)
    }

    /// Generate a fresh model and store it as a new, unapproved draft.
    ///
    /// Replaces an existing unissued draft; an issued one is never
    /// overwritten. On generation failure nothing is stored.
    pub async fn prefill(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        include_markup: bool,
    ) -> EngineResult<DocumentDraft> {
        let job = self
            .authorized_job(caller, job_id, doc_type, Action::Generate)
            .await?;

        let existing = self.drafts.get(job_id, doc_type).await?;
        if let Some(issued) = existing.as_ref().filter(|d| d.is_issued()) {
            return Err(EngineError::AlreadyIssued(
                issued.issued_record_id.clone().unwrap_or_default(),
            ));
        }

        let model = self.fresh_model(&job, doc_type, include_markup).await?;
        let mut draft = DocumentDraft::new(job_id, &job.user_id, model);
        let record_id = draft.data.record_id.clone();
        draft.history.append(
            AuditAction::Prefilled,
            &caller.user_id,
            &record_id,
            include_markup.then(|| "markup included".to_string()),
        );

        let expected = existing.map(|d| d.version).unwrap_or(0);
        self.store(&mut draft, Some(expected)).await?;

        info!(job_id, doc_type = %doc_type, record_id = %record_id, "Draft prefilled");
        Ok(draft)
    }

    /// Existing draft, or a newly prefilled one. The flag tells which.
    pub async fn load_or_create(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        include_markup: bool,
    ) -> EngineResult<(DocumentDraft, bool)> {
        match self.get_draft(caller, job_id, doc_type).await? {
            Some(draft) => Ok((draft, false)),
            None => Ok((
                self.prefill(caller, job_id, doc_type, include_markup)
                    .await?,
                true,
            )),
        }
    }

    /// Full-overwrite save of `data`.
    ///
    /// `approved` can set the flag but never clears it, and an issued
    /// draft stays issued. With `expected_version`, a stale save fails
    /// with [`EngineError::Conflict`].
    pub async fn save_draft(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        mut data: RenderModel,
        approved: Option<bool>,
        expected_version: Option<u64>,
    ) -> EngineResult<DocumentDraft> {
        let job = self
            .authorized_job(caller, job_id, doc_type, Action::Edit)
            .await?;
        if data.doc_type != doc_type {
            return Err(EngineError::InvalidInput(format!(
                "Model is a {} but was saved as {}",
                data.doc_type, doc_type
            )));
        }

        let template = self.templates.get(doc_type)?;
        prefill::finalize(&template, &mut data);

        let existing = self.drafts.get(job_id, doc_type).await?;
        let current_version = existing.as_ref().map(|d| d.version).unwrap_or(0);
        let mut draft = match existing {
            Some(mut draft) => {
                draft.data = data;
                draft
            }
            None => DocumentDraft::new(job_id, &job.user_id, data),
        };

        let record_id = draft.data.record_id.clone();
        if approved == Some(true) && !draft.approved {
            draft.approved = true;
            draft
                .history
                .append(AuditAction::Approved, &caller.user_id, &record_id, None);
        }
        draft.updated_at = Utc::now();
        draft.history.append(
            AuditAction::Saved {
                version: current_version + 1,
            },
            &caller.user_id,
            &record_id,
            None,
        );

        self.store(&mut draft, expected_version).await?;
        debug!(job_id, doc_type = %doc_type, version = draft.version, "Draft saved");
        Ok(draft)
    }

    /// Re-run prefill and merge the result into `current` (or the stored
    /// model), keeping every value the user has entered.
    ///
    /// `expected_version` is the stored version `current` was based on; a
    /// draft saved since then fails with [`EngineError::Conflict`] before
    /// anything is generated. Without it the stored version is taken as is.
    pub async fn regenerate(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        current: Option<RenderModel>,
        include_markup: bool,
        expected_version: Option<u64>,
    ) -> EngineResult<DocumentDraft> {
        let job = self
            .authorized_job(caller, job_id, doc_type, Action::Generate)
            .await?;
        let existing = self.drafts.get(job_id, doc_type).await?;
        let stored_version = existing.as_ref().map(|d| d.version).unwrap_or(0);
        if let Some(expected) = expected_version.filter(|v| *v != stored_version) {
            return Err(EngineError::Conflict {
                expected,
                actual: stored_version,
            });
        }

        let base = match (current, existing.as_ref()) {
            (Some(model), _) => model,
            (None, Some(draft)) => draft.data.clone(),
            (None, None) => {
                return Err(EngineError::not_found(format!(
                    "{} draft for job {}",
                    doc_type, job_id
                )))
            }
        };
        if base.doc_type != doc_type {
            return Err(EngineError::InvalidInput(format!(
                "Model is a {} but was regenerated as {}",
                base.doc_type, doc_type
            )));
        }

        let fresh = self.fresh_model(&job, doc_type, include_markup).await?;
        let template = self.templates.get(doc_type)?;
        let mut merged = merge_models(&base, &fresh);
        prefill::finalize(&template, &mut merged);

        let mut draft = match existing {
            Some(mut draft) => {
                draft.data = merged;
                draft
            }
            None => DocumentDraft::new(job_id, &job.user_id, merged),
        };
        let record_id = draft.data.record_id.clone();
        draft.updated_at = Utc::now();
        draft
            .history
            .append(AuditAction::Regenerated, &caller.user_id, &record_id, None);

        self.store(&mut draft, Some(stored_version)).await?;
        info!(job_id, doc_type = %doc_type, "Draft regenerated and merged");
        Ok(draft)
    }

    /// Set the approved flag; no validation beyond the draft existing
    pub async fn approve(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
    ) -> EngineResult<DocumentDraft> {
        self.authorized_job(caller, job_id, doc_type, Action::Edit)
            .await?;
        let mut draft = self.require_draft(job_id, doc_type).await?;
        let expected = draft.version;

        if lifecycle::approve(&mut draft, &caller.user_id) {
            self.store(&mut draft, Some(expected)).await?;
            info!(job_id, doc_type = %doc_type, "Draft approved");
        }
        Ok(draft)
    }

    /// Pass the issuance gate and store the issued draft
    pub async fn issue(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        strict: bool,
    ) -> EngineResult<IssueOutcome> {
        let job = self
            .authorized_job(caller, job_id, doc_type, Action::Issue { strict })
            .await?;
        let mut draft = self.require_draft(job_id, doc_type).await?;
        let profile = self.profile_for(&job).await?;
        let expected = draft.version;

        let issuance = match lifecycle::issue(
            &mut draft,
            &self.policy,
            &job,
            &profile,
            strict,
            &caller.user_id,
            Utc::now(),
        ) {
            Ok(issuance) => issuance,
            Err(EngineError::Validation(check)) => {
                warn!(
                    job_id,
                    doc_type = %doc_type,
                    missing = ?check.missing_required,
                    "Issuance blocked"
                );
                return Err(EngineError::Validation(check));
            }
            Err(e) => return Err(e),
        };

        self.store(&mut draft, Some(expected)).await?;
        Ok(IssueOutcome {
            draft,
            issuer: issuance.issuer,
            check: issuance.check,
        })
    }

    /// Issuer check without issuing, for showing what is still missing
    pub async fn check_issuer(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
    ) -> EngineResult<IssuerCheck> {
        let job = self
            .authorized_job(caller, job_id, doc_type, Action::Edit)
            .await?;
        let draft = self.require_draft(job_id, doc_type).await?;
        let profile = self.profile_for(&job).await?;
        Ok(lifecycle::evaluate_issuer(
            &self.policy,
            &job,
            &profile,
            &draft,
        ))
    }

    /// Append an export to the draft's export log. The draft's version is
    /// unchanged, so open editors keep saving against the version they hold.
    pub async fn record_export(
        &self,
        caller: &Caller,
        job_id: &str,
        doc_type: DocType,
        format: &str,
        audience: &str,
    ) -> EngineResult<DocumentDraft> {
        self.authorized_job(caller, job_id, doc_type, Action::Edit)
            .await?;
        let mut draft = self.require_draft(job_id, doc_type).await?;
        let record_id = draft
            .issued_record_id
            .clone()
            .unwrap_or_else(|| draft.data.record_id.clone());
        let event = AuditEvent::unchained(
            AuditAction::Exported {
                format: format.to_string(),
                audience: audience.to_string(),
            },
            &caller.user_id,
            &record_id,
        );
        self.drafts.append_export(job_id, doc_type, &event).await?;
        draft.exports.push(event);
        Ok(draft)
    }
}
