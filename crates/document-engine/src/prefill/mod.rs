//! Prefill: build a render model from a template, a job and a profile
//!
//! Prefill is split into a pure part ([`build_model`]) and the narrative
//! step ([`fill_narrative`]) that calls out to a [`TextGenerator`]. The
//! service persists nothing until both have succeeded.

pub mod fields;
pub mod rows;
pub mod totals;

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use issuance_policy::Jurisdiction;
use jobpack_types::{BusinessProfile, DocumentTemplate, FieldValue, JobRecord, RenderModel};
use template_engine::run_checks;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::ports::{GenerationError, GenerationRequest, TextGenerator};

pub use totals::{apply_totals, Totals, GST_RATE};

/// Fields written by the text generator when still empty after mapping
pub const NARRATIVE_FIELDS: &[&str] = &[
    "hazard_summary",
    "key_points",
    "variation_description",
    "delay_reason",
    "care_instructions",
];

/// Inputs to one prefill
#[derive(Debug, Clone, Copy)]
pub struct PrefillContext<'a> {
    pub job: &'a JobRecord,
    pub profile: &'a BusinessProfile,
    pub jurisdiction: Jurisdiction,
    /// Fold markup into material unit costs
    pub include_markup: bool,
    pub today: NaiveDate,
}

impl<'a> PrefillContext<'a> {
    /// Context dated today, with the jurisdiction taken from the job and
    /// then the profile
    pub fn new(job: &'a JobRecord, profile: &'a BusinessProfile, include_markup: bool) -> Self {
        Self {
            job,
            profile,
            jurisdiction: Jurisdiction::resolve([job.state.as_deref(), profile.state.as_deref()]),
            include_markup,
            today: Utc::now().date_naive(),
        }
    }
}

/// Build a fresh model: map fields, project rows, pad tables and compute
/// totals. OVIS warnings are left empty until [`finalize`].
pub fn build_model(template: &DocumentTemplate, ctx: &PrefillContext<'_>) -> RenderModel {
    let sections = template
        .sections
        .iter()
        .map(|section| {
            let mut section = section.clone();
            if let Some(fields) = section.fields.as_mut() {
                for field in fields.iter_mut() {
                    let value = fields::resolve(template.doc_type, field, ctx);
                    if !value.is_empty() {
                        field.value = value;
                    }
                }
            }
            if let Some(table) = section.table.as_mut() {
                let source = rows::collect(template.doc_type, &table.rows_key, ctx);
                if source.is_empty() && !table.rows.is_empty() {
                    // keep template-supplied rows, padded
                    while table.rows.len() < table.min_rows {
                        table.rows.push(table.blank_row());
                    }
                } else {
                    table.rows = rows::project(table, source);
                }
            }
            section
        })
        .collect();

    let mut model = RenderModel {
        title: template.title.clone(),
        record_id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        doc_type: template.doc_type,
        disclaimer: template.disclaimer.clone(),
        sections,
        ovis_warnings: Vec::new(),
    };
    apply_totals(&mut model);
    model
}

/// Generation requests for narrative fields that are still empty
pub fn narrative_requests(model: &RenderModel, job: &JobRecord) -> Vec<GenerationRequest> {
    let context = [&job.summary, &job.scope_of_work, &job.notes]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n");

    model
        .sections
        .iter()
        .flat_map(|section| section.fields().iter().map(move |f| (section, f)))
        .filter(|(_, f)| NARRATIVE_FIELDS.contains(&f.id.as_str()) && f.value.is_empty())
        .map(|(section, f)| GenerationRequest {
            doc_type: model.doc_type,
            section_id: section.id.clone(),
            field_id: f.id.clone(),
            label: f.label.clone(),
            job_title: job.title.clone(),
            trade: job.trade_type,
            context: context.clone(),
        })
        .collect()
}

/// Ask the generator for every empty narrative field. Any failure or
/// timeout fails the whole step and leaves `model` untouched.
pub async fn fill_narrative(
    model: &mut RenderModel,
    job: &JobRecord,
    generator: &dyn TextGenerator,
    timeout: Duration,
) -> EngineResult<usize> {
    let requests = narrative_requests(model, job);
    let mut generated = Vec::with_capacity(requests.len());

    for request in requests {
        let text = tokio::time::timeout(timeout, generator.generate(&request))
            .await
            .map_err(|_| GenerationError::Timeout(timeout.as_millis() as u64))??;
        debug!(field = %request.field_id, chars = text.len(), "Generated narrative field");
        generated.push((request, text));
    }

    let mut written = 0;
    for (request, text) in generated {
        if text.trim().is_empty() {
            continue;
        }
        let field = model
            .section_mut(&request.section_id)
            .and_then(|s| s.field_mut(&request.field_id))
            .ok_or_else(|| {
                EngineError::not_found(format!(
                    "Field {}.{}",
                    request.section_id, request.field_id
                ))
            })?;
        field.value = FieldValue::Text(text.trim().to_string());
        written += 1;
    }
    Ok(written)
}

/// Recompute the model's OVIS warnings against its template
pub fn finalize(template: &DocumentTemplate, model: &mut RenderModel) {
    model.ovis_warnings = run_checks(template, model);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FixedTextGenerator, NoopTextGenerator};
    use async_trait::async_trait;
    use jobpack_types::{DocType, MaterialLine, TradeType};
    use pretty_assertions::assert_eq;
    use template_engine::TemplateRegistry;

    fn job() -> JobRecord {
        JobRecord {
            id: "job-1".to_string(),
            user_id: "user-1".to_string(),
            title: "Repaint weatherboards".to_string(),
            trade_type: TradeType::Painter,
            property_type: Default::default(),
            address: Some("12 Smith St, Newtown NSW 2042".to_string()),
            state: Some("NSW".to_string()),
            client_name: Some("Jo Citizen".to_string()),
            client_email: None,
            client_phone: None,
            notes: Some("Lead paint suspected on eaves".to_string()),
            summary: None,
            scope_of_work: Some("Prep and two coats".to_string()),
            inclusions: None,
            exclusions: None,
            client_notes: None,
            estimated_hours: Some(10.0),
            start_date: Some("2024-03-01".to_string()),
            completion_date: Some("2024-03-15".to_string()),
            contract_value: Some(5000.0),
            materials: vec![MaterialLine {
                name: "Exterior acrylic".to_string(),
                quantity: 4.0,
                unit: Some("10L".to_string()),
                unit_cost: 100.0,
                markup_percent: None,
            }],
        }
    }

    fn profile() -> BusinessProfile {
        BusinessProfile {
            user_id: "user-1".to_string(),
            business_name: Some("Brush & Roll Pty Ltd".to_string()),
            abn: Some("51824753556".to_string()),
            contact_name: Some("Sam Painter".to_string()),
            hourly_rate: Some(80.0),
            markup_percent: Some(20.0),
            ..Default::default()
        }
    }

    fn template(doc_type: DocType) -> std::sync::Arc<DocumentTemplate> {
        TemplateRegistry::embedded()
            .unwrap()
            .get(doc_type)
            .unwrap()
    }

    #[test]
    fn test_common_fields_are_mapped() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let model = build_model(&template(DocType::PaymentClaim), &ctx);

        assert_eq!(
            model.field_value("business", "abn"),
            Some(&FieldValue::from("51 824 753 556"))
        );
        assert_eq!(
            model.field_value("client", "site_address"),
            Some(&FieldValue::from("12 Smith St, Newtown NSW 2042"))
        );
        assert_eq!(model.doc_type, DocType::PaymentClaim);
        assert!(model.ovis_warnings.is_empty());
    }

    #[test]
    fn test_payment_claim_rows_and_totals() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let model = build_model(&template(DocType::PaymentClaim), &ctx);

        let table = model.section("items").unwrap().table.as_ref().unwrap();
        // one material line plus labour
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["amount"], FieldValue::Number(400.0));
        assert_eq!(table.rows[1]["description"], FieldValue::from("Labour"));
        assert_eq!(table.rows[1]["amount"], FieldValue::Number(800.0));

        assert_eq!(model.field_value("totals", "subtotal"), Some(&FieldValue::Number(1200.0)));
        assert_eq!(model.field_value("totals", "gst"), Some(&FieldValue::Number(120.0)));
        assert_eq!(model.field_value("totals", "total"), Some(&FieldValue::Number(1320.0)));
    }

    #[test]
    fn test_markup_only_when_requested() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, true);
        let model = build_model(&template(DocType::PaymentClaim), &ctx);

        let table = model.section("items").unwrap().table.as_ref().unwrap();
        assert_eq!(table.rows[0]["unit_cost"], FieldValue::Number(120.0));
        assert_eq!(table.rows[0]["amount"], FieldValue::Number(480.0));
    }

    #[test]
    fn test_swms_uses_state_regulator_and_trade_hazards() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let model = build_model(&template(DocType::Swms), &ctx);

        assert_eq!(
            model.field_value("project", "regulator"),
            Some(&FieldValue::from("SafeWork NSW"))
        );
        let hazards = model.section("hazards").unwrap().table.as_ref().unwrap();
        assert_eq!(hazards.rows.len(), rows::hazards_for(TradeType::Painter).len());
        assert_eq!(
            model.field_value("signoff", "prepared_by"),
            Some(&FieldValue::from("Sam Painter"))
        );
    }

    #[test]
    fn test_tables_padded_to_min_rows() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let model = build_model(&template(DocType::Variation), &ctx);

        let table = model.section("cost").unwrap().table.as_ref().unwrap();
        assert_eq!(table.rows.len(), table.min_rows);
        assert!(table.rows[0].values().all(FieldValue::is_empty));
    }

    #[test]
    fn test_finalize_runs_checks() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let template = template(DocType::Variation);
        let mut model = build_model(&template, &ctx);
        finalize(&template, &mut model);

        let ids: Vec<&str> = model.ovis_warnings.iter().map(|w| w.id.as_str()).collect();
        assert!(ids.contains(&"variation_no_description"));
        assert!(ids.contains(&"variation_unpriced"));
    }

    #[tokio::test]
    async fn test_fill_narrative_writes_generated_text() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let mut model = build_model(&template(DocType::Swms), &ctx);

        let generator = FixedTextGenerator::new([("hazard_summary", "Work at height and lead dust.")]);
        let written = fill_narrative(&mut model, &job, &generator, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            model.field_value("safety", "hazard_summary"),
            Some(&FieldValue::from("Work at height and lead dust."))
        );
    }

    #[tokio::test]
    async fn test_noop_generator_leaves_fields_empty() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let mut model = build_model(&template(DocType::ToolboxTalk), &ctx);

        let written = fill_narrative(&mut model, &job, &NoopTextGenerator, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(model.field_value("discussion", "key_points").unwrap().is_empty());
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
            Err(GenerationError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_model_untouched() {
        let (job, profile) = (job(), profile());
        let ctx = PrefillContext::new(&job, &profile, false);
        let mut model = build_model(&template(DocType::Swms), &ctx);
        let before = model.clone();

        let err = fill_narrative(&mut model, &job, &FailingGenerator, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
        assert_eq!(model, before);
    }
}
