//! Field value sources
//!
//! Document-specific mappings are matched first, then the fields every
//! template shares (business, client and site details).

use issuance_policy::{format_abn, validate_abn};
use jobpack_types::{DocType, Field, FieldValue, PropertyType};

use super::rows::{hazards_for, ppe_for};
use super::PrefillContext;

/// Emergency services line for Australian sites
pub const EMERGENCY_CONTACT: &str = "000 (Police, Fire, Ambulance)";

/// Resolve the prefilled value of `field`; `Null` when no source applies
pub fn resolve(doc_type: DocType, field: &Field, ctx: &PrefillContext<'_>) -> FieldValue {
    let job = ctx.job;
    match (doc_type, field.id.as_str()) {
        (DocType::Swms, "regulator") => ctx.jurisdiction.state.map(|s| s.whs_regulator()).into(),
        (DocType::Swms, "trade") => job.trade_type.display_name().into(),
        (DocType::Swms, "ppe") => ppe_for(job.trade_type).join(", ").into(),
        (DocType::Swms, "emergency_contact") => EMERGENCY_CONTACT.into(),
        (DocType::Swms, "prepared_by") | (DocType::ToolboxTalk, "presenter") => {
            preparer(ctx).into()
        }
        (DocType::ToolboxTalk, "topic") => hazards_for(job.trade_type)
            .first()
            .map(|h| format!("{} - {}", h.task, h.hazard))
            .into(),
        (DocType::ToolboxTalk, "hazards_discussed") => hazards_for(job.trade_type)
            .iter()
            .map(|h| h.hazard)
            .collect::<Vec<_>>()
            .join(", ")
            .into(),
        (DocType::PaymentClaim | DocType::ProgressClaim, "sopa_statement") => {
            sopa_statement(ctx).into()
        }
        (DocType::Eot, "original_completion") => job.completion_date.clone().into(),
        (DocType::Handover, "scope_summary") => job.scope_of_work.clone().into(),
        (DocType::Maintenance, "general_notes") => job.client_notes.clone().into(),
        (DocType::Maintenance, "property_type") => match job.property_type {
            PropertyType::Residential => "Residential",
            PropertyType::Commercial => "Commercial",
        }
        .into(),
        (_, id) => common(id, ctx),
    }
}

fn common(field_id: &str, ctx: &PrefillContext<'_>) -> FieldValue {
    let job = ctx.job;
    let profile = ctx.profile;
    match field_id {
        "business_name" => profile.business_name.clone().into(),
        "abn" => profile
            .abn
            .as_deref()
            .map(|abn| match validate_abn(abn) {
                Ok(digits) => format_abn(&digits),
                Err(_) => abn.trim().to_string(),
            })
            .into(),
        "contact_name" => profile.contact_name.clone().into(),
        "phone" => profile.phone.clone().into(),
        "email" => profile.email.clone().into(),
        "licence_number" => profile.licence_number.clone().into(),
        "client_name" => job.client_name.clone().into(),
        "client_email" => job.client_email.clone().into(),
        "client_phone" => job.client_phone.clone().into(),
        "site_address" => job.address.clone().into(),
        "job_title" => job.title.as_str().into(),
        "start_date" => job.start_date.clone().into(),
        "completion_date" => job.completion_date.clone().into(),
        "contract_value" => job.contract_value.into(),
        "inclusions" => job.inclusions.clone().into(),
        "exclusions" => job.exclusions.clone().into(),
        "claim_date" | "variation_date" | "notice_date" | "talk_date" | "date_prepared" => {
            ctx.today.format("%Y-%m-%d").to_string().into()
        }
        _ => FieldValue::Null,
    }
}

/// Contact name, falling back to the business name
fn preparer(ctx: &PrefillContext<'_>) -> Option<String> {
    [&ctx.profile.contact_name, &ctx.profile.business_name]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
}

fn sopa_statement(ctx: &PrefillContext<'_>) -> String {
    match ctx.jurisdiction.state {
        Some(state) => format!(
            "This is a payment claim made under the {}.",
            state.security_of_payment_act()
        ),
        None => "This is a payment claim made under the applicable security of payment legislation."
            .to_string(),
    }
}
