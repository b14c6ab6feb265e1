//! Embedded template loader
//!
//! The deployed template set is compiled into the binary from
//! `templates/*.json`.

use jobpack_types::DocType;

const SWMS_TEMPLATE: &str = include_str!("../templates/swms.json");
const PAYMENT_CLAIM_TEMPLATE: &str = include_str!("../templates/payment_claim.json");
const TOOLBOX_TALK_TEMPLATE: &str = include_str!("../templates/toolbox_talk.json");
const VARIATION_TEMPLATE: &str = include_str!("../templates/variation.json");
/// Extension of Time notice
const EOT_TEMPLATE: &str = include_str!("../templates/eot.json");
const PROGRESS_CLAIM_TEMPLATE: &str = include_str!("../templates/progress_claim.json");
const HANDOVER_TEMPLATE: &str = include_str!("../templates/handover.json");
const MAINTENANCE_TEMPLATE: &str = include_str!("../templates/maintenance.json");

/// Raw JSON source of the embedded template for `doc_type`
pub fn get_embedded_template(doc_type: DocType) -> &'static str {
    match doc_type {
        DocType::Swms => SWMS_TEMPLATE,
        DocType::PaymentClaim => PAYMENT_CLAIM_TEMPLATE,
        DocType::ToolboxTalk => TOOLBOX_TALK_TEMPLATE,
        DocType::Variation => VARIATION_TEMPLATE,
        DocType::Eot => EOT_TEMPLATE,
        DocType::ProgressClaim => PROGRESS_CLAIM_TEMPLATE,
        DocType::Handover => HANDOVER_TEMPLATE,
        DocType::Maintenance => MAINTENANCE_TEMPLATE,
    }
}

/// `(source name, raw JSON)` for every embedded template
pub fn embedded_sources() -> Vec<(String, &'static str)> {
    DocType::ALL
        .iter()
        .map(|d| {
            (
                format!("embedded:{}.json", d.code().to_lowercase()),
                get_embedded_template(*d),
            )
        })
        .collect()
}
