//! Output Variance & Integrity Signals
//!
//! Non-blocking checks run against a populated render model. A triggered
//! check becomes an [`OvisWarning`] carrying the check's id, severity and
//! message.

pub mod rule;

pub use rule::{FieldRef, OvisRule, RuleParseError};

use chrono::NaiveDate;
use jobpack_types::{DocumentTemplate, FieldValue, OvisCheck, OvisWarning, RenderModel, Section};
use tracing::debug;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

impl OvisRule {
    /// Whether the rule fires against `model`. References to sections,
    /// fields or columns the model does not have never fire.
    pub fn evaluate(&self, model: &RenderModel) -> bool {
        match self {
            OvisRule::RequiredMissing => !model.missing_required_fields().is_empty(),
            OvisRule::Empty(r) => model
                .field_value(&r.section, &r.field)
                .map(FieldValue::is_empty)
                .unwrap_or(false),
            OvisRule::RowsBelowMin { section } => table_of(model, section)
                .map(|t| t.filled_rows() < t.min_rows)
                .unwrap_or(false),
            OvisRule::TableEmpty { section } => table_of(model, section)
                .map(|t| t.filled_rows() == 0)
                .unwrap_or(false),
            OvisRule::SumZero(r) => match table_of(model, &r.section) {
                Some(table) if table.column(&r.field).is_some() => {
                    let sum: f64 = table
                        .rows
                        .iter()
                        .filter_map(|row| row.get(&r.field).and_then(FieldValue::as_number))
                        .sum();
                    sum.abs() < 0.005
                }
                _ => false,
            },
            OvisRule::DateOrder { first, second } => {
                let a = model
                    .field_value(&first.section, &first.field)
                    .and_then(parse_date);
                let b = model
                    .field_value(&second.section, &second.field)
                    .and_then(parse_date);
                matches!((a, b), (Some(a), Some(b)) if a > b)
            }
        }
    }
}

fn table_of<'a>(model: &'a RenderModel, section: &str) -> Option<&'a jobpack_types::Table> {
    model.section(section).and_then(|s| s.table.as_ref())
}

/// Parse a date field in ISO or Australian day-first format
pub fn parse_date(value: &FieldValue) -> Option<NaiveDate> {
    let text = value.as_text()?.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Run every check of `template` against `model`, in template order.
/// Checks whose rule does not parse are skipped (the validator rejects
/// such templates at load).
pub fn run_checks(template: &DocumentTemplate, model: &RenderModel) -> Vec<OvisWarning> {
    evaluate_checks(&template.ovis_checks, model)
}

pub fn evaluate_checks(checks: &[OvisCheck], model: &RenderModel) -> Vec<OvisWarning> {
    checks
        .iter()
        .filter(|check| match OvisRule::parse(&check.rule) {
            Ok(rule) => {
                let fired = rule.evaluate(model);
                debug!(check = %check.id, rule = %rule, fired, "Evaluated OVIS check");
                fired
            }
            Err(_) => false,
        })
        .map(|check| OvisWarning {
            id: check.id.clone(),
            severity: check.severity,
            message: check.message.clone(),
        })
        .collect()
}

/// Names a rule references that `sections` does not define
pub fn unresolved_references(rule: &OvisRule, sections: &[Section]) -> Vec<String> {
    let find_section = |id: &str| sections.iter().find(|s| s.id == id);
    let field_exists = |r: &FieldRef| {
        find_section(&r.section)
            .and_then(|s| s.field(&r.field))
            .is_some()
    };
    let table_exists = |id: &str| find_section(id).map(|s| s.table.is_some()).unwrap_or(false);

    match rule {
        OvisRule::RequiredMissing => Vec::new(),
        OvisRule::Empty(r) => (!field_exists(r))
            .then(|| r.to_string())
            .into_iter()
            .collect(),
        OvisRule::RowsBelowMin { section } | OvisRule::TableEmpty { section } => {
            (!table_exists(section))
                .then(|| section.clone())
                .into_iter()
                .collect()
        }
        OvisRule::SumZero(r) => {
            let column_exists = find_section(&r.section)
                .and_then(|s| s.table.as_ref())
                .and_then(|t| t.column(&r.field))
                .is_some();
            (!column_exists).then(|| r.to_string()).into_iter().collect()
        }
        OvisRule::DateOrder { first, second } => [first, second]
            .into_iter()
            .filter(|r| !field_exists(*r))
            .map(|r| r.to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobpack_types::{DocType, OvisSeverity};

    fn model() -> RenderModel {
        let sections: Vec<Section> = serde_json::from_value(serde_json::json!([
            {
                "id": "client",
                "title": "Client",
                "fields": [
                    {"id": "client_name", "label": "Client name", "type": "text", "required": true, "value": ""},
                    {"id": "site_address", "label": "Site address", "type": "text", "value": "1 Smith St"}
                ]
            },
            {
                "id": "dates",
                "title": "Dates",
                "fields": [
                    {"id": "original_completion", "label": "Original", "type": "date", "value": "2026-03-10"},
                    {"id": "revised_completion", "label": "Revised", "type": "date", "value": "01/03/2026"}
                ]
            },
            {
                "id": "items",
                "title": "Items",
                "table": {
                    "id": "claim_items",
                    "columns": [
                        {"id": "description", "label": "Description", "type": "text"},
                        {"id": "amount", "label": "Amount", "type": "currency"}
                    ],
                    "rowsKey": "materials",
                    "minRows": 2,
                    "rows": [
                        {"description": "Paint", "amount": 0},
                        {"description": null, "amount": null}
                    ]
                }
            }
        ]))
        .unwrap();

        RenderModel {
            title: "Payment Claim".to_string(),
            record_id: "rec-1".to_string(),
            timestamp: Utc::now(),
            doc_type: DocType::PaymentClaim,
            disclaimer: "Draft - review required".to_string(),
            sections,
            ovis_warnings: vec![],
        }
    }

    fn fires(rule: &str) -> bool {
        OvisRule::parse(rule).unwrap().evaluate(&model())
    }

    #[test]
    fn test_required_missing_and_empty() {
        assert!(fires("required_missing()"));
        assert!(fires("empty(client.client_name)"));
        assert!(!fires("empty(client.site_address)"));
    }

    #[test]
    fn test_table_rules() {
        assert!(fires("rows_below_min(items)"));
        assert!(!fires("table_empty(items)"));
        assert!(fires("sum_zero(items.amount)"));
    }

    #[test]
    fn test_date_order_accepts_mixed_formats() {
        assert!(fires("date_order(dates.original_completion, dates.revised_completion)"));
        assert!(!fires("date_order(dates.revised_completion, dates.original_completion)"));
    }

    #[test]
    fn test_unknown_references_never_fire() {
        assert!(!fires("empty(client.nope)"));
        assert!(!fires("rows_below_min(client)"));
        assert!(!fires("sum_zero(items.nope)"));
        assert!(!fires("date_order(dates.nope, dates.original_completion)"));
    }

    #[test]
    fn test_evaluate_checks_emits_warnings_in_order() {
        let checks = vec![
            OvisCheck {
                id: "no_client".to_string(),
                severity: OvisSeverity::Medium,
                rule: "empty(client.client_name)".to_string(),
                message: "Client name is missing".to_string(),
            },
            OvisCheck {
                id: "has_site".to_string(),
                severity: OvisSeverity::Low,
                rule: "empty(client.site_address)".to_string(),
                message: "Site address is missing".to_string(),
            },
            OvisCheck {
                id: "zero".to_string(),
                severity: OvisSeverity::High,
                rule: "sum_zero(items.amount)".to_string(),
                message: "Claim totals $0".to_string(),
            },
        ];

        let warnings = evaluate_checks(&checks, &model());
        let ids: Vec<&str> = warnings.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["no_client", "zero"]);
        assert_eq!(warnings[1].severity, OvisSeverity::High);
    }

    #[test]
    fn test_unresolved_references() {
        let sections = model().sections;
        let rule = OvisRule::parse("date_order(dates.nope, client.client_name)").unwrap();
        assert_eq!(unresolved_references(&rule, &sections), vec!["dates.nope".to_string()]);

        let rule = OvisRule::parse("table_empty(client)").unwrap();
        assert_eq!(unresolved_references(&rule, &sections), vec!["client".to_string()]);

        let rule = OvisRule::parse("sum_zero(items.amount)").unwrap();
        assert!(unresolved_references(&rule, &sections).is_empty());
    }
}
