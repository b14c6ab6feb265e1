//! Non-destructive merge of a regenerated model into the edited one
//!
//! Structure always comes from the fresh model. Sections, fields and
//! columns are matched by id; table rows are matched by position. A value
//! the user has entered (anything non-empty) always survives.

use std::collections::HashMap;

use jobpack_types::{FieldValue, RenderModel, RenderSection, Table, TableRow};
use tracing::warn;

/// Merge `fresh` into `current`, keeping every non-empty current value
pub fn merge_models(current: &RenderModel, fresh: &RenderModel) -> RenderModel {
    let by_id: HashMap<&str, &RenderSection> = current
        .sections
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();

    for section in &current.sections {
        if fresh.section(&section.id).is_none() {
            warn!(
                section = %section.id,
                "Section no longer in template; its values are dropped by the merge"
            );
        }
    }

    let sections = fresh
        .sections
        .iter()
        .map(|fresh_section| match by_id.get(fresh_section.id.as_str()) {
            Some(current_section) => merge_section(current_section, fresh_section),
            None => fresh_section.clone(),
        })
        .collect();

    RenderModel {
        title: fresh.title.clone(),
        record_id: current.record_id.clone(),
        timestamp: current.timestamp,
        doc_type: fresh.doc_type,
        disclaimer: fresh.disclaimer.clone(),
        sections,
        ovis_warnings: fresh.ovis_warnings.clone(),
    }
}

fn merge_section(current: &RenderSection, fresh: &RenderSection) -> RenderSection {
    let mut merged = fresh.clone();

    if let Some(fields) = merged.fields.as_mut() {
        for field in fields.iter_mut() {
            if let Some(kept) = current.field(&field.id).map(|f| &f.value) {
                field.value = prefer(kept, &field.value);
            }
        }
    }

    if let (Some(table), Some(current_table)) = (merged.table.as_mut(), current.table.as_ref()) {
        table.rows = merge_rows(current_table, table);
    }
    merged
}

/// Rows merge positionally over the longer of the two tables: rows the
/// user added beyond the fresh set are kept, and extra fresh rows are
/// appended.
fn merge_rows(current: &Table, fresh: &Table) -> Vec<TableRow> {
    let len = current.rows.len().max(fresh.rows.len());
    (0..len)
        .map(|i| {
            let kept = current.rows.get(i);
            let incoming = fresh.rows.get(i);
            fresh
                .columns
                .iter()
                .map(|column| {
                    let id = column.id.as_str();
                    let a = kept.and_then(|r| r.get(id)).unwrap_or(&FieldValue::Null);
                    let b = incoming.and_then(|r| r.get(id)).unwrap_or(&FieldValue::Null);
                    (column.id.clone(), prefer(a, b))
                })
                .collect()
        })
        .collect()
}

fn prefer(current: &FieldValue, fresh: &FieldValue) -> FieldValue {
    if current.is_empty() {
        fresh.clone()
    } else {
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobpack_types::{Column, DocType, Field, FieldType};
    use pretty_assertions::assert_eq;

    fn field(id: &str, value: FieldValue) -> Field {
        Field {
            id: id.to_string(),
            label: id.to_string(),
            field_type: FieldType::Text,
            options: None,
            required: false,
            placeholder: None,
            value,
        }
    }

    fn section(id: &str, fields: Vec<Field>) -> RenderSection {
        RenderSection {
            id: id.to_string(),
            title: id.to_string(),
            fields: Some(fields),
            table: None,
        }
    }

    fn table_section(rows: Vec<Vec<(&str, FieldValue)>>) -> RenderSection {
        let columns = ["description", "amount"]
            .iter()
            .map(|id| Column {
                id: id.to_string(),
                label: id.to_string(),
                column_type: FieldType::Text,
                width: None,
            })
            .collect();
        RenderSection {
            id: "items".to_string(),
            title: "Items".to_string(),
            fields: None,
            table: Some(Table {
                id: "claim_items".to_string(),
                columns,
                rows_key: "materials".to_string(),
                min_rows: 1,
                rows: rows
                    .into_iter()
                    .map(|r| r.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
                    .collect(),
            }),
        }
    }

    fn model(record_id: &str, sections: Vec<RenderSection>) -> RenderModel {
        RenderModel {
            title: "Payment Claim".to_string(),
            record_id: record_id.to_string(),
            timestamp: Utc::now(),
            doc_type: DocType::PaymentClaim,
            disclaimer: "Draft".to_string(),
            sections,
            ovis_warnings: vec![],
        }
    }

    #[test]
    fn test_user_value_survives() {
        let current = model("rec-1", vec![section("labour", vec![field("hours", "7.5 hours".into())])]);
        let fresh = model("rec-2", vec![section("labour", vec![field("hours", "8 hours".into())])]);

        let merged = merge_models(&current, &fresh);
        assert_eq!(merged.field_value("labour", "hours"), Some(&FieldValue::from("7.5 hours")));
        assert_eq!(merged.record_id, "rec-1");
    }

    #[test]
    fn test_empty_value_takes_fresh() {
        let current = model("rec-1", vec![section("labour", vec![field("hours", "".into())])]);
        let fresh = model("rec-2", vec![section("labour", vec![field("hours", "8 hours".into())])]);

        let merged = merge_models(&current, &fresh);
        assert_eq!(merged.field_value("labour", "hours"), Some(&FieldValue::from("8 hours")));
    }

    #[test]
    fn test_matches_by_id_not_position() {
        let current = model(
            "rec-1",
            vec![
                section("client", vec![field("client_name", "Jo".into())]),
                section("business", vec![field("business_name", "Acme".into())]),
            ],
        );
        let fresh = model(
            "rec-2",
            vec![
                section("business", vec![field("business_name", FieldValue::Null)]),
                section("client", vec![field("client_name", FieldValue::Null)]),
            ],
        );

        let merged = merge_models(&current, &fresh);
        assert_eq!(merged.sections[0].id, "business");
        assert_eq!(merged.field_value("business", "business_name"), Some(&FieldValue::from("Acme")));
        assert_eq!(merged.field_value("client", "client_name"), Some(&FieldValue::from("Jo")));
    }

    #[test]
    fn test_structure_follows_fresh() {
        let current = model("rec-1", vec![section("old", vec![field("gone", "x".into())])]);
        let fresh = model("rec-2", vec![section("new", vec![field("added", "y".into())])]);

        let merged = merge_models(&current, &fresh);
        assert_eq!(merged.structure(), fresh.structure());
    }

    #[test]
    fn test_rows_merge_cell_by_cell() {
        let current = model(
            "rec-1",
            vec![table_section(vec![
                vec![("description", "Paint (edited)".into()), ("amount", FieldValue::Null)],
                vec![("description", "Extra row".into()), ("amount", 50.0.into())],
            ])],
        );
        let fresh = model(
            "rec-2",
            vec![table_section(vec![vec![
                ("description", "Paint".into()),
                ("amount", 400.0.into()),
            ]])],
        );

        let merged = merge_models(&current, &fresh);
        let rows = &merged.section("items").unwrap().table.as_ref().unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["description"], FieldValue::from("Paint (edited)"));
        assert_eq!(rows[0]["amount"], FieldValue::Number(400.0));
        assert_eq!(rows[1]["description"], FieldValue::from("Extra row"));
    }

    #[test]
    fn test_fresh_rows_beyond_current_are_appended() {
        let current = model("rec-1", vec![table_section(vec![vec![("description", "A".into())]])]);
        let fresh = model(
            "rec-2",
            vec![table_section(vec![
                vec![("description", "B".into())],
                vec![("description", "C".into())],
            ])],
        );

        let merged = merge_models(&current, &fresh);
        let rows = &merged.section("items").unwrap().table.as_ref().unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["description"], FieldValue::from("A"));
        assert_eq!(rows[1]["description"], FieldValue::from("C"));
        assert_eq!(rows[1]["amount"], FieldValue::Null);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn value() -> impl Strategy<Value = FieldValue> {
            prop_oneof![
                Just(FieldValue::Null),
                Just(FieldValue::Text(String::new())),
                "[a-z0-9 ]{1,12}".prop_map(FieldValue::Text),
                (0.0f64..10_000.0).prop_map(FieldValue::Number),
            ]
        }

        proptest! {
            #[test]
            fn non_empty_current_always_wins(current in value(), fresh in value()) {
                let cur = model("rec-1", vec![section("s", vec![field("f", current.clone())])]);
                let new = model("rec-2", vec![section("s", vec![field("f", fresh.clone())])]);
                let merged = merge_models(&cur, &new);
                let got = merged.field_value("s", "f").unwrap();

                if current.is_empty() {
                    prop_assert_eq!(got, &fresh);
                } else {
                    prop_assert_eq!(got, &current);
                }
            }

            #[test]
            fn merge_with_self_is_identity(v in value()) {
                let m = model("rec-1", vec![section("s", vec![field("f", v)])]);
                let merged = merge_models(&m, &m);
                prop_assert_eq!(merged, m);
            }
        }
    }
}
