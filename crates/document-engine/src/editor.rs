//! Pure edit operations on a render model
//!
//! Every operation takes the current model and returns a new one; the
//! input is never modified. Sections, fields and columns are addressed by
//! id, table rows by position.

use jobpack_types::{FieldValue, RenderModel, Table};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::prefill::apply_totals;

/// One editor action, as sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum EditOp {
    #[serde(rename_all = "camelCase")]
    SetField {
        section_id: String,
        field_id: String,
        value: FieldValue,
    },
    #[serde(rename_all = "camelCase")]
    SetCell {
        section_id: String,
        row_index: usize,
        column_id: String,
        value: FieldValue,
    },
    #[serde(rename_all = "camelCase")]
    AddRow { section_id: String },
    #[serde(rename_all = "camelCase")]
    RemoveRow { section_id: String, row_index: usize },
    /// Recompute subtotal, GST and total from the amount column
    RecalculateTotals,
}

/// Apply one [`EditOp`]
pub fn apply_edit(model: &RenderModel, op: &EditOp) -> EngineResult<RenderModel> {
    match op {
        EditOp::SetField {
            section_id,
            field_id,
            value,
        } => mutate_field(model, section_id, field_id, value.clone()),
        EditOp::SetCell {
            section_id,
            row_index,
            column_id,
            value,
        } => mutate_table_cell(model, section_id, *row_index, column_id, value.clone()),
        EditOp::AddRow { section_id } => add_table_row(model, section_id),
        EditOp::RemoveRow {
            section_id,
            row_index,
        } => remove_table_row(model, section_id, *row_index),
        EditOp::RecalculateTotals => Ok(recalculate_totals(model)),
    }
}

/// Replace one field's value
pub fn mutate_field(
    model: &RenderModel,
    section_id: &str,
    field_id: &str,
    value: FieldValue,
) -> EngineResult<RenderModel> {
    let mut next = model.clone();
    let field = next
        .section_mut(section_id)
        .ok_or_else(|| EngineError::not_found(format!("Section '{}'", section_id)))?
        .field_mut(field_id)
        .ok_or_else(|| {
            EngineError::not_found(format!("Field '{}.{}'", section_id, field_id))
        })?;
    field.value = value;
    Ok(next)
}

/// Replace one table cell
pub fn mutate_table_cell(
    model: &RenderModel,
    section_id: &str,
    row_index: usize,
    column_id: &str,
    value: FieldValue,
) -> EngineResult<RenderModel> {
    let mut next = model.clone();
    let table = table_mut(&mut next, section_id)?;
    if table.column(column_id).is_none() {
        return Err(EngineError::not_found(format!(
            "Column '{}' in section '{}'",
            column_id, section_id
        )));
    }
    let row_count = table.rows.len();
    let row = table
        .rows
        .get_mut(row_index)
        .ok_or_else(|| row_out_of_range(section_id, row_index, row_count))?;
    row.insert(column_id.to_string(), value);
    Ok(next)
}

/// Append a blank row
pub fn add_table_row(model: &RenderModel, section_id: &str) -> EngineResult<RenderModel> {
    let mut next = model.clone();
    let table = table_mut(&mut next, section_id)?;
    let row = table.blank_row();
    table.rows.push(row);
    Ok(next)
}

/// Remove the row at `row_index`. Rejected when the table is already at
/// its minimum row count.
pub fn remove_table_row(
    model: &RenderModel,
    section_id: &str,
    row_index: usize,
) -> EngineResult<RenderModel> {
    let mut next = model.clone();
    let table = table_mut(&mut next, section_id)?;
    if table.rows.len() <= table.min_rows {
        return Err(EngineError::TableRowMinimum {
            section_id: section_id.to_string(),
            min_rows: table.min_rows,
        });
    }
    if row_index >= table.rows.len() {
        return Err(row_out_of_range(section_id, row_index, table.rows.len()));
    }
    table.rows.remove(row_index);
    Ok(next)
}

/// Copy of `model` with totals recomputed; unchanged when it has no
/// amount column
pub fn recalculate_totals(model: &RenderModel) -> RenderModel {
    let mut next = model.clone();
    apply_totals(&mut next);
    next
}

fn table_mut<'a>(model: &'a mut RenderModel, section_id: &str) -> EngineResult<&'a mut Table> {
    model
        .section_mut(section_id)
        .ok_or_else(|| EngineError::not_found(format!("Section '{}'", section_id)))?
        .table
        .as_mut()
        .ok_or_else(|| EngineError::not_found(format!("Table in section '{}'", section_id)))
}

fn row_out_of_range(section_id: &str, row_index: usize, len: usize) -> EngineError {
    EngineError::InvalidInput(format!(
        "Row {} out of range for section '{}' ({} rows)",
        row_index, section_id, len
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobpack_types::{Column, DocType, Field, FieldType, Section, TableRow};
    use pretty_assertions::assert_eq;

    fn column(id: &str) -> Column {
        Column {
            id: id.to_string(),
            label: id.to_string(),
            column_type: FieldType::Text,
            width: None,
        }
    }

    fn model(rows: usize, min_rows: usize) -> RenderModel {
        let table = Table {
            id: "attendance".to_string(),
            columns: vec![column("name"), column("role")],
            rows_key: "attendees".to_string(),
            min_rows,
            rows: Vec::new(),
        };
        let rows = (0..rows)
            .map(|i| {
                let mut row: TableRow = table.blank_row();
                row.insert("name".to_string(), format!("Worker {}", i).into());
                row
            })
            .collect();

        RenderModel {
            title: "Toolbox Talk".to_string(),
            record_id: "rec-1".to_string(),
            timestamp: Utc::now(),
            doc_type: DocType::ToolboxTalk,
            disclaimer: "Draft".to_string(),
            sections: vec![
                Section {
                    id: "session".to_string(),
                    title: "Session".to_string(),
                    fields: Some(vec![Field {
                        id: "topic".to_string(),
                        label: "Topic".to_string(),
                        field_type: FieldType::Text,
                        options: None,
                        required: true,
                        placeholder: None,
                        value: FieldValue::Null,
                    }]),
                    table: None,
                },
                Section {
                    id: "attendees".to_string(),
                    title: "Attendees".to_string(),
                    fields: None,
                    table: Some(Table { rows, ..table }),
                },
            ],
            ovis_warnings: vec![],
        }
    }

    fn rows(model: &RenderModel) -> &[TableRow] {
        &model.section("attendees").unwrap().table.as_ref().unwrap().rows
    }

    #[test]
    fn test_mutate_field_leaves_input_untouched() {
        let original = model(1, 1);
        let edited = mutate_field(&original, "session", "topic", "Ladder safety".into()).unwrap();

        assert_eq!(
            edited.field_value("session", "topic"),
            Some(&FieldValue::from("Ladder safety"))
        );
        assert_eq!(original.field_value("session", "topic"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_mutate_unknown_field_is_not_found() {
        let err = mutate_field(&model(1, 1), "session", "nope", "x".into()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        let err = mutate_field(&model(1, 1), "nope", "topic", "x".into()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_mutate_table_cell_by_position() {
        let edited =
            mutate_table_cell(&model(2, 1), "attendees", 1, "role", "Apprentice".into()).unwrap();
        assert_eq!(rows(&edited)[1]["role"], FieldValue::from("Apprentice"));
        assert_eq!(rows(&edited)[0]["role"], FieldValue::Null);

        let err =
            mutate_table_cell(&model(2, 1), "attendees", 5, "role", "x".into()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        let err =
            mutate_table_cell(&model(2, 1), "attendees", 0, "wage", "x".into()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_add_row_appends_blank() {
        let edited = add_table_row(&model(1, 1), "attendees").unwrap();
        assert_eq!(rows(&edited).len(), 2);
        assert!(rows(&edited)[1].values().all(FieldValue::is_empty));
    }

    #[test]
    fn test_remove_row_at_minimum_is_rejected() {
        let err = remove_table_row(&model(1, 1), "attendees", 0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::TableRowMinimum { ref section_id, min_rows: 1 } if section_id == "attendees"
        ));
    }

    #[test]
    fn test_remove_row_above_minimum() {
        let edited = remove_table_row(&model(2, 1), "attendees", 0).unwrap();
        assert_eq!(rows(&edited).len(), 1);
        assert_eq!(rows(&edited)[0]["name"], FieldValue::from("Worker 1"));
    }

    #[test]
    fn test_remove_on_fieldless_section_is_not_found() {
        let err = remove_table_row(&model(2, 1), "session", 0).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_edit_op_wire_format() {
        let op: EditOp = serde_json::from_str(
            r#"{"op":"setCell","sectionId":"attendees","rowIndex":0,"columnId":"role","value":"Lead"}"#,
        )
        .unwrap();
        assert_eq!(
            op,
            EditOp::SetCell {
                section_id: "attendees".to_string(),
                row_index: 0,
                column_id: "role".to_string(),
                value: FieldValue::from("Lead"),
            }
        );

        let edited = apply_edit(&model(1, 1), &op).unwrap();
        assert_eq!(rows(&edited)[0]["role"], FieldValue::from("Lead"));
    }
}
