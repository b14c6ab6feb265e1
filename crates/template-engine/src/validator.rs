//! Template schema validation
//!
//! `validate_template` walks the raw JSON before it is deserialized so that
//! every failure can name the exact node that is wrong. It is pure and
//! fails fast on the first violation.

use std::collections::HashSet;

use jobpack_types::{DocType, DocumentTemplate, FieldType, Section};
use serde_json::{Map, Value};

use crate::error::TemplateValidationError;
use crate::ovis::{unresolved_references, OvisRule};

/// Phrases a disclaimer must contain (case-insensitive), at least one of
pub const DISCLAIMER_PHRASES: &[&str] = &["draft", "review required"];

const SEVERITIES: &[&str] = &["low", "medium", "high"];

type Result<T> = std::result::Result<T, TemplateValidationError>;

/// Validate a raw template and return the typed definition
pub fn validate_template(raw: &Value) -> Result<DocumentTemplate> {
    let root = raw
        .as_object()
        .ok_or_else(|| TemplateValidationError::new("Template must be a JSON object", "$"))?;

    // 1. Top-level scalars
    require_string(root, "schemaVersion", "")?;
    require_string(root, "jurisdiction", "")?;
    require_string(root, "title", "")?;

    let doc_type = require_string(root, "docType", "")?;
    if DocType::parse_code(doc_type).map(|d| d.code()) != Some(doc_type) {
        return Err(TemplateValidationError::new(
            format!("Unknown docType '{}'", doc_type),
            "docType",
        ));
    }

    let disclaimer = require_string(root, "disclaimer", "")?.to_lowercase();
    if !DISCLAIMER_PHRASES.iter().any(|p| disclaimer.contains(p)) {
        return Err(TemplateValidationError::new(
            "Disclaimer must state the document is a draft or that review is required",
            "disclaimer",
        ));
    }

    // 2. Sections
    let sections = match root.get("sections") {
        Some(Value::Array(sections)) if !sections.is_empty() => sections,
        Some(Value::Array(_)) => {
            return Err(TemplateValidationError::new(
                "Template must have at least one section",
                "sections",
            ))
        }
        Some(_) => return Err(wrong_type("sections", "an array")),
        None => return Err(missing("sections")),
    };

    let mut section_ids = HashSet::new();
    for (i, section) in sections.iter().enumerate() {
        let path = format!("sections[{}]", i);
        let id = validate_section(section, &path)?;
        if !section_ids.insert(id.to_string()) {
            return Err(TemplateValidationError::new(
                format!("Duplicate section id '{}'", id),
                format!("{}.id", path),
            ));
        }
    }

    // 3. OVIS checks, resolved against the typed sections
    let typed_sections: Vec<Section> = serde_json::from_value(Value::Array(sections.clone()))
        .map_err(|e| TemplateValidationError::new(e.to_string(), "sections"))?;
    match root.get("ovisChecks") {
        None | Some(Value::Null) => {}
        Some(Value::Array(checks)) => {
            let mut check_ids = HashSet::new();
            for (i, check) in checks.iter().enumerate() {
                let path = format!("ovisChecks[{}]", i);
                let id = validate_check(check, &path, &typed_sections)?;
                if !check_ids.insert(id.to_string()) {
                    return Err(TemplateValidationError::new(
                        format!("Duplicate OVIS check id '{}'", id),
                        format!("{}.id", path),
                    ));
                }
            }
        }
        Some(_) => return Err(wrong_type("ovisChecks", "an array")),
    }

    // 4. Deserialize; the structural walk above guarantees the shape
    let template: DocumentTemplate = serde_json::from_value(raw.clone())
        .map_err(|e| TemplateValidationError::new(e.to_string(), "$"))?;

    Ok(template)
}

fn validate_section<'a>(value: &'a Value, path: &str) -> Result<&'a str> {
    let section = value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object"))?;
    let id = require_string(section, "id", path)?;
    require_string(section, "title", path)?;

    let fields = section.get("fields").filter(|v| !v.is_null());
    let table = section.get("table").filter(|v| !v.is_null());
    if fields.is_none() && table.is_none() {
        return Err(TemplateValidationError::new(
            "Section must define fields, a table, or both",
            path,
        ));
    }

    if let Some(fields) = fields {
        let fields_path = join(path, "fields");
        let fields = fields
            .as_array()
            .ok_or_else(|| wrong_type(&fields_path, "an array"))?;
        let mut field_ids = HashSet::new();
        for (i, field) in fields.iter().enumerate() {
            let field_path = format!("{}[{}]", fields_path, i);
            let field_id = validate_field(field, &field_path)?;
            if !field_ids.insert(field_id) {
                return Err(TemplateValidationError::new(
                    format!("Duplicate field id '{}'", field_id),
                    join(&field_path, "id"),
                ));
            }
        }
    }

    if let Some(table) = table {
        validate_table(table, &join(path, "table"))?;
    }

    Ok(id)
}

fn validate_field<'a>(value: &'a Value, path: &str) -> Result<&'a str> {
    let field = value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object"))?;
    let id = require_string(field, "id", path)?;
    require_string(field, "label", path)?;
    let field_type = require_type(field, path)?;

    if field_type.requires_options() {
        let options_path = join(path, "options");
        match field.get("options") {
            Some(Value::Array(options)) if !options.is_empty() => {
                if let Some(i) = options.iter().position(|o| !o.is_string()) {
                    return Err(wrong_type(&format!("{}[{}]", options_path, i), "a string"));
                }
            }
            _ => {
                return Err(TemplateValidationError::new(
                    "Select fields need a non-empty list of options",
                    options_path,
                ))
            }
        }
    }

    optional_kind(field, "required", path, Value::is_boolean, "a boolean")?;
    optional_kind(field, "placeholder", path, Value::is_string, "a string")?;

    Ok(id)
}

fn validate_table(value: &Value, path: &str) -> Result<()> {
    let table = value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object"))?;
    require_string(table, "id", path)?;
    require_string(table, "rowsKey", path)?;

    let columns_path = join(path, "columns");
    let columns = match table.get("columns") {
        Some(Value::Array(columns)) if !columns.is_empty() => columns,
        Some(Value::Array(_)) => {
            return Err(TemplateValidationError::new(
                "Table must have at least one column",
                columns_path,
            ))
        }
        Some(_) => return Err(wrong_type(&columns_path, "an array")),
        None => return Err(missing(&columns_path)),
    };

    let mut column_ids = HashSet::new();
    for (i, column) in columns.iter().enumerate() {
        let column_path = format!("{}[{}]", columns_path, i);
        let column = column
            .as_object()
            .ok_or_else(|| wrong_type(&column_path, "an object"))?;
        let id = require_string(column, "id", &column_path)?;
        require_string(column, "label", &column_path)?;
        require_type(column, &column_path)?;
        optional_kind(column, "width", &column_path, Value::is_u64, "a positive integer")?;
        if !column_ids.insert(id) {
            return Err(TemplateValidationError::new(
                format!("Duplicate column id '{}'", id),
                join(&column_path, "id"),
            ));
        }
    }

    optional_kind(table, "minRows", path, Value::is_u64, "a non-negative integer")?;
    optional_kind(table, "rows", path, Value::is_array, "an array")?;
    Ok(())
}

fn validate_check<'a>(value: &'a Value, path: &str, sections: &[Section]) -> Result<&'a str> {
    let check = value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object"))?;
    let id = require_string(check, "id", path)?;
    require_string(check, "message", path)?;

    let severity = require_string(check, "severity", path)?;
    if !SEVERITIES.contains(&severity) {
        return Err(TemplateValidationError::new(
            format!("Unknown severity '{}'", severity),
            join(path, "severity"),
        ));
    }

    let rule_path = join(path, "rule");
    let rule = OvisRule::parse(require_string(check, "rule", path)?)
        .map_err(|e| TemplateValidationError::new(e.to_string(), rule_path.as_str()))?;
    let unresolved = unresolved_references(&rule, sections);
    if !unresolved.is_empty() {
        return Err(TemplateValidationError::new(
            format!("Rule references unknown ids: {}", unresolved.join(", ")),
            rule_path,
        ));
    }

    Ok(id)
}

// ============================================================
// Helpers
// ============================================================

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn missing(path: &str) -> TemplateValidationError {
    TemplateValidationError::new("Missing required property", path)
}

fn wrong_type(path: &str, expected: &str) -> TemplateValidationError {
    TemplateValidationError::new(format!("Expected {}", expected), path)
}

/// A present, non-blank string property
fn require_string<'a>(obj: &'a Map<String, Value>, key: &str, parent: &str) -> Result<&'a str> {
    let path = join(parent, key);
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(TemplateValidationError::new("Must not be blank", path)),
        Some(_) => Err(wrong_type(&path, "a string")),
        None => Err(missing(&path)),
    }
}

fn require_type(obj: &Map<String, Value>, parent: &str) -> Result<FieldType> {
    let raw = require_string(obj, "type", parent)?;
    serde_json::from_value(Value::String(raw.to_string())).map_err(|_| {
        TemplateValidationError::new(format!("Unknown field type '{}'", raw), join(parent, "type"))
    })
}

fn optional_kind(
    obj: &Map<String, Value>,
    key: &str,
    parent: &str,
    is_kind: fn(&Value) -> bool,
    expected: &str,
) -> Result<()> {
    match obj.get(key) {
        Some(v) if !v.is_null() && !is_kind(v) => Err(wrong_type(&join(parent, key), expected)),
        _ => Ok(()),
    }
}
