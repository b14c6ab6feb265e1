//! Render model: the live, editable instance of a document

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::template::{DocType, OvisSeverity, Section};

/// Value held by a field or a table cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Null and whitespace-only text count as empty; numbers never do
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Numeric reading of the value. Text is parsed after stripping
    /// currency symbols, thousands separators and a trailing `%`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Null => None,
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => {
                let cleaned: String = s
                    .trim()
                    .chars()
                    .filter(|c| !matches!(c, '$' | ',' | '%' | ' '))
                    .collect();
                cleaned.parse().ok()
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{:.2}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Render-time section: same shape as the template section, with values
pub type RenderSection = Section;

/// Integrity warning produced by an OVIS check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvisWarning {
    pub id: String,
    pub severity: OvisSeverity,
    pub message: String,
}

/// Editable document instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub title: String,
    /// Unique per generated instance
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub doc_type: DocType,
    pub disclaimer: String,
    pub sections: Vec<RenderSection>,
    #[serde(default)]
    pub ovis_warnings: Vec<OvisWarning>,
}

impl RenderModel {
    pub fn section(&self, id: &str) -> Option<&RenderSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut RenderSection> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    /// Value of `section.field`, if both exist
    pub fn field_value(&self, section_id: &str, field_id: &str) -> Option<&FieldValue> {
        self.section(section_id)
            .and_then(|s| s.field(field_id))
            .map(|f| &f.value)
    }

    /// Identity skeleton of the model: every section id, `section/field`
    /// id and `section#column` id. Two models with equal structure can be
    /// merged without losing or cross-wiring values.
    pub fn structure(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for section in &self.sections {
            ids.insert(section.id.clone());
            for field in section.fields() {
                ids.insert(format!("{}/{}", section.id, field.id));
            }
            if let Some(table) = &section.table {
                ids.insert(format!("{}[{}]", section.id, table.id));
                for column in &table.columns {
                    ids.insert(format!("{}#{}", section.id, column.id));
                }
            }
        }
        ids
    }

    /// Required fields that are still empty, as `(section id, field label)`
    pub fn missing_required_fields(&self) -> Vec<(String, String)> {
        self.sections
            .iter()
            .flat_map(|s| {
                s.fields()
                    .iter()
                    .filter(|f| f.required && f.value.is_empty())
                    .map(move |f| (s.id.clone(), f.label.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_emptiness() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::from("   ").is_empty());
        assert!(!FieldValue::from("7.5 hours").is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_field_value_untagged_serde() {
        let values: Vec<FieldValue> = serde_json::from_str(r#"[null, 12.5, "text"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Null,
                FieldValue::Number(12.5),
                FieldValue::Text("text".to_string())
            ]
        );
        assert_eq!(serde_json::to_string(&FieldValue::Null).unwrap(), "null");
    }

    #[test]
    fn test_field_value_as_number_strips_currency() {
        assert_eq!(FieldValue::from("$1,250.50").as_number(), Some(1250.5));
        assert_eq!(FieldValue::from("15%").as_number(), Some(15.0));
        assert_eq!(FieldValue::from("n/a").as_number(), None);
        assert_eq!(FieldValue::Null.as_number(), None);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Number(8.0).to_string(), "8");
        assert_eq!(FieldValue::Number(8.126).to_string(), "8.13");
        assert_eq!(FieldValue::Null.to_string(), "");
    }
}
