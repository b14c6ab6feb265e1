//! Document template schema
//!
//! A template is the immutable definition of one document type: its
//! ordered sections, their fields and tables, and the integrity checks
//! (OVIS) that run against a populated instance. The same `Section` shape
//! is reused by the render model, where fields and table rows carry values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::FieldValue;

/// Document types the engine can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    /// Safe Work Method Statement
    Swms,
    PaymentClaim,
    ToolboxTalk,
    Variation,
    /// Extension of Time notice
    Eot,
    ProgressClaim,
    Handover,
    Maintenance,
}

impl DocType {
    /// All document types, in display order
    pub const ALL: [DocType; 8] = [
        DocType::Swms,
        DocType::PaymentClaim,
        DocType::ToolboxTalk,
        DocType::Variation,
        DocType::Eot,
        DocType::ProgressClaim,
        DocType::Handover,
        DocType::Maintenance,
    ];

    /// Wire code (e.g. "PAYMENT_CLAIM")
    pub fn code(&self) -> &'static str {
        match self {
            DocType::Swms => "SWMS",
            DocType::PaymentClaim => "PAYMENT_CLAIM",
            DocType::ToolboxTalk => "TOOLBOX_TALK",
            DocType::Variation => "VARIATION",
            DocType::Eot => "EOT",
            DocType::ProgressClaim => "PROGRESS_CLAIM",
            DocType::Handover => "HANDOVER",
            DocType::Maintenance => "MAINTENANCE",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            DocType::Swms => "Safe Work Method Statement",
            DocType::PaymentClaim => "Payment Claim",
            DocType::ToolboxTalk => "Toolbox Talk",
            DocType::Variation => "Variation",
            DocType::Eot => "Extension of Time Notice",
            DocType::ProgressClaim => "Progress Claim",
            DocType::Handover => "Handover Certificate",
            DocType::Maintenance => "Maintenance Schedule",
        }
    }

    /// Parse from wire code, case-insensitive, accepting `-` for `_`
    pub fn parse_code(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        DocType::ALL
            .iter()
            .copied()
            .find(|d| d.code() == normalized)
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a string is not a known document type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown document type '{0}'")]
pub struct UnknownDocType(pub String);

impl std::str::FromStr for DocType {
    type Err = UnknownDocType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocType::parse_code(s).ok_or_else(|| UnknownDocType(s.to_string()))
    }
}

/// Immutable template definition, loaded once per deploy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTemplate {
    pub schema_version: String,
    pub jurisdiction: String,
    pub doc_type: DocType,
    pub title: String,
    pub disclaimer: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub ovis_checks: Vec<OvisCheck>,
}

impl DocumentTemplate {
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// An ordered block of a document holding fields, a table, or both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
}

impl Section {
    /// Fields of this section (empty slice when the section is table-only)
    pub fn fields(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or(&[])
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut Field> {
        self.fields
            .as_mut()
            .and_then(|fields| fields.iter_mut().find(|f| f.id == id))
    }
}

/// Input control type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Textarea,
    Date,
    Select,
    MultiSelect,
    Currency,
    Number,
}

impl FieldType {
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::MultiSelect)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Currency | FieldType::Number)
    }
}

/// A single labelled value in a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub value: FieldValue,
}

/// A column definition of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// One table row: column id to cell value
pub type TableRow = std::collections::BTreeMap<String, FieldValue>;

/// A repeating block of rows, populated from a named row collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub columns: Vec<Column>,
    pub rows_key: String,
    #[serde(default)]
    pub min_rows: usize,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// A row with every column present and empty
    pub fn blank_row(&self) -> TableRow {
        self.columns
            .iter()
            .map(|c| (c.id.clone(), FieldValue::Null))
            .collect()
    }

    /// Rows that have at least one non-empty cell
    pub fn filled_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.values().any(|v| !v.is_empty()))
            .count()
    }
}

/// Severity of an integrity signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OvisSeverity {
    Low,
    Medium,
    High,
}

/// Integrity check definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvisCheck {
    pub id: String,
    pub severity: OvisSeverity,
    /// Rule expression, e.g. `empty(client.client_name)`
    pub rule: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_codes_roundtrip_through_serde() {
        for doc_type in DocType::ALL {
            let json = serde_json::to_string(&doc_type).unwrap();
            assert_eq!(json, format!("\"{}\"", doc_type.code()));
        }
    }

    #[test]
    fn test_doc_type_parse_accepts_loose_input() {
        assert_eq!(DocType::parse_code("payment-claim"), Some(DocType::PaymentClaim));
        assert_eq!(DocType::parse_code("swms"), Some(DocType::Swms));
        assert_eq!(DocType::parse_code(" EOT "), Some(DocType::Eot));
        assert_eq!(DocType::parse_code("invoice"), None);
        assert!("LEASE".parse::<DocType>().is_err());
    }

    #[test]
    fn test_field_type_serializes_camel_case() {
        let json = serde_json::to_string(&FieldType::MultiSelect).unwrap();
        assert_eq!(json, "\"multiSelect\"");
    }

    #[test]
    fn test_section_field_lookup() {
        let section: Section = serde_json::from_value(serde_json::json!({
            "id": "client",
            "title": "Client",
            "fields": [
                {"id": "client_name", "label": "Client name", "type": "text", "required": true}
            ]
        }))
        .unwrap();

        assert!(section.field("client_name").is_some());
        assert!(section.field("missing").is_none());
        assert!(section.table.is_none());
        assert_eq!(section.fields()[0].value, FieldValue::Null);
    }

    #[test]
    fn test_table_blank_row_has_every_column() {
        let table: Table = serde_json::from_value(serde_json::json!({
            "id": "materials",
            "columns": [
                {"id": "item", "label": "Item", "type": "text"},
                {"id": "qty", "label": "Qty", "type": "number"}
            ],
            "rowsKey": "materials",
            "minRows": 1
        }))
        .unwrap();

        let row = table.blank_row();
        assert_eq!(row.len(), 2);
        assert!(row.values().all(|v| v.is_empty()));
        assert_eq!(table.filled_rows(), 0);
    }
}
