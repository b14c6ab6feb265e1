//! Export view of a draft
//!
//! Flattens a render model into display strings for one audience. All
//! output formats (PDF, Word, text) render from an [`ExportDocument`].

use chrono::{DateTime, Utc};
use jobpack_types::{
    DocType, DocumentDraft, DraftStatus, FieldType, FieldValue, IssuerProfile, RenderModel, Section,
};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Who the export is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Audience {
    #[default]
    Internal,
    /// Requires an issued document
    Client,
}

impl Audience {
    pub fn code(&self) -> &'static str {
        match self {
            Audience::Internal => "INTERNAL",
            Audience::Client => "CLIENT",
        }
    }

    pub fn parse_code(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INTERNAL" => Some(Audience::Internal),
            "CLIENT" => Some(Audience::Client),
            _ => None,
        }
    }
}

/// A table flattened to strings; fully blank rows are dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSection {
    pub title: String,
    pub fields: Vec<ExportField>,
    pub table: Option<ExportTable>,
}

impl ExportSection {
    fn from_section(section: &Section) -> Self {
        let fields = section
            .fields()
            .iter()
            .map(|f| ExportField {
                label: f.label.clone(),
                value: display(&f.value, f.field_type),
            })
            .collect();

        let table = section.table.as_ref().map(|t| ExportTable {
            columns: t.columns.iter().map(|c| c.label.clone()).collect(),
            rows: t
                .rows
                .iter()
                .filter(|row| row.values().any(|v| !v.is_empty()))
                .map(|row| {
                    t.columns
                        .iter()
                        .map(|c| {
                            row.get(&c.id)
                                .map(|v| display(v, c.column_type))
                                .unwrap_or_default()
                        })
                        .collect()
                })
                .collect(),
        });

        Self {
            title: section.title.clone(),
            fields,
            table,
        }
    }
}

/// Currency amounts get a dollar sign and cents
fn display(value: &FieldValue, field_type: FieldType) -> String {
    match (field_type, value.as_number()) {
        (FieldType::Currency, Some(n)) if !value.is_empty() => format!("${:.2}", n),
        _ => value.to_string(),
    }
}

/// A draft prepared for export
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub title: String,
    pub doc_type: DocType,
    /// Issued record id once issued, otherwise the model's record id
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: DraftStatus,
    pub audience: Audience,
    /// Present until the draft is approved or issued
    pub disclaimer: Option<String>,
    /// OVIS messages, dropped with the disclaimer
    pub warnings: Vec<String>,
    pub issuer: Option<IssuerProfile>,
    pub sections: Vec<ExportSection>,
}

impl ExportDocument {
    /// Prepare `draft` for `audience`. `model` overrides the stored model
    /// (for exporting unsaved edits); lifecycle flags always come from the
    /// stored draft.
    pub fn prepare(
        draft: &DocumentDraft,
        model: Option<&RenderModel>,
        audience: Audience,
    ) -> Result<Self, RenderError> {
        if audience == Audience::Client && !draft.is_issued() {
            return Err(RenderError::NotIssued);
        }

        let model = model.unwrap_or(&draft.data);
        let suppress = draft.suppresses_warnings();

        Ok(Self {
            title: model.title.clone(),
            doc_type: model.doc_type,
            record_id: draft
                .issued_record_id
                .clone()
                .unwrap_or_else(|| model.record_id.clone()),
            timestamp: draft.issued_at.unwrap_or(model.timestamp),
            status: draft.status,
            audience,
            disclaimer: (!suppress).then(|| model.disclaimer.clone()),
            warnings: if suppress {
                Vec::new()
            } else {
                model.ovis_warnings.iter().map(|w| w.message.clone()).collect()
            },
            issuer: draft.issuer.clone(),
            sections: model.sections.iter().map(ExportSection::from_section).collect(),
        })
    }

    /// Issuer identity lines for letterheads
    pub fn issuer_lines(&self) -> Vec<String> {
        let Some(issuer) = &self.issuer else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        if let Some(name) = &issuer.business_name {
            lines.push(name.clone());
        }
        if let Some(abn) = &issuer.abn {
            lines.push(format!("ABN {}", abn));
        }
        if let Some(licence) = &issuer.licence_number {
            lines.push(format!("Licence {}", licence));
        }
        let contact: Vec<&str> = [&issuer.contact_name, &issuer.phone, &issuer.email]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        if !contact.is_empty() {
            lines.push(contact.join(" | "));
        }
        if let Some(address) = &issuer.address {
            lines.push(address.clone());
        }
        lines
    }

    /// Footer line: record id and lifecycle state
    pub fn footer(&self) -> String {
        match self.status {
            DraftStatus::Issued => format!("{} | Issued record {}", self.title, self.record_id),
            DraftStatus::Draft => format!("{} | Draft {}", self.title, self.record_id),
        }
    }

    /// Suggested download file name without extension
    pub fn file_stem(&self) -> String {
        let short: String = self.record_id.chars().take(8).collect();
        format!("{}-{}", self.doc_type.code().to_lowercase().replace('_', "-"), short)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jobpack_types::{Column, Field, OvisSeverity, OvisWarning, Table, TableRow};
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_draft() -> DocumentDraft {
        let columns = vec![
            Column {
                id: "description".to_string(),
                label: "Description".to_string(),
                column_type: FieldType::Text,
                width: None,
            },
            Column {
                id: "amount".to_string(),
                label: "Amount".to_string(),
                column_type: FieldType::Currency,
                width: None,
            },
        ];
        let filled: TableRow = [
            ("description".to_string(), FieldValue::from("Extra coat to hallway")),
            ("amount".to_string(), FieldValue::Number(350.0)),
        ]
        .into_iter()
        .collect();
        let blank: TableRow = columns
            .iter()
            .map(|c| (c.id.clone(), FieldValue::Null))
            .collect();

        let model = RenderModel {
            title: "Variation".to_string(),
            record_id: "3f2a9c1e-0000-4000-8000-000000000001".to_string(),
            timestamp: Utc::now(),
            doc_type: DocType::Variation,
            disclaimer: "DRAFT - review required before sending.".to_string(),
            sections: vec![
                Section {
                    id: "variation".to_string(),
                    title: "Variation".to_string(),
                    fields: Some(vec![Field {
                        id: "variation_description".to_string(),
                        label: "Description of variation".to_string(),
                        field_type: FieldType::Textarea,
                        options: None,
                        required: true,
                        placeholder: None,
                        value: "Client asked for hallway & stairwell <feature wall>".into(),
                    }]),
                    table: None,
                },
                Section {
                    id: "cost".to_string(),
                    title: "Cost".to_string(),
                    fields: None,
                    table: Some(Table {
                        id: "variation_items".to_string(),
                        columns,
                        rows_key: "variation_items".to_string(),
                        min_rows: 1,
                        rows: vec![filled, blank],
                    }),
                },
            ],
            ovis_warnings: vec![OvisWarning {
                id: "variation_unpriced".to_string(),
                severity: OvisSeverity::Medium,
                message: "The variation has no priced items".to_string(),
            }],
        };
        DocumentDraft::new("job-1", "user-1", model)
    }

    pub(crate) fn issued_draft() -> DocumentDraft {
        let mut draft = sample_draft();
        draft.status = DraftStatus::Issued;
        draft.approved = true;
        draft.issued_record_id = Some("9b7e0d52-1111-4000-8000-000000000002".to_string());
        draft.issued_at = Some(Utc::now());
        draft.issuer = Some(IssuerProfile {
            business_name: Some("Brush & Roll Pty Ltd".to_string()),
            abn: Some("51 824 753 556".to_string()),
            contact_name: Some("Sam".to_string()),
            phone: Some("0400 000 000".to_string()),
            email: None,
            address: None,
            licence_number: None,
            insurance_policy: None,
            logo_url: None,
            captured_at: Utc::now(),
        });
        draft
    }

    #[test]
    fn test_client_export_requires_issue() {
        let err = ExportDocument::prepare(&sample_draft(), None, Audience::Client).unwrap_err();
        assert!(matches!(err, RenderError::NotIssued));
        assert!(ExportDocument::prepare(&issued_draft(), None, Audience::Client).is_ok());
    }

    #[test]
    fn test_draft_keeps_disclaimer_and_warnings() {
        let doc = ExportDocument::prepare(&sample_draft(), None, Audience::Internal).unwrap();
        assert!(doc.disclaimer.is_some());
        assert_eq!(doc.warnings, vec!["The variation has no priced items".to_string()]);
        assert_eq!(doc.record_id, "3f2a9c1e-0000-4000-8000-000000000001");
    }

    #[test]
    fn test_approved_draft_suppresses_footers() {
        let mut draft = sample_draft();
        draft.approved = true;
        let doc = ExportDocument::prepare(&draft, None, Audience::Internal).unwrap();
        assert!(doc.disclaimer.is_none());
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn test_issued_uses_issued_record_id() {
        let doc = ExportDocument::prepare(&issued_draft(), None, Audience::Client).unwrap();
        assert_eq!(doc.record_id, "9b7e0d52-1111-4000-8000-000000000002");
        assert_eq!(doc.file_stem(), "variation-9b7e0d52");
        assert_eq!(
            doc.issuer_lines(),
            vec![
                "Brush & Roll Pty Ltd".to_string(),
                "ABN 51 824 753 556".to_string(),
                "Sam | 0400 000 000".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_rows_dropped() {
        let doc = ExportDocument::prepare(&sample_draft(), None, Audience::Internal).unwrap();
        let table = doc.sections[1].table.as_ref().unwrap();
        assert_eq!(table.columns, vec!["Description".to_string(), "Amount".to_string()]);
        assert_eq!(
            table.rows,
            vec![vec!["Extra coat to hallway".to_string(), "$350.00".to_string()]]
        );
    }

    #[test]
    fn test_audience_codes() {
        assert_eq!(Audience::parse_code("client"), Some(Audience::Client));
        assert_eq!(Audience::Internal.code(), "INTERNAL");
        assert_eq!(Audience::parse_code("public"), None);
    }
}
