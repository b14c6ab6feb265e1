//! Plain-text and email body rendering

use serde::Serialize;

use crate::document::ExportDocument;

/// Plain-text rendering: sections in order, label/value pairs, then
/// table rows
pub fn render_text(doc: &ExportDocument) -> String {
    let mut out = String::new();

    for line in doc.issuer_lines() {
        out.push_str(&line);
        out.push('\n');
    }
    if !doc.issuer_lines().is_empty() {
        out.push('\n');
    }

    out.push_str(&doc.title.to_uppercase());
    out.push('\n');
    out.push_str(&format!(
        "Record {} ({})\n",
        doc.record_id,
        doc.timestamp.format("%d/%m/%Y")
    ));

    if let Some(disclaimer) = &doc.disclaimer {
        out.push('\n');
        out.push_str(disclaimer);
        out.push('\n');
    }
    if !doc.warnings.is_empty() {
        out.push_str("\nCheck before sending:\n");
        for warning in &doc.warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
    }

    for section in &doc.sections {
        out.push('\n');
        out.push_str(&section.title);
        out.push('\n');
        out.push_str(&"-".repeat(section.title.chars().count()));
        out.push('\n');

        for field in section.fields.iter().filter(|f| !f.value.trim().is_empty()) {
            out.push_str(&format!("{}: {}\n", field.label, field.value));
        }

        if let Some(table) = &section.table {
            for (i, row) in table.rows.iter().enumerate() {
                let cells: Vec<String> = table
                    .columns
                    .iter()
                    .zip(row)
                    .filter(|(_, value)| !value.trim().is_empty())
                    .map(|(column, value)| format!("{}: {}", column, value))
                    .collect();
                out.push_str(&format!("{}. {}\n", i + 1, cells.join(", ")));
            }
        }
    }

    out.push('\n');
    out.push_str(&doc.footer());
    out.push('\n');
    out
}

/// Email subject and body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailBody {
    pub subject: String,
    pub body: String,
}

/// Email rendering: subject from the title and issuer, body is the text
/// rendering
pub fn render_email(doc: &ExportDocument) -> EmailBody {
    let from = doc
        .issuer
        .as_ref()
        .and_then(|i| i.business_name.as_deref())
        .map(|name| format!(" from {}", name))
        .unwrap_or_default();

    EmailBody {
        subject: format!("{}{}", doc.title, from),
        body: render_text(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::{issued_draft, sample_draft};
    use crate::document::Audience;

    #[test]
    fn test_text_walks_sections_in_order() {
        let doc = ExportDocument::prepare(&sample_draft(), None, Audience::Internal).unwrap();
        let text = render_text(&doc);

        let variation = text.find("Description of variation:").unwrap();
        let cost = text.find("1. Description: Extra coat to hallway, Amount: $350.00").unwrap();
        assert!(variation < cost);
        assert!(text.contains("DRAFT - review required"));
        assert!(text.contains("  - The variation has no priced items"));
    }

    #[test]
    fn test_issued_text_omits_disclaimer() {
        let doc = ExportDocument::prepare(&issued_draft(), None, Audience::Client).unwrap();
        let text = render_text(&doc);
        assert!(!text.contains("DRAFT - review required"));
        assert!(!text.contains("Check before sending"));
        assert!(text.starts_with("Brush & Roll Pty Ltd\n"));
    }

    #[test]
    fn test_email_subject() {
        let doc = ExportDocument::prepare(&issued_draft(), None, Audience::Client).unwrap();
        let email = render_email(&doc);
        assert_eq!(email.subject, "Variation from Brush & Roll Pty Ltd");
        assert_eq!(email.body, render_text(&doc));
    }
}
