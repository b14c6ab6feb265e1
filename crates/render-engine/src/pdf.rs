//! PDF export through Typst
//!
//! Compilation runs on the blocking pool under a timeout; a slow or
//! failing compile never holds an async worker.

use std::time::Duration;

use serde_json::json;
use typst::diag::{Severity, SourceDiagnostic};
use typst::model::Document;
use tracing::{debug, warn};

use crate::document::ExportDocument;
use crate::error::RenderError;
use crate::world::ExportWorld;

/// Typst layout shared by every document type
pub const DOCUMENT_TEMPLATE: &str = include_str!("../templates/document.typ");

/// Compiled PDF
#[derive(Debug, Clone)]
pub struct PdfOutput {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl ExportDocument {
    /// `sys.inputs` for the Typst layout
    pub fn typst_inputs(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut inputs = serde_json::Map::new();
        inputs.insert(
            "doc".to_string(),
            json!({
                "title": self.title,
                "recordId": self.record_id,
                "date": self.timestamp.format("%d/%m/%Y").to_string(),
                "footer": self.footer(),
                "issuerLines": self.issuer_lines(),
                "disclaimer": self.disclaimer,
                "warnings": self.warnings,
                "sections": self.sections,
            }),
        );
        inputs
    }
}

/// Render `doc` to PDF within `timeout_ms`
pub async fn render_pdf(doc: &ExportDocument, timeout_ms: u64) -> Result<PdfOutput, RenderError> {
    let world = ExportWorld::new(DOCUMENT_TEMPLATE, &doc.typst_inputs());

    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(move || compile_pdf(&world)),
    )
    .await;

    match result {
        Ok(Ok(output)) => {
            let output = output?;
            debug!(
                record_id = %doc.record_id,
                pages = output.page_count,
                bytes = output.bytes.len(),
                "PDF rendered"
            );
            Ok(output)
        }
        Ok(Err(join_error)) => Err(RenderError::Task(join_error.to_string())),
        Err(_timeout) => Err(RenderError::Timeout(timeout_ms)),
    }
}

fn compile_pdf(world: &ExportWorld) -> Result<PdfOutput, RenderError> {
    let warned = typst::compile(world);
    for warning in &warned.warnings {
        warn!("Typst warning: {}", warning.message);
    }

    let document: Document = warned.output.map_err(|diags| RenderError::Compile(messages(&diags)))?;
    let bytes = typst_pdf::pdf(&document, &typst_pdf::PdfOptions::default())
        .map_err(|diags| RenderError::Compile(messages(&diags)))?;

    Ok(PdfOutput {
        bytes,
        page_count: document.pages.len(),
    })
}

fn messages(diagnostics: &[SourceDiagnostic]) -> Vec<String> {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::{issued_draft, sample_draft};
    use crate::document::Audience;

    #[test]
    fn test_layout_parses() {
        let parsed = typst::syntax::parse(DOCUMENT_TEMPLATE);
        assert!(parsed.errors().is_empty());
    }

    #[test]
    fn test_inputs_follow_suppression() {
        let mut draft = sample_draft();
        let doc = ExportDocument::prepare(&draft, None, Audience::Internal).unwrap();
        let inputs = doc.typst_inputs();
        assert!(inputs["doc"]["disclaimer"].is_string());

        draft.approved = true;
        let doc = ExportDocument::prepare(&draft, None, Audience::Internal).unwrap();
        let inputs = doc.typst_inputs();
        assert!(inputs["doc"]["disclaimer"].is_null());
        assert_eq!(inputs["doc"]["warnings"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_render_pdf() {
        let doc = ExportDocument::prepare(&issued_draft(), None, Audience::Client).unwrap();
        let output = render_pdf(&doc, 10_000).await.unwrap();

        assert!(output.bytes.starts_with(b"%PDF"));
        assert!(output.page_count >= 1);
    }
}
