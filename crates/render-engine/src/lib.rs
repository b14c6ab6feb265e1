//! Export adapters for job pack documents
//!
//! A stored draft is first prepared for an audience ([`ExportDocument`]),
//! which enforces that client exports are issued and drops the disclaimer
//! and warnings once approved or issued. The prepared document renders to
//! PDF (Typst), DOCX, plain text or an email body.

pub mod docx;
pub mod document;
pub mod error;
pub mod pdf;
pub mod text;
pub mod world;

pub use docx::{render_docx, DOCX_MIME};
pub use document::{Audience, ExportDocument, ExportField, ExportSection, ExportTable};
pub use error::RenderError;
pub use pdf::{render_pdf, PdfOutput};
pub use text::{render_email, render_text, EmailBody};

/// Default upper bound on one PDF compile
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 10_000;

/// Export tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub timeout_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
        }
    }
}
