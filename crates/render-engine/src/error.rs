//! Error types for export rendering

use thiserror::Error;

/// Export failures
#[derive(Error, Debug)]
pub enum RenderError {
    /// Client exports are only available once the document is issued
    #[error("Document must be issued before it can be exported for a client")]
    NotIssued,

    #[error("Compilation failed: {}", .0.join("; "))]
    Compile(Vec<String>),

    #[error("Rendering timed out after {0}ms")]
    Timeout(u64),

    #[error("Render task failed: {0}")]
    Task(String),

    #[error("Word export failed: {0}")]
    Docx(String),
}

impl From<zip::result::ZipError> for RenderError {
    fn from(e: zip::result::ZipError) -> Self {
        RenderError::Docx(e.to_string())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Docx(e.to_string())
    }
}
