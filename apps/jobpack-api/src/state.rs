//! Application state for the job pack API

use document_engine::DocumentService;
use render_engine::RenderOptions;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: DocumentService,
    pub render: RenderOptions,
}

impl AppState {
    pub fn new(service: DocumentService, render: RenderOptions) -> Self {
        Self { service, render }
    }
}
