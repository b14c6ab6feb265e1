//! API handlers for the job pack service
//!
//! Every document route lives under `/api/jobs/:job_id/documents/:doc_type`.
//! Callers identify with `x-user-id`, `x-plan` and `x-verified` headers.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use document_engine::{EngineError, IssueOutcome};
use issuance_policy::IssuerCheck;
use jobpack_types::{Caller, DocType, DocumentDraft, PlanTier, RenderModel};
use render_engine::{
    render_docx, render_email, render_pdf, render_text, Audience, EmailBody, ExportDocument,
    DOCX_MIME,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use template_engine::TemplateInfo;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Routes without middleware
pub fn routes() -> Router<AppState> {
    let doc = "/api/jobs/:job_id/documents/:doc_type";
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/templates", get(handle_list_templates))
        .route(&format!("{doc}/draft"), get(handle_get_draft).post(handle_save_draft))
        .route(&format!("{doc}/prefill"), post(handle_prefill))
        .route(&format!("{doc}/load"), post(handle_load))
        .route(&format!("{doc}/regenerate"), post(handle_regenerate))
        .route(&format!("{doc}/approve"), post(handle_approve))
        .route(&format!("{doc}/issuer-check"), get(handle_issuer_check))
        .route(&format!("{doc}/issue"), post(handle_issue))
        .route(&format!("{doc}/render"), post(handle_render_pdf))
        .route(&format!("{doc}/render-word"), post(handle_render_word))
        .route(&format!("{doc}/render-text"), post(handle_render_text))
}

// ============================================================
// Extractors
// ============================================================

/// Caller identity from request headers
pub struct RequestCaller(pub Caller);

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, "x-user-id")
            .ok_or_else(|| ApiError::Unauthenticated("x-user-id header is required".to_string()))?;

        let plan = match header_value(parts, "x-plan") {
            None => PlanTier::Free,
            Some(code) => PlanTier::parse_code(code)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown plan '{}'", code)))?,
        };

        let verified = header_value(parts, "x-verified")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self(Caller::new(user_id, plan, verified)))
    }
}

/// `:job_id` and `:doc_type` path segments
#[derive(Deserialize)]
pub struct DocPath {
    job_id: String,
    doc_type: String,
}

impl DocPath {
    fn doc_type(&self) -> Result<DocType, ApiError> {
        self.doc_type
            .parse()
            .map_err(|e: jobpack_types::UnknownDocType| ApiError::InvalidRequest(e.to_string()))
    }
}

fn parse_audience(audience: Option<&str>) -> Result<Audience, ApiError> {
    match audience {
        None => Ok(Audience::Internal),
        Some(code) => Audience::parse_code(code)
            .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown audience '{}'", code))),
    }
}

// ============================================================
// Health and templates
// ============================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "jobpack-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Template list response
#[derive(Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<TemplateInfo>,
    pub count: usize,
}

/// Handler: GET /api/templates
pub async fn handle_list_templates(State(state): State<AppState>) -> Json<TemplateListResponse> {
    let templates = state.service.templates().list();
    let count = templates.len();
    Json(TemplateListResponse {
        success: true,
        templates,
        count,
    })
}

// ============================================================
// Drafts
// ============================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub success: bool,
    pub draft: DocumentDraft,
}

/// Model plus the lifecycle state an editor needs to resume
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub success: bool,
    pub model: RenderModel,
    pub version: u64,
    pub approved: bool,
    pub status: jobpack_types::DraftStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

impl ModelResponse {
    fn from_draft(draft: DocumentDraft, created: Option<bool>) -> Self {
        Self {
            success: true,
            version: draft.version,
            approved: draft.approved,
            status: draft.status,
            model: draft.data,
            created,
        }
    }
}

/// Handler: GET .../draft
pub async fn handle_get_draft(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
) -> Result<Json<DraftResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let draft = state
        .service
        .get_draft(&caller, &path.job_id, doc_type)
        .await?
        .ok_or_else(|| {
            EngineError::not_found(format!("{} draft for job {}", doc_type, path.job_id))
        })?;

    Ok(Json(DraftResponse {
        success: true,
        draft,
    }))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrefillRequest {
    #[serde(default)]
    pub include_materials_markup: bool,
}

/// Handler: POST .../prefill
pub async fn handle_prefill(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<PrefillRequest>>,
) -> Result<Json<ModelResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let draft = state
        .service
        .prefill(&caller, &path.job_id, doc_type, req.include_materials_markup)
        .await?;
    Ok(Json(ModelResponse::from_draft(draft, None)))
}

/// Handler: POST .../load
pub async fn handle_load(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<PrefillRequest>>,
) -> Result<Json<ModelResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let (draft, created) = state
        .service
        .load_or_create(&caller, &path.job_id, doc_type, req.include_materials_markup)
        .await?;
    Ok(Json(ModelResponse::from_draft(draft, Some(created))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub data: RenderModel,
    #[serde(default)]
    pub approved: Option<bool>,
    /// Omit for last-write-wins
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub ok: bool,
    pub version: u64,
}

/// Handler: POST .../draft
pub async fn handle_save_draft(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let draft = state
        .service
        .save_draft(
            &caller,
            &path.job_id,
            doc_type,
            req.data,
            req.approved,
            req.expected_version,
        )
        .await?;

    Ok(Json(SaveResponse {
        ok: true,
        version: draft.version,
    }))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    #[serde(default)]
    pub include_materials_markup: bool,
    /// Unsaved model to merge into; the stored draft otherwise
    #[serde(default)]
    pub current: Option<RenderModel>,
    /// Stored version `current` was based on; omit for last-write-wins
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Handler: POST .../regenerate
pub async fn handle_regenerate(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<RegenerateRequest>>,
) -> Result<Json<ModelResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let draft = state
        .service
        .regenerate(
            &caller,
            &path.job_id,
            doc_type,
            req.current,
            req.include_materials_markup,
            req.expected_version,
        )
        .await?;
    Ok(Json(ModelResponse::from_draft(draft, None)))
}

/// Handler: POST .../approve
pub async fn handle_approve(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
) -> Result<Json<DraftResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let draft = state
        .service
        .approve(&caller, &path.job_id, doc_type)
        .await?;
    Ok(Json(DraftResponse {
        success: true,
        draft,
    }))
}

// ============================================================
// Issuance
// ============================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerCheckResponse {
    pub success: bool,
    pub passes: bool,
    #[serde(flatten)]
    pub check: IssuerCheck,
}

/// Handler: GET .../issuer-check
pub async fn handle_issuer_check(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
) -> Result<Json<IssuerCheckResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let check = state
        .service
        .check_issuer(&caller, &path.job_id, doc_type)
        .await?;
    Ok(Json(IssuerCheckResponse {
        success: true,
        passes: check.passes(),
        check,
    }))
}

#[derive(Deserialize, Default)]
pub struct IssueRequest {
    #[serde(default)]
    pub strict: bool,
}

#[derive(Serialize)]
pub struct IssueResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: IssueOutcome,
}

/// Handler: POST .../issue
pub async fn handle_issue(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<IssueRequest>>,
) -> Result<Json<IssueResponse>, ApiError> {
    let doc_type = path.doc_type()?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let outcome = state
        .service
        .issue(&caller, &path.job_id, doc_type, req.strict)
        .await?;
    Ok(Json(IssueResponse {
        success: true,
        outcome,
    }))
}

// ============================================================
// Exports
// ============================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    /// Must name the draft's record id or its issued record id
    #[serde(default)]
    pub record_id: Option<String>,
    /// Unsaved model to export instead of the stored one
    #[serde(default)]
    pub render_model: Option<RenderModel>,
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderTextRequest {
    #[serde(default)]
    pub audience: Option<String>,
    /// Return `{subject, body}` instead of plain text
    #[serde(default)]
    pub email: bool,
}

/// Load the draft and prepare it for export. Client exports always use the
/// stored model.
async fn prepare_export(
    state: &AppState,
    caller: &Caller,
    path: &DocPath,
    req: RenderRequest,
) -> Result<(DocType, ExportDocument), ApiError> {
    let doc_type = path.doc_type()?;
    let audience = parse_audience(req.audience.as_deref())?;

    let draft = state
        .service
        .get_draft(caller, &path.job_id, doc_type)
        .await?
        .ok_or_else(|| {
            EngineError::not_found(format!("{} draft for job {}", doc_type, path.job_id))
        })?;

    if let Some(record_id) = &req.record_id {
        let known = *record_id == draft.data.record_id
            || draft.issued_record_id.as_deref() == Some(record_id.as_str());
        if !known {
            return Err(ApiError::InvalidRequest(format!(
                "Record {} does not belong to this draft",
                record_id
            )));
        }
    }

    let model = match req.render_model {
        Some(model) if model.doc_type != doc_type => {
            return Err(ApiError::InvalidRequest(format!(
                "Render model is a {}, not a {}",
                model.doc_type, doc_type
            )))
        }
        Some(_) if audience == Audience::Client => {
            debug!("Ignoring render model override for client export");
            None
        }
        other => other,
    };

    let doc = ExportDocument::prepare(&draft, model.as_ref(), audience)?;
    Ok((doc_type, doc))
}

async fn record_export(
    state: &AppState,
    caller: &Caller,
    path: &DocPath,
    doc_type: DocType,
    format: &str,
    audience: Audience,
) -> Result<(), ApiError> {
    state
        .service
        .record_export(caller, &path.job_id, doc_type, format, audience.code())
        .await?;
    info!(
        job_id = %path.job_id,
        doc_type = %doc_type,
        format,
        audience = audience.code(),
        "Document exported"
    );
    Ok(())
}

/// Handler: POST .../render
pub async fn handle_render_pdf(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<RenderRequest>>,
) -> Result<Response, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let (doc_type, doc) = prepare_export(&state, &caller, &path, req).await?;

    let output = render_pdf(&doc, state.render.timeout_ms).await?;
    record_export(&state, &caller, &path, doc_type, "pdf", doc.audience).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.pdf\"", doc.file_stem()),
            ),
        ],
        output.bytes,
    )
        .into_response())
}

/// Handler: POST .../render-word
pub async fn handle_render_word(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<RenderRequest>>,
) -> Result<Response, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let (doc_type, doc) = prepare_export(&state, &caller, &path, req).await?;

    let bytes = render_docx(&doc)?;
    record_export(&state, &caller, &path, doc_type, "docx", doc.audience).await?;

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.docx\"", doc.file_stem()),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Handler: POST .../render-text
pub async fn handle_render_text(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(path): Path<DocPath>,
    body: Option<Json<RenderTextRequest>>,
) -> Result<Response, ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let render_req = RenderRequest {
        audience: req.audience,
        ..Default::default()
    };
    let (doc_type, doc) = prepare_export(&state, &caller, &path, render_req).await?;

    if req.email {
        let email: EmailBody = render_email(&doc);
        record_export(&state, &caller, &path, doc_type, "email", doc.audience).await?;
        let body: Value = json!({ "success": true, "subject": email.subject, "body": email.body });
        return Ok(Json(body).into_response());
    }

    let text = render_text(&doc);
    record_export(&state, &caller, &path, doc_type, "text", doc.audience).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
        text,
    )
        .into_response())
}
