//! Editor-side handlers: document edits, preview and pagination, export, enhancement.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::enhance::{ContentKind, EnhancementOption};
use crate::errors::AppError;
use crate::models::document::{Document, EducationPatch, ExperiencePatch, TemplateKind};
use crate::render::{build_view, export_file_name, render_markdown, DocumentView};
use crate::session::controller::{EnhanceTarget, SessionSnapshot};
use crate::session::SessionGuard;
use crate::state::AppState;
use crate::visibility::{Field, Section};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_secs(25);

fn snapshot(guard: &SessionGuard<'_>) -> Json<SessionSnapshot> {
    Json(guard.snapshot(guard.now()))
}

#[derive(Deserialize)]
pub struct TemplateRequest {
    pub template: TemplateKind,
}

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct PhotoRequest {
    pub photo: Option<String>,
}

#[derive(Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ZoomRequest {
    In,
    Out,
    Reset,
    Set { value: f64 },
}

#[derive(Deserialize)]
pub struct ScrollRequest {
    pub offset_px: f64,
}

#[derive(Deserialize)]
pub struct MeasureRequest {
    pub height_px: f64,
}

#[derive(Deserialize)]
pub struct EnhanceRequestBody {
    pub target: EnhanceTarget,
    #[serde(default)]
    pub option: EnhancementOption,
}

#[derive(Deserialize)]
pub struct UndoRequest {
    pub target: EnhanceTarget,
}

#[derive(Deserialize)]
pub struct RewriteRequest {
    pub text: String,
    pub kind: ContentKind,
    #[serde(default)]
    pub option: EnhancementOption,
}

#[derive(Serialize)]
pub struct RewriteResponse {
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Session state
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let guard = state.session.lock().await;
    snapshot(&guard)
}

/// GET /api/v1/session/events/next
/// Long-polls for the next session event; 204 when nothing happened in time.
pub async fn handle_next_event(State(state): State<AppState>) -> Result<Response, AppError> {
    let mut events = state.session.lock().await.subscribe();
    match tokio::time::timeout(EVENT_POLL_TIMEOUT, events.recv()).await {
        Ok(Ok(event)) => Ok(Json(event).into_response()),
        Ok(Err(RecvError::Lagged(_))) | Err(_) => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(Err(RecvError::Closed)) => Err(AppError::Internal(anyhow::anyhow!(
            "session event channel closed"
        ))),
    }
}

/// DELETE /api/v1/session/notice
pub async fn handle_dismiss_notice(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.dismiss_notice();
    snapshot(&guard)
}

// ────────────────────────────────────────────────────────────────────────────
// Document editing
// ────────────────────────────────────────────────────────────────────────────

/// PUT /api/v1/session/document
pub async fn handle_replace_document(
    State(state): State<AppState>,
    Json(document): Json<Document>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.replace_document(document);
    snapshot(&guard)
}

/// PUT /api/v1/session/template
pub async fn handle_set_template(
    State(state): State<AppState>,
    Json(req): Json<TemplateRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.set_template(req.template);
    snapshot(&guard)
}

/// PUT /api/v1/session/summary
pub async fn handle_set_summary(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.set_summary(req.text);
    snapshot(&guard)
}

/// PUT /api/v1/session/skills
/// Body text is comma-separated.
pub async fn handle_set_skills(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.set_skills_text(&req.text);
    snapshot(&guard)
}

/// PUT /api/v1/session/photo
pub async fn handle_set_photo(
    State(state): State<AppState>,
    Json(req): Json<PhotoRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.set_photo(req.photo);
    snapshot(&guard)
}

/// PUT /api/v1/session/visibility/sections/:section
pub async fn handle_section_visibility(
    State(state): State<AppState>,
    Path(section): Path<Section>,
    Json(req): Json<VisibilityRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    if section == Section::Contact {
        return Err(AppError::Validation(
            "the contact section is always shown".to_string(),
        ));
    }
    let mut guard = state.session.lock().await;
    guard.set_section_visibility(section, req.visible);
    Ok(snapshot(&guard))
}

/// PUT /api/v1/session/visibility/fields/:field
pub async fn handle_field_visibility(
    State(state): State<AppState>,
    Path(field): Path<Field>,
    Json(req): Json<VisibilityRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.set_field_visibility(field, req.visible);
    snapshot(&guard)
}

/// POST /api/v1/session/experience
pub async fn handle_add_experience(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreatedResponse>) {
    let id = state.session.lock().await.add_experience();
    (StatusCode::CREATED, Json(CreatedResponse { id }))
}

/// PATCH /api/v1/session/experience/:id
pub async fn handle_update_experience(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ExperiencePatch>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    guard.update_experience(id, patch)?;
    Ok(snapshot(&guard))
}

/// DELETE /api/v1/session/experience/:id
pub async fn handle_remove_experience(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.session.lock().await.remove_experience(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/session/education
pub async fn handle_add_education(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreatedResponse>) {
    let id = state.session.lock().await.add_education();
    (StatusCode::CREATED, Json(CreatedResponse { id }))
}

/// PATCH /api/v1/session/education/:id
pub async fn handle_update_education(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<EducationPatch>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    guard.update_education(id, patch)?;
    Ok(snapshot(&guard))
}

/// DELETE /api/v1/session/education/:id
pub async fn handle_remove_education(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.session.lock().await.remove_education(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Preview, pagination and export
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/session/preview
pub async fn handle_preview(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    guard.request_preview()?;
    Ok(snapshot(&guard))
}

/// POST /api/v1/session/back
pub async fn handle_back(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.back_from_preview();
    snapshot(&guard)
}

/// POST /api/v1/session/finish
pub async fn handle_finish(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    guard.finish_and_commit().await?;
    Ok(snapshot(&guard))
}

/// POST /api/v1/session/zoom
pub async fn handle_zoom(
    State(state): State<AppState>,
    Json(req): Json<ZoomRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    match req {
        ZoomRequest::In => guard.zoom_in(),
        ZoomRequest::Out => guard.zoom_out(),
        ZoomRequest::Reset => guard.reset_zoom(),
        ZoomRequest::Set { value } => guard.set_zoom(value),
    }
    snapshot(&guard)
}

/// POST /api/v1/session/scroll
pub async fn handle_scroll(
    State(state): State<AppState>,
    Json(req): Json<ScrollRequest>,
) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    guard.on_scroll(req.offset_px);
    snapshot(&guard)
}

/// POST /api/v1/session/measure
/// Applied after the layout settles, so the response only acknowledges it.
pub async fn handle_measure(
    State(state): State<AppState>,
    Json(req): Json<MeasureRequest>,
) -> Result<StatusCode, AppError> {
    if !req.height_px.is_finite() || req.height_px < 0.0 {
        return Err(AppError::Validation(
            "height_px must be a non-negative number".to_string(),
        ));
    }
    state.session.lock().await.report_height(req.height_px);
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/v1/session/view
pub async fn handle_view(State(state): State<AppState>) -> Json<DocumentView> {
    let guard = state.session.lock().await;
    Json(build_view(guard.document(), guard.template()))
}

/// GET /api/v1/session/export
/// Markdown rendering of the current view as a download.
pub async fn handle_export(State(state): State<AppState>) -> Response {
    let guard = state.session.lock().await;
    let markdown = render_markdown(&build_view(guard.document(), guard.template()));
    let file_name = export_file_name(guard.document(), "md");
    (
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        markdown,
    )
        .into_response()
}

// ────────────────────────────────────────────────────────────────────────────
// Enhancement
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/session/enhance
/// Returns once the result is in; the reveal continues in the background.
pub async fn handle_enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequestBody>,
) -> Result<Json<SessionSnapshot>, AppError> {
    state.session.enhance(req.target, req.option).await?;
    let guard = state.session.lock().await;
    Ok(snapshot(&guard))
}

/// POST /api/v1/session/enhance/undo
pub async fn handle_undo_enhancement(
    State(state): State<AppState>,
    Json(req): Json<UndoRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    guard.undo_enhancement(req.target)?;
    Ok(snapshot(&guard))
}

/// POST /api/v1/enhance
/// One-off rewrite that does not touch the session document.
pub async fn handle_rewrite(
    State(state): State<AppState>,
    Json(req): Json<RewriteRequest>,
) -> Result<Json<RewriteResponse>, AppError> {
    let text = state.enhancer.enhance(&req.text, req.kind, req.option).await?;
    Ok(Json(RewriteResponse { text }))
}
