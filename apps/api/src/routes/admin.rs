//! Admin handlers: PIN login, settings, lockout stages and the record dashboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::lockout::AttemptResult;
use crate::models::record::{RecordFilter, RecordStats, ResumeRecord};
use crate::session::controller::{AdminSettings, LockoutStatus, SessionSnapshot};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub pin: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub result: AttemptResult,
    pub is_admin: bool,
}

#[derive(Deserialize)]
pub struct StageRequest {
    pub max_attempts: u32,
    pub lockout_minutes: u32,
}

#[derive(Deserialize, Default)]
pub struct RecordQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: RecordFilter,
}

/// GET /api/v1/admin/lockout
pub async fn handle_lockout_status(State(state): State<AppState>) -> Json<LockoutStatus> {
    let guard = state.session.lock().await;
    let now = guard.now();
    Json(guard.lockout_status(now))
}

/// POST /api/v1/admin/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut guard = state.session.lock().await;
    let now = guard.now();
    let result = guard.submit_pin(&req.pin, now).await?;
    Ok(Json(LoginResponse {
        result,
        is_admin: guard.is_admin(),
    }))
}

/// POST /api/v1/admin/logout
pub async fn handle_logout(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let mut guard = state.session.lock().await;
    let now = guard.now();
    guard.logout();
    Json(guard.snapshot(now))
}

/// GET /api/v1/admin/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<AdminSettings>, AppError> {
    let guard = state.session.lock().await;
    if !guard.is_admin() {
        return Err(AppError::Unauthorized);
    }
    Ok(Json(guard.settings()))
}

/// PUT /api/v1/admin/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    Json(req): Json<AdminSettings>,
) -> Result<Json<AdminSettings>, AppError> {
    let settings = state
        .session
        .lock()
        .await
        .set_auto_cleanup(req.auto_cleanup_enabled, req.retention_limit)?;
    Ok(Json(settings))
}

/// PUT /api/v1/admin/lockout/stages/:index
pub async fn handle_update_stage(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(req): Json<StageRequest>,
) -> Result<Json<LockoutStatus>, AppError> {
    let mut guard = state.session.lock().await;
    let now = guard.now();
    guard.update_lockout_stage(index, req.max_attempts, req.lockout_minutes)?;
    Ok(Json(guard.lockout_status(now)))
}

/// GET /api/v1/admin/records?q=&status=
pub async fn handle_list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    let guard = state.session.lock().await;
    let records = guard
        .filtered_records(&query.q, query.status)?
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(records))
}

/// GET /api/v1/admin/records/stats
pub async fn handle_record_stats(State(state): State<AppState>) -> Result<Json<RecordStats>, AppError> {
    Ok(Json(state.session.lock().await.record_stats()?))
}

/// POST /api/v1/admin/records/refresh
pub async fn handle_refresh_records(
    State(state): State<AppState>,
) -> Result<Json<RecordStats>, AppError> {
    let mut guard = state.session.lock().await;
    guard.reload_records().await?;
    Ok(Json(guard.record_stats()?))
}

/// POST /api/v1/admin/records/:id/edit
pub async fn handle_edit_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    let now = guard.now();
    guard.edit_record(id)?;
    Ok(Json(guard.snapshot(now)))
}

/// POST /api/v1/admin/records/:id/download
pub async fn handle_download_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let mut guard = state.session.lock().await;
    let now = guard.now();
    guard.download_record(id)?;
    Ok(Json(guard.snapshot(now)))
}

/// DELETE /api/v1/admin/records/:id
pub async fn handle_delete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.session.lock().await.delete_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/admin/records
pub async fn handle_delete_all_records(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.session.lock().await.clear_all_records().await?;
    Ok(StatusCode::NO_CONTENT)
}
