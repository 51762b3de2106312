use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus which optional backends are active.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "studio-api",
        "storage": if state.config.database_url.is_some() { "postgres" } else { "memory" },
        "enhancement": state.config.gemini_api_key.is_some(),
    }))
}
