pub mod admin;
pub mod health;
pub mod session;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Editor session
        .route("/api/v1/session", get(session::handle_get_session))
        .route("/api/v1/session/events/next", get(session::handle_next_event))
        .route("/api/v1/session/notice", delete(session::handle_dismiss_notice))
        .route("/api/v1/session/document", put(session::handle_replace_document))
        .route("/api/v1/session/template", put(session::handle_set_template))
        .route("/api/v1/session/summary", put(session::handle_set_summary))
        .route("/api/v1/session/skills", put(session::handle_set_skills))
        .route("/api/v1/session/photo", put(session::handle_set_photo))
        .route(
            "/api/v1/session/visibility/sections/:section",
            put(session::handle_section_visibility),
        )
        .route(
            "/api/v1/session/visibility/fields/:field",
            put(session::handle_field_visibility),
        )
        .route("/api/v1/session/experience", post(session::handle_add_experience))
        .route(
            "/api/v1/session/experience/:id",
            patch(session::handle_update_experience).delete(session::handle_remove_experience),
        )
        .route("/api/v1/session/education", post(session::handle_add_education))
        .route(
            "/api/v1/session/education/:id",
            patch(session::handle_update_education).delete(session::handle_remove_education),
        )
        // Preview, pagination, export
        .route("/api/v1/session/preview", post(session::handle_preview))
        .route("/api/v1/session/back", post(session::handle_back))
        .route("/api/v1/session/finish", post(session::handle_finish))
        .route("/api/v1/session/zoom", post(session::handle_zoom))
        .route("/api/v1/session/scroll", post(session::handle_scroll))
        .route("/api/v1/session/measure", post(session::handle_measure))
        .route("/api/v1/session/view", get(session::handle_view))
        .route("/api/v1/session/export", get(session::handle_export))
        // Enhancement
        .route("/api/v1/session/enhance", post(session::handle_enhance))
        .route(
            "/api/v1/session/enhance/undo",
            post(session::handle_undo_enhancement),
        )
        .route("/api/v1/enhance", post(session::handle_rewrite))
        // Admin
        .route("/api/v1/admin/lockout", get(admin::handle_lockout_status))
        .route(
            "/api/v1/admin/lockout/stages/:index",
            put(admin::handle_update_stage),
        )
        .route("/api/v1/admin/login", post(admin::handle_login))
        .route("/api/v1/admin/logout", post(admin::handle_logout))
        .route(
            "/api/v1/admin/settings",
            get(admin::handle_get_settings).put(admin::handle_update_settings),
        )
        .route(
            "/api/v1/admin/records",
            get(admin::handle_list_records).delete(admin::handle_delete_all_records),
        )
        .route("/api/v1/admin/records/stats", get(admin::handle_record_stats))
        .route(
            "/api/v1/admin/records/refresh",
            post(admin::handle_refresh_records),
        )
        .route(
            "/api/v1/admin/records/:id",
            delete(admin::handle_delete_record),
        )
        .route("/api/v1/admin/records/:id/edit", post(admin::handle_edit_record))
        .route(
            "/api/v1/admin/records/:id/download",
            post(admin::handle_download_record),
        )
        .with_state(state)
}
