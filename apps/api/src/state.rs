use std::sync::Arc;

use crate::config::Config;
use crate::enhance::TextEnhancer;
use crate::session::Session;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single editor session. Owns the store and lockout machine.
    pub session: Arc<Session>,
    /// Same enhancer the session uses, for one-off rewrites outside the document.
    pub enhancer: Arc<dyn TextEnhancer>,
    pub config: Config,
}
