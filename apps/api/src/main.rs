mod config;
mod db;
mod enhance;
mod errors;
mod lockout;
mod models;
mod pagination;
mod render;
mod routes;
mod session;
mod state;
mod store;
mod visibility;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::enhance::{GeminiEnhancer, TextEnhancer};
use crate::lockout::LockoutMachine;
use crate::routes::build_router;
use crate::session::controller::ViewController;
use crate::session::Session;
use crate::state::AppState;
use crate::store::{MemoryResumeStore, PgResumeStore, ResumeStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Studio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the resume store
    let store: Arc<dyn ResumeStore> = match &config.database_url {
        Some(url) => {
            let store = PgResumeStore::new(create_pool(url).await?);
            store.ensure_schema().await?;
            info!("Resume store: PostgreSQL");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, resumes are kept in memory only");
            Arc::new(MemoryResumeStore::new())
        }
    };

    // Initialize the text enhancer
    let gemini = GeminiEnhancer::new(config.gemini_api_key.clone(), config.gemini_model.clone())?;
    if gemini.is_configured() {
        info!("Text enhancement enabled (model: {})", config.gemini_model);
    } else {
        warn!("GEMINI_API_KEY not set, text enhancement is disabled");
    }
    let enhancer: Arc<dyn TextEnhancer> = Arc::new(gemini);

    // Build the editor session
    let lockout = LockoutMachine::new(config.lockout.clone(), config.admin_pin.clone());
    info!(
        "Admin lockout stages: {:?}, auto-cleanup: {:?}",
        config.lockout.stages(),
        config.admin_settings
    );
    let controller = ViewController::new(
        store,
        Arc::clone(&enhancer),
        lockout,
        config.admin_settings,
    );

    // Build app state
    let state = AppState {
        session: Session::new(controller),
        enhancer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
