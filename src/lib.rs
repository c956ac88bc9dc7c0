use axum::{http::header, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::extractor::Extractor;

// --- Modules ---
pub mod config;
pub mod error;
pub mod extractor;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod proxy;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<dyn Extractor>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, extractor: Arc<dyn Extractor>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(AppState {
            config: Arc::new(config),
            extractor,
            http,
        })
    }
}

/// Builds the application: the API routes, then the frontend for everything else.
pub fn router(state: AppState) -> Router {
    let static_dir = &state.config.static_dir;
    let frontend = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/api/info", get(handlers::get_info))
        .route("/api/download", get(handlers::download))
        .route("/download/*filename", get(handlers::download_pretty))
        .fallback_service(frontend)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any)
                .expose_headers([header::CONTENT_DISPOSITION, header::CONTENT_LENGTH]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
