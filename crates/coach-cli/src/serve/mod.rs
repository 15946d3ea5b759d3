//! HTTP API.

mod ai;
mod auth;
mod error;
mod meals;
mod plans;
mod sessions;
mod templates;
mod trainer;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use coach_core::auth::TokenConfig;
use coach_core::blob::BlobStore;
use coach_core::extract::PlanExtractor;
use coach_core::{Diet, Workout};

/// Largest accepted request body (photo uploads, base64 plan images).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub tokens: Arc<TokenConfig>,
    pub blobs: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn PlanExtractor>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState, uploads_dir: &Path) -> Router {
    let router = Router::new()
        .route("/", get(health))
        .route("/api/ai/extract-plan", post(ai::extract_plan));
    let router = plans::routes::<Diet>(router);
    let router = plans::routes::<Workout>(router);
    let router = sessions::routes::<Diet>(router);
    let router = sessions::routes::<Workout>(router);
    let router = templates::routes::<Diet>(router);
    let router = templates::routes::<Workout>(router);
    let router = meals::routes(router);
    let router = trainer::routes(router);

    router
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "coach API is running"
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16, uploads_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(uploads_dir)
        .await
        .with_context(|| format!("failed to create uploads dir {}", uploads_dir.display()))?;

    let app = build_router(state, uploads_dir);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {bind}:{port}"))?;
    tracing::info!(uploads = %uploads_dir.display(), "coach serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("coach serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
