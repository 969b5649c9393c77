use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::error::ApiError;
use storage::{DirectoryProvider, Storage};
use tokio::sync::watch;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod directory;

use app_state::AppState;
use config::{load_settings, normalize_database_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    if let Some(seed_path) = &settings.directory_seed_path {
        let raw = tokio::fs::read_to_string(seed_path)
            .await
            .with_context(|| format!("failed to read directory seed '{}'", seed_path.display()))?;
        let imported = storage.import_export(&raw).await?;
        info!(seed = %seed_path.display(), imported, "directory seed imported");
    }

    let provider: Arc<dyn DirectoryProvider> = Arc::new(storage.clone());
    let (snapshot, revision) = directory::load_initial(provider.as_ref()).await?;
    let (sender, receiver) = watch::channel(snapshot);
    directory::spawn_refresh(
        provider,
        Duration::from_secs(settings.directory_refresh_seconds),
        revision,
        sender,
    );

    let state = AppState {
        storage,
        directory: receiver,
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", post(api::webhook))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state.storage.health_check().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal(e.to_string())),
        )
    })?;
    Ok("ok")
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
