use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use server_api::{execute, ApiContext};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{GraphQlRequest, GraphQlResponse},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    storage
        .create_index(&settings.posts_index, &settings.posts_collection)
        .await?;
    info!(
        index = %settings.posts_index,
        collection = %settings.posts_collection,
        page_size = settings.page_size,
        "posts index ready"
    );

    let api = ApiContext::new(
        Arc::new(storage.clone()),
        settings.posts_index.clone(),
        settings.page_size,
    );
    let state = AppState {
        api,
        storage,
        max_query_bytes: settings.max_query_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let max_query_bytes = state.max_query_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/graphql", post(graphql))
        .route("/graphql/schema", get(graphql_schema))
        .layer(RequestBodyLimitLayer::new(max_query_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state.storage.health_check().await.map_err(|e| {
        warn!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Unavailable, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn graphql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GraphQlRequest>,
) -> Json<GraphQlResponse<serde_json::Value>> {
    Json(execute(&state.api, &req).await)
}

async fn graphql_schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.api.schema.to_sdl(),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
