use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::{error, info};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::metrics::metrics_handler;
use super::{log_requests, state::ServerState, ServerConfig};
use crate::catalog_store::{CatalogRepository, ItemFilter};
use crate::error::CatalogError;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub provider: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn storage_error(err: CatalogError) -> Response {
    error!("Catalog request failed: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        provider: state.config.provider.to_string(),
    };
    Json(stats)
}

async fn get_catalog_types(State(repository): State<CatalogRepository>) -> Response {
    match repository.get_types() {
        Ok(types) => Json(types).into_response(),
        Err(err) => storage_error(err),
    }
}

async fn get_catalog_brands(State(repository): State<CatalogRepository>) -> Response {
    match repository.get_brands() {
        Ok(brands) => Json(brands).into_response(),
        Err(err) => storage_error(err),
    }
}

async fn get_items(
    State(repository): State<CatalogRepository>,
    Query(filter): Query<ItemFilter>,
) -> Response {
    match repository.get_items_filtered(&filter) {
        Ok(items) => Json(items).into_response(),
        Err(err) => storage_error(err),
    }
}

async fn get_item(State(repository): State<CatalogRepository>, Path(id): Path<i32>) -> Response {
    match repository.get_item(id) {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => storage_error(err),
    }
}

async fn get_item_picture(
    State(repository): State<CatalogRepository>,
    Path(id): Path<i32>,
) -> Response {
    let image = match repository.get_image(id) {
        Ok(Some(image)) => image,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return storage_error(err),
    };

    if let Some(kind) = infer::get(&image.bytes) {
        if kind.mime_type().starts_with("image/") {
            return ([(header::CONTENT_TYPE, kind.mime_type())], image.bytes).into_response();
        }
    }
    StatusCode::NOT_FOUND.into_response()
}

impl ServerState {
    fn new(config: ServerConfig, repository: CatalogRepository) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            repository,
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(config: ServerConfig, repository: CatalogRepository) -> Router {
    let state = ServerState::new(config, repository);

    let catalog_routes: Router = Router::new()
        .route("/catalogtypes", get(get_catalog_types))
        .route("/catalogbrands", get(get_catalog_brands))
        .route("/items", get(get_items))
        .route("/items/{id}", get(get_item))
        .route("/items/{id}/pic", get(get_item_picture))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone())
        .nest("/api/v1/catalog", catalog_routes)
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            log_requests,
        ))
}

pub async fn run_server(config: ServerConfig, repository: CatalogRepository) -> Result<()> {
    let port = config.port;
    info!("Serving {} on port {}", repository.describe(), port);
    let app = make_app(config, repository);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    Ok(axum::serve(listener, app).await?)
}
