// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::config::ServerSettings;
use crate::location::Location;
use crate::report::{ReportAssembler, ReportResponse};

#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<ReportAssembler>,
}

impl AppState {
    pub fn new(assembler: ReportAssembler) -> Self {
        Self {
            assembler: Arc::new(assembler),
        }
    }
}

pub fn create_router(state: AppState, server: &ServerSettings) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sustainability-result", post(sustainability_result))
        .layer(cors_layer(server))
        .with_state(state)
}

/// CORS restricted to the configured origins. Unparseable origins are skipped.
pub fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

#[derive(Debug)]
pub enum ApiError {
    InvalidLocation(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidLocation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": detail })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "error generating sustainability report");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationInput {
    pub latitude: f64,
    pub longitude: f64,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn sustainability_result(
    State(state): State<AppState>,
    payload: Result<Json<LocationInput>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(input) = payload.map_err(|rejection| {
        warn!(status = %rejection.status(), "rejected sustainability request body");
        ApiError::InvalidLocation(rejection.body_text())
    })?;
    let location = Location::new(input.latitude, input.longitude)
        .map_err(|e| ApiError::InvalidLocation(e.to_string()))?;
    info!(%location, "sustainability report requested");
    let response = state
        .assembler
        .respond(location)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(response))
}
