use crate::config::RelayConfig;
use crate::logging::{LogEntry, LogLevel, SharedLogger};
use crate::relay::{self, ChatRelay, ModelsRelay};
use crate::translate::resolve_upstream_request;
use crate::translate::types::{ChatCompletionRequest, ErrorResponse};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat))
        .route("/chat/completions", post(handle_chat))
        .route("/v1/models", get(handle_models))
        .route("/models", get(handle_models))
        .route("/", get(handle_health))
        .route("/health", get(handle_health))
        .route("/v1/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Extract the opaque credential from `Authorization: Bearer <credential>`.
fn bearer_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    let err = ErrorResponse::new("Missing API key in Authorization header");
    (StatusCode::UNAUTHORIZED, Json(err)).into_response()
}

fn internal_error(message: impl std::fmt::Display) -> Response {
    let err = ErrorResponse::new(message.to_string());
    (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(credential) = bearer_credential(&headers) else {
        return unauthorized();
    };

    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            state
                .logger
                .error("server", format!("Failed to parse request: {e}"));
            return internal_error(format!("Invalid request body: {e}"));
        }
    };

    let request_id = uuid::Uuid::new_v4().to_string();
    let upstream_req = resolve_upstream_request(&req, &state.config.defaults);

    match relay::relay_chat(
        &upstream_req,
        &credential,
        &state.config,
        &state.client,
        &state.logger,
        &request_id,
    )
    .await
    {
        Ok(ChatRelay::Buffered(json)) => (StatusCode::OK, Json(json)).into_response(),
        Ok(ChatRelay::Streaming(stream)) => streaming_response(stream),
        Ok(ChatRelay::Error(err, status)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(err)).into_response()
        }
        Err(e) => {
            state.logger.log(
                LogEntry::new(LogLevel::Error, "server", format!("Relay error: {e}"))
                    .with_request(&request_id),
            );
            internal_error(e)
        }
    }
}

/// Wrap the raw upstream byte stream in an SSE-shaped response. Chunk
/// boundaries come straight from upstream; the headers are the only thing
/// this relay adds.
fn streaming_response(stream: relay::ByteStream) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_models(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(credential) = bearer_credential(&headers) else {
        return unauthorized();
    };

    match relay::relay_models(&credential, &state.config, &state.client, &state.logger).await {
        Ok(ModelsRelay::Success(json)) => (StatusCode::OK, Json(json)).into_response(),
        Ok(ModelsRelay::Error(err, status)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(err)).into_response()
        }
        Err(e) => {
            state.logger.error("server", format!("Models relay error: {e}"));
            internal_error(e)
        }
    }
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "nim-relay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_not_found() -> Response {
    let err = ErrorResponse::new("Endpoint not found");
    (StatusCode::NOT_FOUND, Json(err)).into_response()
}
