use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::info;

use super::ocr::ocr_request;
use super::state::ServerState;
use crate::credentials::Credentials;
use crate::gateways;
use crate::settings::Settings;

pub async fn run_server(settings: Settings, credentials: Credentials, addr: String) -> Result<()> {
    let (vision, translate) = gateways::build_gateways(&settings, credentials)?;
    let state = Arc::new(ServerState {
        recognizer: Arc::new(vision),
        translator: Arc::new(translate),
        detector: settings.script,
        languages: settings.languages.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address: {}", addr))?;
    info!("server: listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ocr", post(ocr))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn ocr(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> axum::response::Response {
    match ocr_request(state.as_ref(), multipart).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}
