//! HTTP service mode

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use runcell::{ExecutionRequest, Runner};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub runner: Runner,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub supported_languages: Vec<String>,
    pub available_languages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub id: String,
    pub name: String,
    pub compiled: bool,
    pub available: bool,
}

/// Build the router
pub fn build_router(runner: Runner) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/health", get(health))
        .route("/languages", get(languages))
        .with_state(AppState { runner })
}

/// Bind and serve until the process is stopped
pub async fn serve(runner: Runner, bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "listening");

    axum::serve(listener, build_router(runner))
        .await
        .context("server error")
}

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecutionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match state.runner.execute(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

fn bad_request(error: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": error })),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.runner.registry();
    let toolchains = state.runner.toolchains();

    Json(HealthResponse {
        status: "healthy",
        supported_languages: registry.ids().map(str::to_owned).collect(),
        available_languages: registry
            .iter()
            .filter(|language| toolchains.is_available(language))
            .map(|language| language.id.clone())
            .collect(),
    })
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    let toolchains = state.runner.toolchains();
    Json(
        state
            .runner
            .registry()
            .iter()
            .map(|language| LanguageInfo {
                id: language.id.clone(),
                name: language.name.clone(),
                compiled: language.is_compiled(),
                available: toolchains.is_available(language),
            })
            .collect(),
    )
}
