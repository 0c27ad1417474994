//! Scrape endpoint handlers.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::super::AppState;
use super::types::{ScrapeParams, ScrapeResponse, ServiceInfo};
use crate::error::ScrapeError;
use crate::models::ScrapeResult;

/// `GET /`: service info without `url`, otherwise the same as `/scrape`.
pub async fn root(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(params): Query<ScrapeParams>,
) -> Response {
    if params.url.is_none() {
        return Json(ServiceInfo::default()).into_response();
    }
    respond(&state, connect_info, &headers, params).await
}

/// `GET /scrape?url=`.
pub async fn scrape(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(params): Query<ScrapeParams>,
) -> Response {
    respond(&state, connect_info, &headers, params).await
}

async fn respond(
    state: &AppState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    params: ScrapeParams,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client = state.policy.client_identity(headers, peer);

    match run_scrape(state, &client, params.url.as_deref()).await {
        Ok(result) => Json(ScrapeResponse::from(result)).into_response(),
        Err(e) => {
            warn!(kind = e.kind(), client = %client, "Scrape failed: {}", e);
            e.into_response()
        }
    }
}

/// Admit the request, then run the pipeline on its own task.
///
/// The spawned task keeps running if the client disconnects, so the page is
/// always released by the orchestrator.
async fn run_scrape(
    state: &AppState,
    client: &str,
    raw_url: Option<&str>,
) -> Result<ScrapeResult, ScrapeError> {
    let request = state.policy.admit(client, raw_url).await?;

    let request_id = Uuid::new_v4();
    let span = info_span!(
        "scrape",
        request_id = %request_id,
        client = %client,
        host = %request.host()
    );
    info!(parent: &span, "Scraping {}", request.target_url);

    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.scrape(&request).await }.instrument(span));

    match task.await {
        Ok(outcome) => outcome,
        Err(e) => Err(ScrapeError::ExtractionFailed(format!(
            "Scrape task failed: {}",
            e
        ))),
    }
}
