//! Router and handlers for the topic query API.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use wdtopic_core::{
    ClaimSet, EncoderConfig, Qid, ScoredTopic, ThresholdMode, TopicScorer, encode, rank_all,
    select_topics, validate_threshold,
};
use wdtopic_wikidata::{ClaimSource, FetchError};

/// Per-process state: the claim source, the loaded scorer, and request
/// defaults. Nothing here mutates after startup.
pub struct AppState {
    pub claims: Arc<dyn ClaimSource>,
    pub scorer: Arc<dyn TopicScorer>,
    pub encoder: EncoderConfig,
    pub default_threshold: f32,
    pub threshold_mode: ThresholdMode,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/wikidata/topic", get(topic_handler))
        .with_state(state)
}

async fn index_handler() -> &'static str {
    "Server Works!"
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

#[derive(Debug, Deserialize)]
struct TopicQuery {
    qid: Option<String>,
    /// Kept as a string so a non-numeric value is a 400, not a silent
    /// deserialization failure.
    threshold: Option<String>,
    /// Presence flag.
    debug: Option<String>,
}

#[derive(Debug, Serialize)]
struct TopicResponse {
    qid: Qid,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    topics: Vec<ScoredTopic>,
    /// Full ranked score listing, debug only.
    #[serde(skip_serializing_if = "Option::is_none")]
    scores: Option<Vec<ScoredTopic>>,
    /// The raw claims the prediction was encoded from, debug only.
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<ClaimSet>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(_) => ApiError::NotFound(err.to_string()),
            _ => ApiError::Upstream(err.to_string()),
        }
    }
}

async fn topic_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopicQuery>,
) -> Result<Json<TopicResponse>, ApiError> {
    let qid_raw = params
        .qid
        .ok_or_else(|| ApiError::BadRequest("no 'qid' field provided".to_string()))?;
    let qid: Qid = qid_raw
        .parse()
        .map_err(|e: wdtopic_core::QidParseError| ApiError::BadRequest(e.to_string()))?;

    let threshold = match &params.threshold {
        None => state.default_threshold,
        Some(raw) => raw.trim().parse::<f32>().map_err(|_| {
            ApiError::BadRequest(format!("threshold value provided not a float: {raw}"))
        })?,
    };
    validate_threshold(threshold).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let debug = params.debug.is_some();

    let entity = state.claims.fetch_entity(&qid).await?;
    let tokens =
        encode(&entity.claims, &state.encoder).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let scores = state
        .scorer
        .score(&tokens)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let topics = select_topics(&scores, threshold, state.threshold_mode)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!(qid = %qid, threshold, topics = topics.len(), "labeled item");

    Ok(Json(TopicResponse {
        scores: debug.then(|| rank_all(&scores)),
        claims: debug.then_some(entity.claims),
        qid,
        name: entity.label,
        topics,
    }))
}
