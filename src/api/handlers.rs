//! API Handlers
//!
//! HTTP request handlers for the cache and constraint endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::constraints::{ConstraintEngine, ConstraintQuery};
use crate::error::{ApiError, Result};
use crate::models::{
    CheckResponse, DeleteResponse, DisabledResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache locks internally, so handlers share it without a wrapper lock.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheStore<String, String>>,
    pub engine: Arc<ConstraintEngine>,
}

impl AppState {
    pub fn new(cache: CacheStore<String, String>, engine: Arc<ConstraintEngine>) -> Self {
        Self {
            cache: Arc::new(cache),
            engine,
        }
    }

    /// Creates the cache and builds a dedicated engine from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine = ConstraintEngine::build(&config.disabled_algorithms)?;
        Ok(Self::new(
            CacheStore::from_config(&config.cache),
            Arc::new(engine),
        ))
    }
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let options = req.put_options();
    state.cache.put_with(req.key.clone(), req.value, options);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// On a queued key this consumes the oldest value.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&key)
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for POST /pull/:key
///
/// Removes the key and returns its value.
pub async fn pull_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .pull(&key)
        .ok_or_else(|| ApiError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.remove(&key) {
        return Err(ApiError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats().into())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for POST /constraints/check
///
/// Denials are a normal outcome and answer 200 with `permitted: false`.
pub async fn check_handler(
    State(state): State<AppState>,
    Json(query): Json<ConstraintQuery>,
) -> Result<Json<CheckResponse>> {
    if query.algorithm.is_none()
        && query.key.is_none()
        && query.certificate.is_none()
        && query.parameters.is_none()
    {
        return Err(ApiError::InvalidRequest(
            "Query needs an algorithm, key, certificate or parameters".to_string(),
        ));
    }

    let decision = state.engine.permits(&query);
    debug!(permitted = decision.is_permitted(), "Constraint check");
    Ok(Json(decision.into()))
}

/// Handler for GET /constraints/disabled
pub async fn disabled_handler(State(state): State<AppState>) -> Json<DisabledResponse> {
    Json(DisabledResponse {
        algorithms: state.engine.disabled_algorithms().into_iter().collect(),
    })
}
