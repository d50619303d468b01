//! Signal API endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::error::{EngineError, Result};
use crate::services::store::{ConfidencePoint, ResultStore, SignalCounts, SqliteResultStore};
use crate::services::signals::engine::normalize_symbol;
use crate::sources::MarketDataProvider;
use crate::types::SignalResult;
use crate::AppState;

const DEFAULT_TREND_LIMIT: usize = 30;
const MAX_TREND_LIMIT: usize = 500;

/// Query parameters for the stats endpoint.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub symbol: Option<String>,
}

/// Query parameters for the trend endpoint.
#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub symbol: Option<String>,
    pub counts: SignalCounts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendResponse {
    pub symbol: String,
    pub points: Vec<ConfidencePoint>,
}

/// Create the signals router.
pub fn router<P: MarketDataProvider + 'static>() -> Router<AppState<P>> {
    Router::new()
        .route("/stats", get(get_stats::<P>))
        .route("/:symbol", get(get_signal::<P>))
        .route("/:symbol/trend", get(get_trend::<P>))
}

fn require_store<P: MarketDataProvider>(state: &AppState<P>) -> Result<Arc<SqliteResultStore>> {
    state
        .store
        .clone()
        .ok_or_else(|| EngineError::Storage("result store not configured".to_string()))
}

/// Run a SQLite call on the blocking pool.
async fn with_store<T, F>(store: Arc<SqliteResultStore>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&SqliteResultStore) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| EngineError::Storage(format!("store task failed: {}", e)))?
}

/// Predict a signal for a symbol.
async fn get_signal<P: MarketDataProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(symbol): Path<String>,
) -> Result<Json<SignalResult>> {
    let timeout = Duration::from_secs(state.config.fetch_timeout_secs);
    let result = tokio::time::timeout(timeout, state.engine.predict_signal(&symbol))
        .await
        .map_err(|_| {
            warn!("Signal request for {} timed out after {:?}", symbol, timeout);
            EngineError::MarketDataUnavailable("market data request timed out".to_string())
        })??;

    if let Some(store) = state.store.clone() {
        let stored = result.clone();
        if let Err(e) = with_store(store, move |store| store.insert(&stored)).await {
            error!("Failed to store signal for {}: {}", result.symbol, e);
        }
    }

    Ok(Json(result))
}

/// Signal-type counts, optionally for one symbol.
async fn get_stats<P: MarketDataProvider + 'static>(
    State(state): State<AppState<P>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let store = require_store(&state)?;
    let symbol = query.symbol.as_deref().map(normalize_symbol).transpose()?;
    let filter = symbol.clone();
    let counts = with_store(store, move |store| store.signal_counts(filter.as_deref())).await?;
    Ok(Json(StatsResponse { symbol, counts }))
}

/// Recent confidence values for a symbol, oldest first.
async fn get_trend<P: MarketDataProvider + 'static>(
    State(state): State<AppState<P>>,
    Path(symbol): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>> {
    let store = require_store(&state)?;
    let symbol = normalize_symbol(&symbol)?;
    let limit = query.limit.unwrap_or(DEFAULT_TREND_LIMIT);
    if limit == 0 || limit > MAX_TREND_LIMIT {
        return Err(EngineError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_TREND_LIMIT
        )));
    }

    let key = symbol.clone();
    let points = with_store(store, move |store| store.confidence_trend(&key, limit)).await?;
    Ok(Json(TrendResponse { symbol, points }))
}
