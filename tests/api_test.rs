//! Integration tests for API endpoints

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use omen::config::Config;
use omen::services::{SignalEngine, SqliteResultStore};
use omen::sources::StaticProvider;
use omen::{api, AppState, OhlcvBar};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn bars(count: usize) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = 200.0 + 0.5 * t + 4.0 * (t / 4.0).sin();
            OhlcvBar {
                timestamp: 1_600_000_000_000 + i as i64 * 86_400_000,
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 500.0,
            }
        })
        .collect()
}

fn app(with_store: bool) -> (Router, Option<Arc<SqliteResultStore>>) {
    let config = Config::default();
    let provider = StaticProvider::new()
        .with_series("BTC/USDT", bars(120))
        .with_series("SHORT/USDT", bars(40));
    let engine = SignalEngine::new(provider, config.engine.clone(), None);
    let store = with_store.then(|| Arc::new(SqliteResultStore::new_in_memory().unwrap()));

    let state = AppState::new(Arc::new(config), Arc::new(engine), store.clone());
    let router = Router::new()
        .merge(api::router::<StaticProvider>())
        .with_state(state);
    (router, store)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (router, _) = app(false);
    let (status, body) = get(&router, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["predictor"], "heuristic");
    assert_eq!(body["trained"], false);
    assert_eq!(body["persistence"], false);
}

#[tokio::test]
async fn test_signal_wire_shape() {
    let (router, _) = app(false);
    let (status, body) = get(&router, "/api/signals/btc").await;
    assert_eq!(status, StatusCode::OK);

    for field in [
        "symbol",
        "signal",
        "confidence",
        "current_price",
        "entry_price",
        "target_1",
        "target_2",
        "stop_loss",
        "timeframe",
        "risk_level",
        "probabilities",
        "indicators",
        "predicted_at",
        "model_version",
        "is_mock",
    ] {
        assert!(body.get(field).is_some(), "missing {}", field);
    }

    assert_eq!(body["symbol"], "BTC");
    assert_eq!(body["is_mock"], true);
    let probs = &body["probabilities"];
    let sum = probs["SELL"].as_f64().unwrap() + probs["HOLD"].as_f64().unwrap() + probs["BUY"].as_f64().unwrap();
    assert!((sum - 1.0).abs() < 1e-9);
    for key in ["rsi", "macd", "sma_7", "sma_25", "stoch_k", "buy_score", "sell_score"] {
        assert!(body["indicators"].get(key).is_some(), "missing indicator {}", key);
    }
}

#[tokio::test]
async fn test_signal_errors() {
    let (router, _) = app(false);

    let (status, body) = get(&router, "/api/signals/short").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);

    let (status, _) = get(&router, "/api/signals/unknown").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = get(&router, "/api/signals/b%24c").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signals_persisted_and_aggregated() {
    let (router, store) = app(true);
    let store = store.unwrap();

    for _ in 0..3 {
        let (status, _) = get(&router, "/api/signals/BTC").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(store.count().unwrap(), 3);

    let (status, body) = get(&router, "/api/signals/stats?symbol=btc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "BTC");
    assert_eq!(body["counts"]["total"], 3);

    let (status, body) = get(&router, "/api/signals/BTC/trend?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"].as_array().unwrap().len(), 2);

    let (status, _) = get(&router, "/api/signals/BTC/trend?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_without_store() {
    let (router, _) = app(false);
    let (status, body) = get(&router, "/api/signals/stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}
