use crate::sources::MarketDataProvider;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    predictor: String,
    trained: bool,
    market_data: String,
    persistence: bool,
}

async fn health<P: MarketDataProvider + 'static>(
    State(state): State<AppState<P>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        predictor: state.engine.predictor_name().to_string(),
        trained: state.engine.is_trained(),
        market_data: state.engine.provider().name().to_string(),
        persistence: state.store.is_some(),
    })
}

pub fn router<P: MarketDataProvider + 'static>() -> Router<AppState<P>> {
    Router::new().route("/api/health", get(health::<P>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::signals::SignalEngine;
    use crate::sources::StaticProvider;
    use std::sync::Arc;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            version: "1.0.0",
            predictor: "heuristic".to_string(),
            trained: false,
            market_data: "static".to_string(),
            persistence: false,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"1.0.0\""));
        assert!(json.contains("\"trained\":false"));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let config = Config::default();
        let engine = SignalEngine::new(StaticProvider::new(), config.engine.clone(), None);
        let state = AppState::new(Arc::new(config), Arc::new(engine), None);

        let Json(response) = health(State(state)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(response.predictor, "heuristic");
        assert_eq!(response.market_data, "static");
        assert!(!response.persistence);
    }
}
