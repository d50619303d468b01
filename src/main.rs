use anyhow::Context;
use axum::Router;
use omen::config::Config;
use omen::services::{SignalEngine, SqliteResultStore};
use omen::sources::BinanceClient;
use omen::{api, AppState};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omen=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Omen server on {}:{}", config.host, config.port);

    let provider = BinanceClient::new(
        Some(config.binance_api_url.clone()),
        Duration::from_secs(config.fetch_timeout_secs),
    );

    // Predictor selection happens once, here
    let engine = Arc::new(SignalEngine::from_model_path(
        provider,
        config.engine.clone(),
        config.model_path.as_deref(),
    ));

    let store = match &config.results_db_path {
        Some(path) => Some(Arc::new(SqliteResultStore::new(path).with_context(|| {
            format!("opening result store at {}", path.display())
        })?)),
        None => {
            info!("RESULTS_DB_PATH not set, signal history will not be stored");
            None
        }
    };

    let state = AppState::new(config.clone(), engine, store);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router::<BinanceClient>())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Omen server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
