pub mod health;
pub mod signals;

use crate::sources::MarketDataProvider;
use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router<P: MarketDataProvider + 'static>() -> Router<AppState<P>> {
    Router::new()
        .merge(health::router())
        .nest("/api/signals", signals::router())
}
