//! Omen - technical-indicator trading signal engine and server

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use config::Config;
use services::signals::SignalEngine;
use services::store::SqliteResultStore;
use sources::{BinanceClient, MarketDataProvider};
use std::sync::Arc;

/// Application state shared across handlers.
pub struct AppState<P: MarketDataProvider = BinanceClient> {
    pub config: Arc<Config>,
    pub engine: Arc<SignalEngine<P>>,
    pub store: Option<Arc<SqliteResultStore>>,
}

impl<P: MarketDataProvider> AppState<P> {
    pub fn new(
        config: Arc<Config>,
        engine: Arc<SignalEngine<P>>,
        store: Option<Arc<SqliteResultStore>>,
    ) -> Self {
        Self {
            config,
            engine,
            store,
        }
    }
}

impl<P: MarketDataProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            engine: self.engine.clone(),
            store: self.store.clone(),
        }
    }
}

// Re-export commonly used types
pub use error::{EngineError, Result};
pub use types::*;
