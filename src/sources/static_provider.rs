use crate::error::{EngineError, Result};
use crate::sources::MarketDataProvider;
use crate::types::OhlcvBar;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory provider keyed by pair, for tests and offline replay.
#[derive(Default)]
pub struct StaticProvider {
    series: RwLock<HashMap<String, Vec<OhlcvBar>>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_series(self, pair: &str, bars: Vec<OhlcvBar>) -> Self {
        self.insert(pair, bars);
        self
    }

    /// Replace the history served for `pair`.
    pub fn insert(&self, pair: &str, bars: Vec<OhlcvBar>) {
        if let Ok(mut series) = self.series.write() {
            series.insert(pair.to_uppercase(), bars);
        }
    }

    fn lookup(&self, pair: &str, limit: usize) -> Result<Vec<OhlcvBar>> {
        let series = self
            .series
            .read()
            .map_err(|_| EngineError::MarketDataUnavailable("series lock poisoned".to_string()))?;
        let bars = series
            .get(&pair.to_uppercase())
            .ok_or_else(|| EngineError::MarketDataUnavailable(format!("no data for {}", pair)))?;

        let start = bars.len().saturating_sub(limit);
        Ok(bars[start..].to_vec())
    }
}

impl MarketDataProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_ohlcv(&self, pair: &str, _timeframe: &str, limit: usize) -> Result<Vec<OhlcvBar>> {
        self.lookup(pair, limit)
    }
}
