//! Market data providers.

pub mod binance;
pub mod static_provider;

pub use binance::BinanceClient;
pub use static_provider::StaticProvider;

use crate::error::Result;
use crate::types::OhlcvBar;
use std::future::Future;

/// Upstream source of OHLCV history.
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch up to `limit` bars of `pair` (`<SYMBOL>/<QUOTE>`), oldest first.
    fn fetch_ohlcv(
        &self,
        pair: &str,
        timeframe: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<OhlcvBar>>> + Send;
}
