//! Technical indicator implementations.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ema::Ema;
pub use macd::Macd;
pub use momentum::{Momentum, PriceChange};
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::Stochastic;

use super::Indicator;

/// All feature indicators, in feature column order.
pub fn all_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        // Momentum
        Box::new(Rsi::default()),
        Box::new(Momentum::default()),
        Box::new(Stochastic::default()),
        // Trend
        Box::new(Sma::new(7)),
        Box::new(Sma::new(25)),
        Box::new(Ema::new(12)),
        Box::new(Ema::new(26)),
        Box::new(Macd::default()),
        // Volatility
        Box::new(BollingerBands::default()),
        Box::new(Atr::default()),
        Box::new(PriceChange),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::OhlcvBar;

    pub fn bar(i: usize, close: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp: 1_000_000 + i as i64 * 86_400_000,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    pub fn uptrend_bars(count: usize) -> Vec<OhlcvBar> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                OhlcvBar {
                    timestamp: 1_000_000 + i as i64 * 86_400_000,
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    pub fn downtrend_bars(count: usize) -> Vec<OhlcvBar> {
        (0..count)
            .map(|i| {
                let base = 200.0 - i as f64 * 1.5;
                OhlcvBar {
                    timestamp: 1_000_000 + i as i64 * 86_400_000,
                    open: base,
                    high: base + 1.0,
                    low: base - 2.0,
                    close: base - 1.0,
                    volume: 1000.0,
                }
            })
            .collect()
    }

    pub fn flat_bars(count: usize, price: f64) -> Vec<OhlcvBar> {
        (0..count).map(|i| bar(i, price)).collect()
    }
}
