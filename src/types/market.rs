use serde::{Deserialize, Serialize};

/// One period of price and volume data (Open, High, Low, Close, Volume).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Unix timestamp (milliseconds) of the period open.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// True when every price and volume field is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }

    /// True when all four prices are positive and volume is not negative.
    pub fn has_valid_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close].iter().all(|p| *p > 0.0) && self.volume >= 0.0
    }
}

/// Build the `<SYMBOL>/<QUOTE>` pair name requested from the market data provider.
pub fn trading_pair(symbol: &str, quote: &str) -> String {
    format!("{}/{}", symbol.trim().to_uppercase(), quote.trim().to_uppercase())
}
