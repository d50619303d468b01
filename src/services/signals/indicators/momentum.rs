//! Rate of change indicators: momentum and period-over-period price change.

use crate::services::signals::{finite, Indicator, Series};
use crate::types::OhlcvBar;

/// Percentage change of the close versus `lag` bars earlier.
fn percent_change(bars: &[OhlcvBar], lag: usize) -> Series {
    let mut out = vec![None; bars.len()];
    for i in lag..bars.len() {
        let base = bars[i - lag].close;
        out[i] = finite((bars[i].close - base) / base * 100.0);
    }
    out
}

/// Momentum expressed as the rate of change over `period` bars.
pub struct Momentum {
    period: usize,
}

impl Default for Momentum {
    fn default() -> Self {
        Self { period: 10 }
    }
}

impl Indicator for Momentum {
    fn id(&self) -> &str {
        "momentum"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["momentum"]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        if self.period == 0 {
            return vec![vec![None; bars.len()]];
        }
        vec![percent_change(bars, self.period)]
    }
}

/// Simple period-over-period percentage price change.
#[derive(Default)]
pub struct PriceChange;

impl Indicator for PriceChange {
    fn id(&self) -> &str {
        "price_change"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["price_change"]
    }

    fn min_periods(&self) -> usize {
        2
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        vec![percent_change(bars, 1)]
    }
}
