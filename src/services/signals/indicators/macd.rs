//! MACD (Moving Average Convergence Divergence) indicator.

use crate::services::signals::{ema_series, finite, first_defined, Indicator, Series};
use crate::types::OhlcvBar;

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
///
/// Produces the `macd` and `macd_signal` columns.
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Indicator for Macd {
    fn id(&self) -> &str {
        "macd"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["macd", "macd_signal"]
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = ema_series(&closes, self.fast_period);
        let slow = ema_series(&closes, self.slow_period);

        let macd_line: Series = fast
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => finite(f - s),
                _ => None,
            })
            .collect();

        // Signal line runs over the defined tail of the MACD line
        let mut signal_line = vec![None; bars.len()];
        if let Some(start) = first_defined(&macd_line) {
            let tail: Option<Vec<f64>> = macd_line[start..].iter().copied().collect();
            if let Some(tail) = tail {
                for (offset, value) in ema_series(&tail, self.signal_period).into_iter().enumerate() {
                    signal_line[start + offset] = value;
                }
            }
        }

        vec![macd_line, signal_line]
    }
}
