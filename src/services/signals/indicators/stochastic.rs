//! Stochastic Oscillator indicator.

use crate::services::signals::{finite, sma_series, Indicator, Series};
use crate::types::OhlcvBar;

/// Stochastic Oscillator.
///
/// Compares closing price to price range over a period:
/// %K = (Current Close - Lowest Low) / (Highest High - Lowest Low) * 100
/// %D = SMA of %K
///
/// Produces the `stoch_k` and `stoch_d` columns.
pub struct Stochastic {
    k_period: usize,
    d_period: usize,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
        }
    }
}

impl Indicator for Stochastic {
    fn id(&self) -> &str {
        "stochastic"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["stoch_k", "stoch_d"]
    }

    fn min_periods(&self) -> usize {
        self.k_period + self.d_period - 1
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let mut k_series = vec![None; bars.len()];
        let mut d_series = vec![None; bars.len()];
        if self.k_period == 0 || bars.len() < self.k_period {
            return vec![k_series, d_series];
        }

        let mut k_values = Vec::with_capacity(bars.len());
        for i in (self.k_period - 1)..bars.len() {
            let window = &bars[(i + 1 - self.k_period)..=i];

            let lowest_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let highest_high = window
                .iter()
                .map(|c| c.high)
                .fold(f64::NEG_INFINITY, f64::max);

            let k = if highest_high != lowest_low {
                ((bars[i].close - lowest_low) / (highest_high - lowest_low)) * 100.0
            } else {
                50.0
            };

            k_series[i] = finite(k);
            k_values.push(k);
        }

        let offset = self.k_period - 1;
        for (j, d) in sma_series(&k_values, self.d_period).into_iter().enumerate() {
            d_series[offset + j] = d;
        }

        vec![k_series, d_series]
    }
}
