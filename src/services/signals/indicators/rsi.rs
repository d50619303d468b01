//! Relative Strength Index (RSI) indicator.

use crate::services::signals::{finite, Indicator, Series};
use crate::types::OhlcvBar;

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
        if avg_loss == 0.0 {
            // Flat window reads as neutral rather than overbought.
            return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
        }
        let rs = avg_gain / avg_loss;
        finite(100.0 - (100.0 / (1.0 + rs)))
    }
}

impl Indicator for Rsi {
    fn id(&self) -> &str {
        "rsi"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["rsi"]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let mut out = vec![None; bars.len()];
        if self.period == 0 || bars.len() < self.min_periods() {
            return vec![out];
        }

        let mut gains = Vec::with_capacity(bars.len() - 1);
        let mut losses = Vec::with_capacity(bars.len() - 1);
        for i in 1..bars.len() {
            let change = bars[i].close - bars[i - 1].close;
            gains.push(change.max(0.0));
            losses.push((-change).max(0.0));
        }

        // Initial averages, then Wilder smoothing
        let period = self.period as f64;
        let mut avg_gain = gains.iter().take(self.period).sum::<f64>() / period;
        let mut avg_loss = losses.iter().take(self.period).sum::<f64>() / period;
        out[self.period] = Self::rsi_from_averages(avg_gain, avg_loss);

        for i in self.period..gains.len() {
            avg_gain = (avg_gain * (period - 1.0) + gains[i]) / period;
            avg_loss = (avg_loss * (period - 1.0) + losses[i]) / period;
            out[i + 1] = Self::rsi_from_averages(avg_gain, avg_loss);
        }

        vec![out]
    }
}
