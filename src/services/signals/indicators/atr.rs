//! Average True Range (ATR) indicator.

use crate::services::signals::{finite, Indicator, Series};
use crate::types::OhlcvBar;

/// ATR (Average True Range) indicator.
///
/// Measures market volatility by calculating the average of true ranges:
/// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
///
/// Smoothed with Wilder's method.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    /// Calculate True Range.
    fn true_range(current: &OhlcvBar, previous: &OhlcvBar) -> f64 {
        let hl = current.high - current.low;
        let hc = (current.high - previous.close).abs();
        let lc = (current.low - previous.close).abs();
        hl.max(hc).max(lc)
    }
}

impl Indicator for Atr {
    fn id(&self) -> &str {
        "atr"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["atr"]
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let mut out = vec![None; bars.len()];
        if self.period == 0 || bars.len() < self.min_periods() {
            return vec![out];
        }

        let true_ranges: Vec<f64> = bars
            .windows(2)
            .map(|pair| Self::true_range(&pair[1], &pair[0]))
            .collect();

        let period = self.period as f64;
        let mut atr = true_ranges.iter().take(self.period).sum::<f64>() / period;
        out[self.period] = finite(atr);

        for (i, tr) in true_ranges.iter().enumerate().skip(self.period) {
            atr = (atr * (period - 1.0) + tr) / period;
            out[i + 1] = finite(atr);
        }

        vec![out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{flat_bars, uptrend_bars};

    #[test]
    fn test_atr_id_and_columns() {
        let atr = Atr::default();
        assert_eq!(atr.id(), "atr");
        assert_eq!(atr.min_periods(), 15);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let series = &Atr::default().calculate(&uptrend_bars(10))[0];
        assert!(series.iter().all(Option::is_none));
    }

    #[test]
    fn test_atr_positive_value() {
        let series = &Atr::default().calculate(&uptrend_bars(30))[0];
        assert!(series[13].is_none());
        let value = series[29].unwrap();
        assert!(value > 0.0, "ATR should be positive, got {}", value);
    }

    #[test]
    fn test_atr_zero_for_flat_bars() {
        let series = &Atr::default().calculate(&flat_bars(20, 5.0))[0];
        assert_eq!(series[19], Some(0.0));
    }
}
