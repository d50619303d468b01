//! Simple Moving Average (SMA) indicator.

use crate::services::signals::{sma_series, Indicator, Series};
use crate::types::OhlcvBar;

/// SMA (Simple Moving Average) indicator.
///
/// Average closing price over the trailing period.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Sma {
    fn id(&self) -> &str {
        match self.period {
            7 => "sma_7",
            25 => "sma_25",
            _ => "sma",
        }
    }

    fn columns(&self) -> Vec<&'static str> {
        match self.period {
            7 => vec!["sma_7"],
            25 => vec!["sma_25"],
            _ => vec!["sma"],
        }
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        vec![sma_series(&closes, self.period)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::uptrend_bars;

    #[test]
    fn test_sma_ids() {
        assert_eq!(Sma::new(7).id(), "sma_7");
        assert_eq!(Sma::new(25).columns(), vec!["sma_25"]);
        assert_eq!(Sma::new(3).id(), "sma");
    }

    #[test]
    fn test_sma_value() {
        let bars = uptrend_bars(10);
        let series = &Sma::new(7).calculate(&bars)[0];
        assert!(series[5].is_none());
        let expected = bars[3..10].iter().map(|b| b.close).sum::<f64>() / 7.0;
        assert!((series[9].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sma_lags_price_in_uptrend() {
        let bars = uptrend_bars(40);
        let sma7 = Sma::new(7).calculate(&bars)[0][39].unwrap();
        let sma25 = Sma::new(25).calculate(&bars)[0][39].unwrap();
        assert!(bars[39].close > sma7);
        assert!(sma7 > sma25);
    }
}
