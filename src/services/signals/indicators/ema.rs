//! Exponential Moving Average (EMA) indicator.

use crate::services::signals::{ema_series, Indicator, Series};
use crate::types::OhlcvBar;

/// EMA (Exponential Moving Average) indicator.
///
/// Like SMA but gives more weight to recent prices.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Ema {
    fn id(&self) -> &str {
        match self.period {
            12 => "ema_12",
            26 => "ema_26",
            _ => "ema",
        }
    }

    fn columns(&self) -> Vec<&'static str> {
        match self.period {
            12 => vec!["ema_12"],
            26 => vec!["ema_26"],
            _ => vec!["ema"],
        }
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        vec![ema_series(&closes, self.period)]
    }
}
