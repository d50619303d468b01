//! Bollinger Bands indicator.

use crate::services::signals::{finite, Indicator, Series};
use crate::types::OhlcvBar;

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// Produces the `bb_upper`, `bb_middle` and `bb_lower` columns.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    /// Population standard deviation.
    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

impl Indicator for BollingerBands {
    fn id(&self) -> &str {
        "bollinger"
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["bb_upper", "bb_middle", "bb_lower"]
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series> {
        let mut upper = vec![None; bars.len()];
        let mut middle = vec![None; bars.len()];
        let mut lower = vec![None; bars.len()];

        if self.period == 0 || bars.len() < self.period {
            return vec![upper, middle, lower];
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        for end in self.period..=closes.len() {
            let window = &closes[end - self.period..end];
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let width = self.std_dev_multiplier * Self::std_dev(window, mean);

            upper[end - 1] = finite(mean + width);
            middle[end - 1] = finite(mean);
            lower[end - 1] = finite(mean - width);
        }

        vec![upper, middle, lower]
    }
}
