//! Trading signal engine.
//!
//! Provides technical indicator series, the feature pipeline, the
//! interchangeable signal predictors and the trading level calculation.

pub mod engine;
pub mod features;
pub mod heuristic;
pub mod indicators;
pub mod levels;
pub mod model;
pub mod predictor;

pub use engine::SignalEngine;
pub use features::{
    FeatureMatrix, IndicatorRow, MinMaxScaler, SequenceWindow, TrainingSet, FEATURE_COLUMNS,
};
pub use heuristic::{HeuristicPredictor, MovingAverageCrossPredictor};
pub use levels::calculate_levels;
pub use model::SequenceClassifier;
pub use predictor::{Prediction, PredictorChain, PredictorError, SequencePredictor, SignalPredictor};

use crate::types::OhlcvBar;

/// Per-bar indicator values; `None` while the indicator is warming up.
pub type Series = Vec<Option<f64>>;

/// Trait for implementing technical indicators.
pub trait Indicator: Send + Sync {
    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Feature column names produced, in output order.
    fn columns(&self) -> Vec<&'static str>;

    /// Minimum number of bars before the first value exists.
    fn min_periods(&self) -> usize;

    /// Calculate one series per column, each aligned with `bars`.
    fn calculate(&self, bars: &[OhlcvBar]) -> Vec<Series>;
}

/// Keep only finite values.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Simple moving average of each trailing `period` window.
pub fn sma_series(values: &[f64], period: usize) -> Series {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values.iter().take(period).sum();
    out[period - 1] = finite(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = finite(sum / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period` values.
pub fn ema_series(values: &[f64], period: usize) -> Series {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = values.iter().take(period).sum::<f64>() / period as f64;
    out[period - 1] = finite(ema);
    for i in period..values.len() {
        ema = (values[i] - ema) * multiplier + ema;
        out[i] = finite(ema);
    }
    out
}

/// Index of the first defined value.
pub fn first_defined(series: &Series) -> Option<usize> {
    series.iter().position(|v| v.is_some())
}
