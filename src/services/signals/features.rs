//! Feature pipeline: OHLCV history to indicator rows, normalized matrices and
//! sequence windows.

use crate::config::{Config, LabelConfig};
use crate::error::{EngineError, Result};
use crate::services::signals::indicators::all_indicators;
use crate::types::{OhlcvBar, TradeSignal};
use ndarray::{s, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Feature column order. Trained artifacts are matched against this positionally.
pub const FEATURE_COLUMNS: [&str; 20] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "rsi",
    "momentum",
    "stoch_k",
    "stoch_d",
    "sma_7",
    "sma_25",
    "ema_12",
    "ema_26",
    "macd",
    "macd_signal",
    "bb_upper",
    "bb_middle",
    "bb_lower",
    "atr",
    "price_change",
];

/// Number of feature columns.
pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

/// One bar with its full indicator set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub bar: OhlcvBar,
    pub rsi: f64,
    pub momentum: f64,
    pub stoch_k: f64,
    pub stoch_d: f64,
    pub sma_7: f64,
    pub sma_25: f64,
    pub ema_12: f64,
    pub ema_26: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub atr: f64,
    pub price_change: f64,
}

impl IndicatorRow {
    /// Build from a bar and its 15 indicator values in feature column order.
    pub fn from_values(bar: OhlcvBar, v: [f64; 15]) -> Self {
        Self {
            bar,
            rsi: v[0],
            momentum: v[1],
            stoch_k: v[2],
            stoch_d: v[3],
            sma_7: v[4],
            sma_25: v[5],
            ema_12: v[6],
            ema_26: v[7],
            macd: v[8],
            macd_signal: v[9],
            bb_upper: v[10],
            bb_middle: v[11],
            bb_lower: v[12],
            atr: v[13],
            price_change: v[14],
        }
    }

    /// All 20 feature values in column order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.bar.open,
            self.bar.high,
            self.bar.low,
            self.bar.close,
            self.bar.volume,
            self.rsi,
            self.momentum,
            self.stoch_k,
            self.stoch_d,
            self.sma_7,
            self.sma_25,
            self.ema_12,
            self.ema_26,
            self.macd,
            self.macd_signal,
            self.bb_upper,
            self.bb_middle,
            self.bb_lower,
            self.atr,
            self.price_change,
        ]
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}

/// Ordered collection of fully valid indicator rows.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    rows: Vec<IndicatorRow>,
}

impl FeatureMatrix {
    /// Compute every indicator over `bars` and keep only rows whose full
    /// indicator set is defined and finite.
    pub fn build(bars: &[OhlcvBar]) -> Self {
        let series: Vec<_> = all_indicators()
            .iter()
            .flat_map(|indicator| indicator.calculate(bars))
            .collect();

        let rows = bars
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                if !bar.is_finite() {
                    return None;
                }
                let mut values = [0.0; 15];
                for (slot, column) in values.iter_mut().zip(series.iter()) {
                    *slot = column.get(i).copied().flatten()?;
                }
                Some(IndicatorRow::from_values(*bar, values))
            })
            .collect();

        Self { rows }
    }

    /// Matrix from pre-computed rows (oldest first).
    pub fn from_rows(rows: Vec<IndicatorRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent valid row.
    pub fn latest(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }

    /// Raw feature values, one row per indicator row.
    pub fn to_array(&self) -> Array2<f64> {
        let mut data = Array2::zeros((self.rows.len(), FEATURE_COUNT));
        for (i, row) in self.rows.iter().enumerate() {
            data.row_mut(i).assign(&Array1::from(row.features().to_vec()));
        }
        data
    }

    /// Fail unless at least `lookback` valid rows exist.
    pub fn require_rows(&self, lookback: usize) -> Result<()> {
        if self.rows.len() < lookback {
            return Err(EngineError::InsufficientHistory {
                required: lookback,
                available: self.rows.len(),
            });
        }
        Ok(())
    }

    /// The most recent `lookback` rows, normalized with `scaler`.
    pub fn last_window(&self, lookback: usize, scaler: &MinMaxScaler) -> Result<SequenceWindow> {
        self.require_rows(lookback)?;
        let start = self.rows.len() - lookback;
        let raw = self.to_array().slice(s![start.., ..]).to_owned();
        Ok(SequenceWindow {
            values: scaler.transform(&raw),
            end_timestamp: self.rows[self.rows.len() - 1].bar.timestamp,
        })
    }

    /// Label of every row: compares its close with the close `horizon` rows later.
    /// Rows without enough future data are HOLD.
    pub fn labels(&self, config: LabelConfig) -> Vec<TradeSignal> {
        (0..self.rows.len())
            .map(|t| match self.rows.get(t + config.horizon) {
                Some(future) if config.horizon > 0 => {
                    let change = (future.close() - self.rows[t].close()) / self.rows[t].close();
                    if change > config.threshold {
                        TradeSignal::Buy
                    } else if change < -config.threshold {
                        TradeSignal::Sell
                    } else {
                        TradeSignal::Hold
                    }
                }
                _ => TradeSignal::Hold,
            })
            .collect()
    }

    /// Every overlapping `lookback` window with the label of its final row.
    pub fn labeled_windows(
        &self,
        lookback: usize,
        scaler: &MinMaxScaler,
        config: LabelConfig,
    ) -> Vec<(SequenceWindow, TradeSignal)> {
        if lookback == 0 || self.rows.len() < lookback {
            return Vec::new();
        }

        let normalized = scaler.transform(&self.to_array());
        let labels = self.labels(config);

        (lookback - 1..self.rows.len())
            .map(|end| {
                let window = SequenceWindow {
                    values: normalized.slice(s![end + 1 - lookback..=end, ..]).to_owned(),
                    end_timestamp: self.rows[end].bar.timestamp,
                };
                (window, labels[end])
            })
            .collect()
    }
}

/// Per-column min-max scaling into [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit column minimums and maximums on `data`.
    pub fn fit(data: &Array2<f64>) -> Self {
        let min = data.fold_axis(Axis(0), f64::INFINITY, |&a, &b| a.min(b));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |&a, &b| a.max(b));
        Self {
            min: min.to_vec(),
            max: max.to_vec(),
        }
    }

    pub fn columns(&self) -> usize {
        self.min.len()
    }

    /// Scale each column into [0, 1]. Values outside the fitted range are clipped;
    /// constant columns map to 0.
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut result = data.clone();
        for (j, mut column) in result.axis_iter_mut(Axis(1)).enumerate() {
            let (min, max) = match (self.min.get(j), self.max.get(j)) {
                (Some(min), Some(max)) => (*min, *max),
                _ => continue,
            };
            let range = max - min;
            column.mapv_inplace(|v| {
                if range.abs() < 1e-12 {
                    0.0
                } else {
                    ((v - min) / range).clamp(0.0, 1.0)
                }
            });
        }
        result
    }

    /// Fit on `data` and scale it in one step.
    pub fn fit_transform(data: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(data);
        let scaled = scaler.transform(data);
        (scaler, scaled)
    }
}

/// The most recent `lookback` normalized rows; the sequence classifier's input unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceWindow {
    /// Shape `[lookback, FEATURE_COUNT]`.
    pub values: Array2<f64>,
    /// Timestamp of the final row.
    pub end_timestamp: i64,
}

impl SequenceWindow {
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}

/// Scaled, labeled windows for offline training, with the scaler to persist
/// in the exported artifact.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub scaler: MinMaxScaler,
    pub windows: Vec<(SequenceWindow, TradeSignal)>,
}

impl TrainingSet {
    /// Build from history with the configured lookback, label horizon and threshold.
    pub fn from_bars(bars: &[OhlcvBar], config: &Config) -> Result<Self> {
        let lookback = config.engine.lookback;
        let matrix = FeatureMatrix::build(bars);
        matrix.require_rows(lookback)?;

        let scaler = MinMaxScaler::fit(&matrix.to_array());
        let windows = matrix.labeled_windows(lookback, &scaler, config.labels);
        Ok(Self { scaler, windows })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Number of windows per label.
    pub fn label_count(&self, label: TradeSignal) -> usize {
        self.windows.iter().filter(|(_, l)| *l == label).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{bar, uptrend_bars};

    #[test]
    fn test_warm_up_rows_dropped() {
        let bars = uptrend_bars(100);
        let matrix = FeatureMatrix::build(&bars);
        // MACD signal line is the slowest indicator: first valid row is bar 33
        assert_eq!(matrix.len(), 67);
        assert_eq!(matrix.rows()[0].bar.timestamp, bars[33].timestamp);
        assert_eq!(matrix.latest().unwrap().bar.timestamp, bars[99].timestamp);
    }

    #[test]
    fn test_every_row_has_finite_features() {
        let matrix = FeatureMatrix::build(&uptrend_bars(80));
        for row in matrix.rows() {
            assert!(row.features().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_zero_price_invalidates_rows() {
        let mut bars = uptrend_bars(80);
        // Division by the zero close leaves the next bar without a price change
        bars[78] = bar(78, 0.0);
        let matrix = FeatureMatrix::build(&bars);
        assert_ne!(matrix.latest().unwrap().bar.timestamp, bars[79].timestamp);
    }

    #[test]
    fn test_to_array_shape() {
        let matrix = FeatureMatrix::build(&uptrend_bars(50));
        let array = matrix.to_array();
        assert_eq!(array.shape(), &[17, FEATURE_COUNT]);
    }

    #[test]
    fn test_scaler_maps_into_unit_range() {
        let matrix = FeatureMatrix::build(&uptrend_bars(100));
        let (scaler, scaled) = MinMaxScaler::fit_transform(&matrix.to_array());
        assert_eq!(scaler.columns(), FEATURE_COUNT);
        assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)));
        // Close column rises monotonically: first row 0, last row 1
        assert_eq!(scaled[[0, 3]], 0.0);
        assert_eq!(scaled[[scaled.nrows() - 1, 3]], 1.0);
    }

    #[test]
    fn test_scaler_constant_column_maps_to_zero() {
        let data = Array2::from_shape_vec((3, 1), vec![5.0, 5.0, 5.0]).unwrap();
        let (_, scaled) = MinMaxScaler::fit_transform(&data);
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_persisted_scaler_clips_out_of_range() {
        let scaler = MinMaxScaler {
            min: vec![0.0],
            max: vec![10.0],
        };
        let data = Array2::from_shape_vec((3, 1), vec![-5.0, 5.0, 20.0]).unwrap();
        let scaled = scaler.transform(&data);
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_last_window_shape() {
        let matrix = FeatureMatrix::build(&uptrend_bars(100));
        let scaler = MinMaxScaler::fit(&matrix.to_array());
        let window = matrix.last_window(60, &scaler).unwrap();
        assert_eq!(window.values.shape(), &[60, FEATURE_COUNT]);
        assert_eq!(window.end_timestamp, matrix.latest().unwrap().bar.timestamp);
    }

    #[test]
    fn test_last_window_insufficient_history() {
        let matrix = FeatureMatrix::build(&uptrend_bars(80));
        let scaler = MinMaxScaler::fit(&matrix.to_array());
        match matrix.last_window(60, &scaler) {
            Err(EngineError::InsufficientHistory { required, available }) => {
                assert_eq!(required, 60);
                assert_eq!(available, 47);
            }
            other => panic!("expected InsufficientHistory, got {:?}", other),
        }
    }

    fn row_with_close(i: usize, close: f64) -> IndicatorRow {
        IndicatorRow::from_values(bar(i, close), [0.0; 15])
    }

    #[test]
    fn test_labels_use_horizon_and_threshold() {
        let closes = [100.0, 100.0, 100.0, 100.0, 100.0, 104.0, 96.0, 101.0];
        let rows = closes.iter().enumerate().map(|(i, c)| row_with_close(i, *c)).collect();
        let matrix = FeatureMatrix::from_rows(rows);
        let labels = matrix.labels(LabelConfig {
            horizon: 5,
            threshold: 0.03,
        });
        assert_eq!(labels[0], TradeSignal::Buy); // +4%
        assert_eq!(labels[1], TradeSignal::Sell); // -4%
        assert_eq!(labels[2], TradeSignal::Hold); // +1%
        // Final five rows have no future close
        assert!(labels[3..].iter().all(|l| *l == TradeSignal::Hold));
    }

    #[test]
    fn test_labeled_windows_count_and_alignment() {
        let matrix = FeatureMatrix::build(&uptrend_bars(100));
        let scaler = MinMaxScaler::fit(&matrix.to_array());
        let windows = matrix.labeled_windows(60, &scaler, LabelConfig::default());
        assert_eq!(windows.len(), matrix.len() - 60 + 1);
        let (last, label) = windows.last().unwrap();
        assert_eq!(last.end_timestamp, matrix.latest().unwrap().bar.timestamp);
        assert_eq!(*label, TradeSignal::Hold);
        assert!(windows.iter().all(|(w, _)| w.len() == 60));
    }

    #[test]
    fn test_training_set_follows_config() {
        let bars = uptrend_bars(100);
        let set = TrainingSet::from_bars(&bars, &Config::default()).unwrap();
        assert_eq!(set.len(), 8);
        assert_eq!(set.scaler, MinMaxScaler::fit(&FeatureMatrix::build(&bars).to_array()));
        // Steady 1.5/bar climb clears 3% over five bars for the earliest window
        assert_eq!(set.windows[0].1, TradeSignal::Buy);
        assert_eq!(set.label_count(TradeSignal::Sell), 0);

        let mut config = Config::default();
        config.labels.threshold = 0.5;
        let set = TrainingSet::from_bars(&bars, &config).unwrap();
        assert_eq!(set.label_count(TradeSignal::Hold), set.len());

        config.engine.lookback = 30;
        assert_eq!(TrainingSet::from_bars(&bars, &config).unwrap().len(), 38);
    }

    #[test]
    fn test_training_set_insufficient_history() {
        assert!(matches!(
            TrainingSet::from_bars(&uptrend_bars(80), &Config::default()),
            Err(EngineError::InsufficientHistory {
                required: 60,
                available: 47
            })
        ));
    }
}
