//! Interchangeable signal predictors and the ordered fallback chain.

use crate::error::{EngineError, Result};
use crate::services::signals::features::FeatureMatrix;
use crate::services::signals::heuristic::{HeuristicPredictor, MovingAverageCrossPredictor};
use crate::services::signals::model::SequenceClassifier;
use crate::types::{IndicatorSnapshot, OhlcvBar, Probabilities, TradeSignal};
use thiserror::Error;
use tracing::{debug, warn};

/// Output of a single predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub signal: TradeSignal,
    /// Confidence (0-100).
    pub confidence: f64,
    pub probabilities: Probabilities,
    pub indicators: Option<IndicatorSnapshot>,
    pub model_version: String,
    pub is_mock: bool,
}

/// Why a predictor could not produce a signal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    /// Not enough valid rows; fatal for the whole chain.
    #[error("Insufficient history: {available} valid rows, need {required}")]
    InsufficientHistory { required: usize, available: usize },

    /// This predictor cannot interpret the series; the next one is tried.
    #[error("{0}")]
    Unavailable(String),
}

impl PredictorError {
    pub(crate) fn check_rows(matrix: &FeatureMatrix, lookback: usize) -> std::result::Result<(), Self> {
        matrix.require_rows(lookback).map_err(|e| match e {
            EngineError::InsufficientHistory { required, available } => {
                PredictorError::InsufficientHistory { required, available }
            }
            other => PredictorError::Unavailable(other.to_string()),
        })
    }
}

/// A source of trading signals for an OHLCV history (oldest first).
pub trait SignalPredictor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Version string reported in results.
    fn model_version(&self) -> &str;

    /// Whether results are produced without a trained model.
    fn is_mock(&self) -> bool;

    fn predict(&self, bars: &[OhlcvBar]) -> std::result::Result<Prediction, PredictorError>;
}

/// Trained path: one normalized window through the sequence classifier.
pub struct SequencePredictor {
    classifier: SequenceClassifier,
}

impl SequencePredictor {
    pub fn new(classifier: SequenceClassifier) -> Self {
        Self { classifier }
    }
}

impl SignalPredictor for SequencePredictor {
    fn name(&self) -> &str {
        "sequence"
    }

    fn model_version(&self) -> &str {
        self.classifier.version()
    }

    fn is_mock(&self) -> bool {
        false
    }

    fn predict(&self, bars: &[OhlcvBar]) -> std::result::Result<Prediction, PredictorError> {
        let matrix = FeatureMatrix::build(bars);
        let lookback = self.classifier.lookback();
        PredictorError::check_rows(&matrix, lookback)?;

        let window = matrix
            .last_window(lookback, self.classifier.scaler())
            .map_err(|e| PredictorError::Unavailable(e.to_string()))?;
        let probabilities = self
            .classifier
            .classify(&window)
            .map_err(|e| PredictorError::Unavailable(e.to_string()))?;

        let signal = probabilities.argmax();
        Ok(Prediction {
            signal,
            confidence: (probabilities.get(signal) * 100.0).clamp(0.0, 100.0),
            probabilities,
            indicators: None,
            model_version: self.model_version().to_string(),
            is_mock: false,
        })
    }
}

/// Ordered list of predictors, tried in sequence.
pub struct PredictorChain {
    predictors: Vec<Box<dyn SignalPredictor>>,
}

impl PredictorChain {
    pub fn new(predictors: Vec<Box<dyn SignalPredictor>>) -> Self {
        Self { predictors }
    }

    /// Chain for a loaded classifier.
    pub fn trained(classifier: SequenceClassifier) -> Self {
        Self::new(vec![Box::new(SequencePredictor::new(classifier))])
    }

    /// Heuristic scorer backed by the moving-average cross.
    pub fn heuristic(lookback: usize) -> Self {
        Self::new(vec![
            Box::new(HeuristicPredictor::new(lookback)),
            Box::new(MovingAverageCrossPredictor),
        ])
    }

    /// The predictor tried first.
    pub fn primary(&self) -> Option<&dyn SignalPredictor> {
        self.predictors.first().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    /// First prediction any predictor produces.
    pub fn predict(&self, bars: &[OhlcvBar]) -> Result<Prediction> {
        for predictor in &self.predictors {
            match predictor.predict(bars) {
                Ok(prediction) => {
                    debug!(
                        "{} predicted {} ({:.1}%)",
                        predictor.name(),
                        prediction.signal,
                        prediction.confidence
                    );
                    return Ok(prediction);
                }
                Err(PredictorError::InsufficientHistory { required, available }) => {
                    return Err(EngineError::InsufficientHistory { required, available });
                }
                Err(PredictorError::Unavailable(reason)) => {
                    warn!("{} predictor unavailable: {}", predictor.name(), reason);
                }
            }
        }

        Err(EngineError::MarketDataUnavailable(
            "series could not be interpreted".to_string(),
        ))
    }
}
