//! Per-request prediction pipeline: fetch, validate, predict, derive levels.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::services::signals::levels::calculate_levels;
use crate::services::signals::model::SequenceClassifier;
use crate::services::signals::predictor::PredictorChain;
use crate::sources::MarketDataProvider;
use crate::types::{trading_pair, OhlcvBar, SignalResult};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};

/// Longest accepted symbol.
const MAX_SYMBOL_LEN: usize = 20;

/// Signal engine over one market data provider.
///
/// The predictor chain is chosen once at construction and never changes; a
/// loaded classifier is shared read-only by every request.
pub struct SignalEngine<P: MarketDataProvider> {
    provider: P,
    config: EngineConfig,
    chain: PredictorChain,
}

impl<P: MarketDataProvider> SignalEngine<P> {
    /// Create an engine. Without a classifier the heuristic scorer is used.
    pub fn new(provider: P, config: EngineConfig, model: Option<SequenceClassifier>) -> Self {
        let chain = match model {
            Some(classifier) => {
                info!(
                    "Using sequence classifier {} (lookback {})",
                    classifier.version(),
                    classifier.lookback()
                );
                PredictorChain::trained(classifier)
            }
            None => {
                info!("No trained classifier loaded, using heuristic scoring");
                PredictorChain::heuristic(config.lookback)
            }
        };

        Self {
            provider,
            config,
            chain,
        }
    }

    /// Create an engine, loading the classifier artifact at `model_path` if given.
    /// A missing or corrupt artifact selects the heuristic scorer.
    pub fn from_model_path(provider: P, config: EngineConfig, model_path: Option<&Path>) -> Self {
        let model = model_path.and_then(|path| match SequenceClassifier::load(path) {
            Ok(classifier) => Some(classifier),
            Err(e) => {
                warn!("Failed to load classifier from {}: {}", path.display(), e);
                None
            }
        });
        Self::new(provider, config, model)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether a trained classifier backs predictions.
    pub fn is_trained(&self) -> bool {
        self.chain.primary().map(|p| !p.is_mock()).unwrap_or(false)
    }

    /// Name of the predictor selected at start-up.
    pub fn predictor_name(&self) -> &str {
        self.chain.primary().map(|p| p.name()).unwrap_or("none")
    }

    /// Fetch history for `symbol` and produce a signal.
    pub async fn predict_signal(&self, symbol: &str) -> Result<SignalResult> {
        let symbol = normalize_symbol(symbol)?;
        let pair = trading_pair(&symbol, &self.config.quote);

        debug!(
            "Fetching {} {} bars for {} from {}",
            self.config.fetch_limit,
            self.config.timeframe,
            pair,
            self.provider.name()
        );
        let bars = self
            .provider
            .fetch_ohlcv(&pair, &self.config.timeframe, self.config.fetch_limit)
            .await?;
        debug!("Fetched {} bars for {}", bars.len(), pair);

        self.predict_from_bars(&symbol, &bars)
    }

    /// Produce a signal from caller-supplied history (oldest first). No I/O.
    pub fn predict_from_bars(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<SignalResult> {
        let current_price = validate_bars(bars, self.config.min_history())?;
        let prediction = self.chain.predict(bars)?;
        let levels = calculate_levels(prediction.signal, current_price, prediction.confidence);

        info!(
            "{}: {} ({:.1}%) via {}",
            symbol, prediction.signal, prediction.confidence, prediction.model_version
        );

        Ok(SignalResult {
            symbol: symbol.to_string(),
            signal: prediction.signal,
            confidence: prediction.confidence,
            current_price,
            entry_price: levels.entry_price,
            target_1: levels.target_1,
            target_2: levels.target_2,
            stop_loss: levels.stop_loss,
            timeframe: levels.timeframe,
            risk_level: levels.risk_level,
            probabilities: prediction.probabilities,
            indicators: prediction.indicators,
            predicted_at: Utc::now(),
            model_version: prediction.model_version,
            is_mock: prediction.is_mock,
        })
    }
}

/// Trim and uppercase a ticker symbol; reject anything but 1-20 ASCII alphanumerics.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty()
        || symbol.len() > MAX_SYMBOL_LEN
        || !symbol.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(EngineError::BadRequest(format!("invalid symbol '{}'", symbol)));
    }
    Ok(symbol)
}

/// Check a fetched series and return the newest close.
///
/// Empty, non-finite or out-of-order series are malformed. Fewer than
/// `min_history` bars (lookback plus warm-up) can never yield a window.
/// Non-positive prices or negative volume are malformed.
pub fn validate_bars(bars: &[OhlcvBar], min_history: usize) -> Result<f64> {
    let newest = bars
        .last()
        .ok_or_else(|| EngineError::MarketDataUnavailable("empty series".to_string()))?;

    if let Some(i) = bars.iter().position(|b| !b.is_finite()) {
        return Err(EngineError::MarketDataUnavailable(format!(
            "non-finite values in bar {}",
            i
        )));
    }
    if bars.windows(2).any(|w| w[1].timestamp <= w[0].timestamp) {
        return Err(EngineError::MarketDataUnavailable(
            "timestamps are not strictly increasing".to_string(),
        ));
    }
    if bars.len() < min_history {
        return Err(EngineError::InsufficientHistory {
            required: min_history,
            available: bars.len(),
        });
    }
    if let Some(i) = bars.iter().position(|b| !b.has_valid_prices()) {
        return Err(EngineError::MarketDataUnavailable(format!(
            "non-positive price or negative volume in bar {}",
            i
        )));
    }

    Ok(newest.close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{bar, uptrend_bars};
    use crate::services::signals::model::ModelArtifact;
    use crate::services::signals::MinMaxScaler;
    use crate::sources::StaticProvider;
    use crate::types::{RiskLevel, TradeSignal};

    fn engine() -> SignalEngine<StaticProvider> {
        SignalEngine::new(StaticProvider::new(), EngineConfig::default(), None)
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" btc ").unwrap(), "BTC");
        assert!(normalize_symbol("").is_err());
        assert!(normalize_symbol("BTC/USDT").is_err());
        assert!(normalize_symbol(&"X".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_series() {
        assert!(matches!(
            validate_bars(&[], 93),
            Err(EngineError::MarketDataUnavailable(_))
        ));

        let mut bars = uptrend_bars(100);
        bars[10].volume = f64::NAN;
        assert!(matches!(
            validate_bars(&bars, 93),
            Err(EngineError::MarketDataUnavailable(_))
        ));

        let mut bars = uptrend_bars(100);
        bars.swap(3, 4);
        assert!(matches!(
            validate_bars(&bars, 93),
            Err(EngineError::MarketDataUnavailable(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_prices() {
        let mut bars = uptrend_bars(100);
        bars[99] = bar(99, 0.0);
        assert!(matches!(
            validate_bars(&bars, 93),
            Err(EngineError::MarketDataUnavailable(_))
        ));

        let mut bars = uptrend_bars(100);
        bars[40].low = -1.0;
        assert!(matches!(
            validate_bars(&bars, 93),
            Err(EngineError::MarketDataUnavailable(_))
        ));

        let mut bars = uptrend_bars(100);
        bars[7].volume = -5.0;
        assert!(matches!(
            validate_bars(&bars, 93),
            Err(EngineError::MarketDataUnavailable(_))
        ));

        let mut bars = uptrend_bars(100);
        bars[50].volume = 0.0;
        assert_eq!(validate_bars(&bars, 93).unwrap(), bars[99].close);
    }

    #[test]
    fn test_validate_short_series() {
        assert!(matches!(
            validate_bars(&uptrend_bars(92), 93),
            Err(EngineError::InsufficientHistory {
                required: 93,
                available: 92
            })
        ));
        assert!(validate_bars(&uptrend_bars(93), 93).is_ok());
    }

    #[test]
    fn test_heuristic_selected_without_model() {
        let engine = engine();
        assert!(!engine.is_trained());
        assert_eq!(engine.predictor_name(), "heuristic");
    }

    #[test]
    fn test_missing_artifact_falls_back() {
        let engine = SignalEngine::from_model_path(
            StaticProvider::new(),
            EngineConfig::default(),
            Some(Path::new("/nonexistent/omen/model.json")),
        );
        assert!(!engine.is_trained());
    }

    #[test]
    fn test_predict_from_bars_heuristic() {
        let bars = uptrend_bars(100);
        let result = engine().predict_from_bars("BTC", &bars).unwrap();

        assert_eq!(result.symbol, "BTC");
        assert_eq!(result.current_price, bars[99].close);
        assert!(result.is_mock);
        assert_eq!(result.model_version, "heuristic-v1");
        assert!(result.indicators.is_some());
        assert!((result.probabilities.sum() - 1.0).abs() < 1e-9);
        if result.signal == TradeSignal::Hold {
            assert_eq!(result.entry_price, result.current_price);
            assert_eq!(result.risk_level, RiskLevel::Low);
        }
    }

    #[test]
    fn test_length_checked_against_warm_up() {
        let result = engine().predict_from_bars("BTC", &uptrend_bars(80));
        assert!(matches!(
            result,
            Err(EngineError::InsufficientHistory {
                required: 93,
                available: 80
            })
        ));
    }

    #[test]
    fn test_short_series_with_broken_newest_row() {
        // Too short for the warm-up: never reaches the moving-average cross
        let mut bars = uptrend_bars(70);
        bars[68] = bar(68, 0.0);
        assert!(matches!(
            engine().predict_from_bars("BTC", &bars),
            Err(EngineError::InsufficientHistory {
                required: 93,
                available: 70
            })
        ));
    }

    #[test]
    fn test_insufficient_valid_rows() {
        // Understated warm-up: the length check passes, 52 valid rows remain
        let config = EngineConfig {
            warm_up: 20,
            ..EngineConfig::default()
        };
        let engine = SignalEngine::new(StaticProvider::new(), config, None);
        let result = engine.predict_from_bars("BTC", &uptrend_bars(85));
        assert!(matches!(
            result,
            Err(EngineError::InsufficientHistory {
                required: 60,
                available: 52
            })
        ));
    }

    #[test]
    fn test_degrades_to_moving_average_cross() {
        // Spike overflows the Bollinger width for the newest rows
        let mut bars = uptrend_bars(100);
        bars[98] = bar(98, 1e300);
        let result = engine().predict_from_bars("BTC", &bars).unwrap();
        assert_eq!(result.model_version, "ma-crossover-v1");
        assert!(result.indicators.is_none());
        assert!(result.current_price > 0.0);
    }

    #[test]
    fn test_trained_path() {
        let scaler = MinMaxScaler {
            min: vec![0.0; 20],
            max: vec![1000.0; 20],
        };
        let mut artifact = ModelArtifact::zeroed("lstm-test", 60, &[8, 4, 2], 4, scaler);
        artifact.output.bias = ndarray::Array1::from(vec![2.0, 0.0, 0.0]);
        let model = SequenceClassifier::new(artifact).unwrap();
        let engine = SignalEngine::new(StaticProvider::new(), EngineConfig::default(), Some(model));

        assert!(engine.is_trained());
        assert_eq!(engine.predictor_name(), "sequence");

        let result = engine.predict_from_bars("ETH", &uptrend_bars(100)).unwrap();
        assert_eq!(result.signal, TradeSignal::Sell);
        assert!(!result.is_mock);
        assert_eq!(result.model_version, "lstm-test");
        assert!(result.indicators.is_none());
        assert!((result.confidence - result.probabilities.sell * 100.0).abs() < 1e-9);
        assert!(result.stop_loss > result.current_price);
    }

    #[tokio::test]
    async fn test_predict_signal_fetches_pair() {
        let provider = StaticProvider::new().with_series("SOL/USDT", uptrend_bars(150));
        let engine = SignalEngine::new(provider, EngineConfig::default(), None);
        let result = engine.predict_signal("sol").await.unwrap();
        assert_eq!(result.symbol, "SOL");
        // Only the most recent fetch_limit bars are used
        assert_eq!(result.current_price, uptrend_bars(150)[149].close);
    }

    #[tokio::test]
    async fn test_predict_signal_unknown_pair() {
        let result = engine().predict_signal("DOGE").await;
        assert!(matches!(result, Err(EngineError::MarketDataUnavailable(_))));
    }
}
