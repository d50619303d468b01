//! Rule-based signal scoring used when no trained classifier is loaded.
//!
//! Five weighted checks over the latest indicator row accumulate independent
//! buy and sell scores (each 0-8):
//!
//! | Check          | Points | Rule                                              |
//! |----------------|--------|---------------------------------------------------|
//! | RSI            | 2      | < 30 buy, > 70 sell, 30-45 buy +1, 55-70 sell +1  |
//! | MACD vs signal | 2      | bullish above zero / bearish below zero, else +1  |
//! | MA stack       | 2      | price > SMA7 > SMA25 (or reverse), else +1        |
//! | Bollinger      | 1      | below lower band buy, above upper band sell       |
//! | Stochastic %K  | 1      | < 20 buy, > 80 sell                               |

use crate::services::signals::features::{FeatureMatrix, IndicatorRow};
use crate::services::signals::predictor::{Prediction, PredictorError, SignalPredictor};
use crate::services::signals::sma_series;
use crate::types::{IndicatorSnapshot, OhlcvBar, Probabilities, TradeSignal};

/// Minimum score gap for a directional call.
const DECISION_GAP: u8 = 2;

/// Accumulated buy and sell points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    pub buy: u8,
    pub sell: u8,
}

impl Scores {
    pub fn gap(&self) -> u8 {
        self.buy.abs_diff(self.sell)
    }
}

/// Score one indicator row.
pub fn score_row(row: &IndicatorRow) -> Scores {
    let mut scores = Scores::default();
    let price = row.close();

    // RSI
    if row.rsi < 30.0 {
        scores.buy += 2;
    } else if row.rsi > 70.0 {
        scores.sell += 2;
    } else if row.rsi <= 45.0 {
        scores.buy += 1;
    } else if row.rsi >= 55.0 {
        scores.sell += 1;
    }

    // MACD vs signal line
    if row.macd > row.macd_signal {
        scores.buy += if row.macd > 0.0 { 2 } else { 1 };
    } else if row.macd < row.macd_signal {
        scores.sell += if row.macd < 0.0 { 2 } else { 1 };
    }

    // Moving-average stack
    if price > row.sma_7 && row.sma_7 > row.sma_25 {
        scores.buy += 2;
    } else if price < row.sma_7 && row.sma_7 < row.sma_25 {
        scores.sell += 2;
    } else if price > row.sma_7 {
        scores.buy += 1;
    } else if price < row.sma_7 {
        scores.sell += 1;
    }

    // Bollinger position
    if price < row.bb_lower {
        scores.buy += 1;
    } else if price > row.bb_upper {
        scores.sell += 1;
    }

    // Stochastic
    if row.stoch_k < 20.0 {
        scores.buy += 1;
    } else if row.stoch_k > 80.0 {
        scores.sell += 1;
    }

    scores
}

/// Signal and confidence (0-100) for a pair of scores.
pub fn decide(scores: Scores) -> (TradeSignal, f64) {
    let gap = scores.gap() as f64;
    if scores.buy >= scores.sell + DECISION_GAP {
        (TradeSignal::Buy, (50.0 + 8.0 * gap).min(85.0))
    } else if scores.sell >= scores.buy + DECISION_GAP {
        (TradeSignal::Sell, (50.0 + 8.0 * gap).min(85.0))
    } else {
        (TradeSignal::Hold, (65.0 - 5.0 * gap).max(50.0))
    }
}

/// Distribution with the winning class carrying `confidence / 100`.
///
/// Directional calls give two thirds of the remainder to HOLD; HOLD splits its
/// remainder 60/40 toward the larger score.
pub fn probabilities_for(signal: TradeSignal, confidence: f64, scores: Scores) -> Probabilities {
    let top = (confidence / 100.0).clamp(0.0, 1.0);
    let rest = 1.0 - top;

    match signal {
        TradeSignal::Buy => Probabilities::normalized(rest / 3.0, rest * 2.0 / 3.0, top),
        TradeSignal::Sell => Probabilities::normalized(top, rest * 2.0 / 3.0, rest / 3.0),
        TradeSignal::Hold => {
            let (buy_share, sell_share) = match scores.buy.cmp(&scores.sell) {
                std::cmp::Ordering::Greater => (0.6, 0.4),
                std::cmp::Ordering::Less => (0.4, 0.6),
                std::cmp::Ordering::Equal => (0.5, 0.5),
            };
            Probabilities::normalized(rest * sell_share, top, rest * buy_share)
        }
    }
}

fn snapshot(row: &IndicatorRow, scores: Scores) -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi: row.rsi,
        macd: row.macd,
        macd_signal: row.macd_signal,
        sma_7: row.sma_7,
        sma_25: row.sma_25,
        stoch_k: row.stoch_k,
        bb_upper: row.bb_upper,
        bb_lower: row.bb_lower,
        buy_score: scores.buy,
        sell_score: scores.sell,
    }
}

/// Full prediction from a single indicator row.
pub fn predict_row(row: &IndicatorRow) -> Prediction {
    let scores = score_row(row);
    let (signal, confidence) = decide(scores);
    Prediction {
        signal,
        confidence,
        probabilities: probabilities_for(signal, confidence, scores),
        indicators: Some(snapshot(row, scores)),
        model_version: HeuristicPredictor::VERSION.to_string(),
        is_mock: true,
    }
}

/// Heuristic scorer over the newest indicator row.
pub struct HeuristicPredictor {
    lookback: usize,
}

impl HeuristicPredictor {
    pub const VERSION: &'static str = "heuristic-v1";

    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }
}

impl SignalPredictor for HeuristicPredictor {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn model_version(&self) -> &str {
        Self::VERSION
    }

    fn is_mock(&self) -> bool {
        true
    }

    fn predict(&self, bars: &[OhlcvBar]) -> Result<Prediction, PredictorError> {
        let newest = bars
            .last()
            .ok_or_else(|| PredictorError::Unavailable("empty series".to_string()))?;
        let matrix = FeatureMatrix::build(bars);
        PredictorError::check_rows(&matrix, self.lookback)?;

        match matrix.latest() {
            Some(row) if row.bar.timestamp == newest.timestamp => Ok(predict_row(row)),
            _ => Err(PredictorError::Unavailable(
                "indicators undefined for the newest bar".to_string(),
            )),
        }
    }
}

/// Minimal SMA7 / SMA25 cross against the raw price.
pub struct MovingAverageCrossPredictor;

impl MovingAverageCrossPredictor {
    pub const VERSION: &'static str = "ma-crossover-v1";
}

impl SignalPredictor for MovingAverageCrossPredictor {
    fn name(&self) -> &str {
        "ma-crossover"
    }

    fn model_version(&self) -> &str {
        Self::VERSION
    }

    fn is_mock(&self) -> bool {
        true
    }

    fn predict(&self, bars: &[OhlcvBar]) -> Result<Prediction, PredictorError> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let last = closes.len().checked_sub(1);
        let averages = last.and_then(|i| {
            let price = closes[i];
            let sma_7 = sma_series(&closes, 7)[i]?;
            let sma_25 = sma_series(&closes, 25)[i]?;
            price.is_finite().then_some((price, sma_7, sma_25))
        });
        let (price, sma_7, sma_25) = averages.ok_or_else(|| {
            PredictorError::Unavailable("moving averages undefined".to_string())
        })?;

        let (signal, confidence, probabilities) = if price > sma_7 && sma_7 > sma_25 {
            (TradeSignal::Buy, 60.0, Probabilities::normalized(0.15, 0.25, 0.60))
        } else if price < sma_7 && sma_7 < sma_25 {
            (TradeSignal::Sell, 60.0, Probabilities::normalized(0.60, 0.25, 0.15))
        } else {
            (TradeSignal::Hold, 50.0, Probabilities::normalized(0.25, 0.50, 0.25))
        };

        Ok(Prediction {
            signal,
            confidence,
            probabilities,
            indicators: None,
            model_version: Self::VERSION.to_string(),
            is_mock: true,
        })
    }
}
