//! Trading level calculation.

use crate::types::{RiskLevel, TimeframeBand, TradeSignal, TradingLevels};

/// Percentage offsets from the current price for one signal direction.
struct LevelOffsets {
    entry: f64,
    target_1: f64,
    target_2: f64,
    stop: f64,
}

impl LevelOffsets {
    fn for_signal(signal: TradeSignal) -> Self {
        match signal {
            TradeSignal::Buy => Self {
                entry: -0.01,
                target_1: 0.05,
                target_2: 0.08,
                stop: -0.04,
            },
            TradeSignal::Sell => Self {
                entry: 0.01,
                target_1: -0.05,
                target_2: -0.08,
                stop: 0.04,
            },
            TradeSignal::Hold => Self {
                entry: 0.0,
                target_1: 0.02,
                target_2: 0.03,
                stop: -0.02,
            },
        }
    }
}

/// Derive entry, targets, stop loss, timeframe band and risk level.
///
/// BUY targets sit above the price with the stop below; SELL mirrors that.
pub fn calculate_levels(signal: TradeSignal, price: f64, confidence: f64) -> TradingLevels {
    let offsets = LevelOffsets::for_signal(signal);
    let at = |pct: f64| price * (1.0 + pct);

    TradingLevels {
        entry_price: at(offsets.entry),
        target_1: at(offsets.target_1),
        target_2: at(offsets.target_2),
        stop_loss: at(offsets.stop),
        timeframe: TimeframeBand::from_confidence(confidence),
        risk_level: RiskLevel::classify(signal, confidence),
    }
}
