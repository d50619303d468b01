use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete trading recommendation.
///
/// Class indices follow the classifier output order: SELL=0, HOLD=1, BUY=2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSignal {
    Sell,
    Hold,
    Buy,
}

impl TradeSignal {
    /// All classes in output order.
    pub const ALL: [TradeSignal; 3] = [TradeSignal::Sell, TradeSignal::Hold, TradeSignal::Buy];

    /// Class index in the classifier output.
    pub fn index(&self) -> usize {
        match self {
            TradeSignal::Sell => 0,
            TradeSignal::Hold => 1,
            TradeSignal::Buy => 2,
        }
    }

    /// Class for a classifier output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse from the wire label.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SELL" => Some(Self::Sell),
            "HOLD" => Some(Self::Hold),
            "BUY" => Some(Self::Buy),
            _ => None,
        }
    }

    /// Wire label.
    pub fn label(&self) -> &'static str {
        match self {
            TradeSignal::Sell => "SELL",
            TradeSignal::Hold => "HOLD",
            TradeSignal::Buy => "BUY",
        }
    }
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Expected holding band derived from confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeframeBand {
    /// 1-3 periods.
    Short,
    /// 3-7 periods.
    Mid,
    /// 7+ periods.
    Long,
}

impl TimeframeBand {
    /// Band for a confidence value (0-100).
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 80.0 {
            TimeframeBand::Short
        } else if confidence >= 60.0 {
            TimeframeBand::Mid
        } else {
            TimeframeBand::Long
        }
    }

    /// Human-readable period range.
    pub fn periods(&self) -> &'static str {
        match self {
            TimeframeBand::Short => "1-3",
            TimeframeBand::Mid => "3-7",
            TimeframeBand::Long => "7+",
        }
    }
}

/// Risk band of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// HOLD is always low risk; directional calls are medium only with high confidence.
    pub fn classify(signal: TradeSignal, confidence: f64) -> Self {
        match signal {
            TradeSignal::Hold => RiskLevel::Low,
            _ if confidence >= 75.0 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// Class probability distribution, serialized as a `{SELL, HOLD, BUY}` map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    #[serde(rename = "SELL")]
    pub sell: f64,
    #[serde(rename = "HOLD")]
    pub hold: f64,
    #[serde(rename = "BUY")]
    pub buy: f64,
}

impl Probabilities {
    /// Build from raw (non-negative) masses, rescaled so they sum to 1.
    ///
    /// A zero or non-finite total yields a uniform distribution.
    pub fn normalized(sell: f64, hold: f64, buy: f64) -> Self {
        let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let (sell, hold, buy) = (clean(sell), clean(hold), clean(buy));
        let total = sell + hold + buy;
        if total <= 0.0 {
            let third = 1.0 / 3.0;
            return Self {
                sell: third,
                hold: third,
                buy: third,
            };
        }
        Self {
            sell: sell / total,
            hold: hold / total,
            buy: buy / total,
        }
    }

    /// Build from a classifier output vector ordered SELL, HOLD, BUY.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [sell, hold, buy] => Some(Self::normalized(*sell, *hold, *buy)),
            _ => None,
        }
    }

    /// Probability of one class.
    pub fn get(&self, signal: TradeSignal) -> f64 {
        match signal {
            TradeSignal::Sell => self.sell,
            TradeSignal::Hold => self.hold,
            TradeSignal::Buy => self.buy,
        }
    }

    /// Class with the largest probability. Ties resolve toward HOLD, then SELL.
    pub fn argmax(&self) -> TradeSignal {
        let mut best = TradeSignal::Hold;
        for signal in [TradeSignal::Sell, TradeSignal::Buy] {
            if self.get(signal) > self.get(best) {
                best = signal;
            }
        }
        best
    }

    pub fn sum(&self) -> f64 {
        self.sell + self.hold + self.buy
    }
}

/// Diagnostic indicator values reported by the heuristic scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub sma_7: f64,
    pub sma_25: f64,
    pub stoch_k: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub buy_score: u8,
    pub sell_score: u8,
}

/// Concrete price levels and bands derived from a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingLevels {
    pub entry_price: f64,
    pub target_1: f64,
    pub target_2: f64,
    pub stop_loss: f64,
    pub timeframe: TimeframeBand,
    pub risk_level: RiskLevel,
}

/// Final output of one prediction request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub symbol: String,
    pub signal: TradeSignal,
    /// Confidence (0-100).
    pub confidence: f64,
    pub current_price: f64,
    pub entry_price: f64,
    pub target_1: f64,
    pub target_2: f64,
    pub stop_loss: f64,
    pub timeframe: TimeframeBand,
    pub risk_level: RiskLevel,
    pub probabilities: Probabilities,
    /// Present only when the heuristic scorer produced the signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicators: Option<IndicatorSnapshot>,
    pub predicted_at: DateTime<Utc>,
    pub model_version: String,
    pub is_mock: bool,
}
