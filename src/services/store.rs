//! SQLite persistence for prediction history.
//!
//! Results are append-only, keyed by `(symbol, predicted_at)`. The audit
//! queries (signal-type counts and confidence trends) read them back.

use crate::error::{EngineError, Result};
use crate::types::{SignalResult, TradeSignal};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// One-way sink for produced signals.
pub trait ResultStore: Send + Sync {
    fn insert(&self, result: &SignalResult) -> Result<()>;
}

/// Signal-type counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
    pub total: usize,
}

/// One point of a confidence trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePoint {
    pub predicted_at: DateTime<Utc>,
    pub signal: TradeSignal,
    pub confidence: f64,
}

/// SQLite result store.
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite result store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite result store initialized");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EngineError::Storage("connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS signal_results (
                symbol TEXT NOT NULL,
                predicted_at TEXT NOT NULL,
                signal TEXT NOT NULL,
                confidence REAL NOT NULL,
                current_price REAL NOT NULL,
                entry_price REAL NOT NULL,
                target_1 REAL NOT NULL,
                target_2 REAL NOT NULL,
                stop_loss REAL NOT NULL,
                timeframe TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                prob_sell REAL NOT NULL,
                prob_hold REAL NOT NULL,
                prob_buy REAL NOT NULL,
                indicators_json TEXT,
                model_version TEXT NOT NULL,
                is_mock INTEGER NOT NULL,
                PRIMARY KEY (symbol, predicted_at)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_signal_results_predicted_at
             ON signal_results(predicted_at DESC)",
            [],
        )?;

        Ok(())
    }

    /// Counts per signal type, for one symbol or across all of them.
    pub fn signal_counts(&self, symbol: Option<&str>) -> Result<SignalCounts> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT signal, COUNT(*) FROM signal_results
             WHERE (?1 IS NULL OR symbol = ?1)
             GROUP BY signal",
        )?;
        let rows = stmt.query_map(params![symbol.map(str::to_uppercase)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = SignalCounts::default();
        for row in rows {
            let (label, count) = row?;
            let count = count.max(0) as usize;
            match TradeSignal::from_label(&label) {
                Some(TradeSignal::Buy) => counts.buy += count,
                Some(TradeSignal::Sell) => counts.sell += count,
                Some(TradeSignal::Hold) => counts.hold += count,
                None => {}
            }
            counts.total += count;
        }
        Ok(counts)
    }

    /// The `limit` most recent confidences for `symbol`, oldest first.
    pub fn confidence_trend(&self, symbol: &str, limit: usize) -> Result<Vec<ConfidencePoint>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT predicted_at, signal, confidence FROM signal_results
             WHERE symbol = ?1
             ORDER BY predicted_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![symbol.to_uppercase(), limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (predicted_at, signal, confidence) = row?;
            let predicted_at = DateTime::parse_from_rfc3339(&predicted_at)
                .map_err(|e| EngineError::Storage(format!("bad timestamp '{}': {}", predicted_at, e)))?
                .with_timezone(&Utc);
            let signal = TradeSignal::from_label(&signal)
                .ok_or_else(|| EngineError::Storage(format!("bad signal label '{}'", signal)))?;
            points.push(ConfidencePoint {
                predicted_at,
                signal,
                confidence,
            });
        }
        points.reverse();
        Ok(points)
    }

    /// Total stored results.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM signal_results", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

impl ResultStore for SqliteResultStore {
    fn insert(&self, result: &SignalResult) -> Result<()> {
        let indicators_json = result
            .indicators
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let timeframe = serde_json::to_value(result.timeframe)?;
        let risk_level = serde_json::to_value(result.risk_level)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO signal_results (
                symbol, predicted_at, signal, confidence, current_price,
                entry_price, target_1, target_2, stop_loss, timeframe, risk_level,
                prob_sell, prob_hold, prob_buy, indicators_json, model_version, is_mock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                result.symbol.to_uppercase(),
                result.predicted_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                result.signal.label(),
                result.confidence,
                result.current_price,
                result.entry_price,
                result.target_1,
                result.target_2,
                result.stop_loss,
                timeframe.as_str().unwrap_or_default(),
                risk_level.as_str().unwrap_or_default(),
                result.probabilities.sell,
                result.probabilities.hold,
                result.probabilities.buy,
                indicators_json,
                result.model_version,
                result.is_mock,
            ],
        )?;

        debug!("Stored {} signal for {}", result.signal, result.symbol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Probabilities, RiskLevel, TimeframeBand};
    use chrono::Duration;

    fn result(symbol: &str, signal: TradeSignal, confidence: f64, offset_secs: i64) -> SignalResult {
        SignalResult {
            symbol: symbol.to_string(),
            signal,
            confidence,
            current_price: 100.0,
            entry_price: 99.0,
            target_1: 105.0,
            target_2: 108.0,
            stop_loss: 96.0,
            timeframe: TimeframeBand::from_confidence(confidence),
            risk_level: RiskLevel::classify(signal, confidence),
            probabilities: Probabilities::normalized(0.2, 0.3, 0.5),
            indicators: None,
            predicted_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
                + Duration::seconds(offset_secs),
            model_version: "heuristic-v1".to_string(),
            is_mock: true,
        }
    }

    #[test]
    fn test_insert_and_count() {
        let store = SqliteResultStore::new_in_memory().unwrap();
        store.insert(&result("BTC", TradeSignal::Buy, 70.0, 0)).unwrap();
        store.insert(&result("BTC", TradeSignal::Hold, 60.0, 1)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let store = SqliteResultStore::new_in_memory().unwrap();
        store.insert(&result("BTC", TradeSignal::Buy, 70.0, 0)).unwrap();
        assert!(store.insert(&result("BTC", TradeSignal::Sell, 70.0, 0)).is_err());
        // Same instant, other symbol
        store.insert(&result("ETH", TradeSignal::Sell, 70.0, 0)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_signal_counts() {
        let store = SqliteResultStore::new_in_memory().unwrap();
        store.insert(&result("BTC", TradeSignal::Buy, 70.0, 0)).unwrap();
        store.insert(&result("BTC", TradeSignal::Buy, 75.0, 1)).unwrap();
        store.insert(&result("BTC", TradeSignal::Sell, 66.0, 2)).unwrap();
        store.insert(&result("ETH", TradeSignal::Hold, 65.0, 0)).unwrap();

        let btc = store.signal_counts(Some("btc")).unwrap();
        assert_eq!(
            btc,
            SignalCounts {
                buy: 2,
                sell: 1,
                hold: 0,
                total: 3
            }
        );

        let all = store.signal_counts(None).unwrap();
        assert_eq!(all.hold, 1);
        assert_eq!(all.total, 4);
    }

    #[test]
    fn test_confidence_trend_is_recent_and_ordered() {
        let store = SqliteResultStore::new_in_memory().unwrap();
        for i in 0..5 {
            store
                .insert(&result("BTC", TradeSignal::Buy, 60.0 + i as f64, i))
                .unwrap();
        }

        let trend = store.confidence_trend("BTC", 3).unwrap();
        let confidences: Vec<f64> = trend.iter().map(|p| p.confidence).collect();
        assert_eq!(confidences, vec![62.0, 63.0, 64.0]);
        assert!(trend[0].predicted_at < trend[2].predicted_at);
    }

    #[test]
    fn test_indicators_persisted_as_json() {
        let store = SqliteResultStore::new_in_memory().unwrap();
        let mut stored = result("BTC", TradeSignal::Hold, 65.0, 0);
        stored.indicators = Some(crate::types::IndicatorSnapshot {
            rsi: 50.0,
            macd: 0.0,
            macd_signal: 0.0,
            sma_7: 100.0,
            sma_25: 100.0,
            stoch_k: 50.0,
            bb_upper: 105.0,
            bb_lower: 95.0,
            buy_score: 0,
            sell_score: 0,
        });
        store.insert(&stored).unwrap();

        let conn = store.lock().unwrap();
        let json: String = conn
            .query_row("SELECT indicators_json FROM signal_results", [], |row| row.get(0))
            .unwrap();
        assert!(json.contains("\"buy_score\":0"));
    }
}
