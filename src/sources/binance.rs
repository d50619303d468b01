use crate::error::{EngineError, Result};
use crate::sources::MarketDataProvider;
use crate::types::OhlcvBar;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_URL: &str = "https://api.binance.com/api/v3";

/// Binance REST client for historical klines.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a new Binance client.
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Omen/1.0")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// `BTC/USDT` -> `BTCUSDT`.
    pub fn market_symbol(pair: &str) -> String {
        pair.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase()
    }

    async fn fetch_klines(&self, pair: &str, timeframe: &str, limit: usize) -> Result<Vec<OhlcvBar>> {
        let url = format!("{}/klines", self.base_url);
        let symbol = Self::market_symbol(pair);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol.as_str()),
                ("interval", timeframe),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::MarketDataUnavailable(format!("Binance request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                "Binance API returned {}: {}",
                status,
                preview(&text)
            );
            return Err(EngineError::MarketDataUnavailable(format!(
                "Binance API error: {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            EngineError::MarketDataUnavailable(format!("Binance response unreadable: {}", e))
        })?;
        let bars = parse_body(&body)?;
        debug!("Binance returned {} {} bars for {}", bars.len(), timeframe, symbol);
        Ok(bars)
    }
}

impl MarketDataProvider for BinanceClient {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_ohlcv(&self, pair: &str, timeframe: &str, limit: usize) -> Result<Vec<OhlcvBar>> {
        self.fetch_klines(pair, timeframe, limit).await
    }
}

/// First 200 characters of a response body, for logs.
fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn parse_row(row: &[Value]) -> Option<OhlcvBar> {
    Some(OhlcvBar {
        timestamp: row.first()?.as_i64()?,
        open: number(row.get(1))?,
        high: number(row.get(2))?,
        low: number(row.get(3))?,
        close: number(row.get(4))?,
        volume: number(row.get(5))?,
    })
}

/// Parse a klines response body. Anything but an array of arrays is malformed.
pub fn parse_body(body: &str) -> Result<Vec<OhlcvBar>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body).map_err(|e| {
        EngineError::MarketDataUnavailable(format!("malformed Binance payload: {}", e))
    })?;
    parse_klines(&rows)
}

/// Parse kline rows: `[open_time, "open", "high", "low", "close", "volume", ...]`.
pub fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<OhlcvBar>> {
    if rows.is_empty() {
        return Err(EngineError::MarketDataUnavailable(
            "Binance returned no klines".to_string(),
        ));
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            parse_row(row).ok_or_else(|| {
                EngineError::MarketDataUnavailable(format!("malformed kline at row {}", i))
            })
        })
        .collect()
}
