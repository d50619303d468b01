use std::env;
use std::path::PathBuf;

/// Prediction pipeline settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rows per sequence window.
    pub lookback: usize,
    /// Leading bars without a full indicator set. The MACD signal line is the
    /// slowest: 26-period EMA plus a 9-period EMA of that line.
    pub warm_up: usize,
    /// Bars requested from the market data provider.
    pub fetch_limit: usize,
    /// Quote currency of the requested pair.
    pub quote: String,
    /// Bar interval requested from the provider.
    pub timeframe: String,
}

impl EngineConfig {
    /// Bars needed to produce `lookback` valid feature rows.
    pub fn min_history(&self) -> usize {
        self.lookback + self.warm_up
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            warm_up: 33,
            fetch_limit: 100,
            quote: "USDT".to_string(),
            timeframe: "1d".to_string(),
        }
    }
}

/// Training label settings.
#[derive(Debug, Clone, Copy)]
pub struct LabelConfig {
    /// Periods ahead compared against the window's last close.
    pub horizon: usize,
    /// Fractional change that separates BUY/SELL from HOLD (0.03 = 3%).
    pub threshold: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            threshold: 0.03,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Binance REST base URL.
    pub binance_api_url: String,
    /// Timeout for the market data fetch (seconds).
    pub fetch_timeout_secs: u64,
    /// Trained classifier artifact. Heuristic scoring is used when absent.
    pub model_path: Option<PathBuf>,
    /// SQLite database for prediction history. Nothing is persisted when absent.
    pub results_db_path: Option<PathBuf>,
    pub engine: EngineConfig,
    pub labels: LabelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            binance_api_url: "https://api.binance.com/api/v3".to_string(),
            fetch_timeout_secs: 10,
            model_path: None,
            results_db_path: None,
            engine: EngineConfig::default(),
            labels: LabelConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let engine = EngineConfig {
            lookback: env_parse("LOOKBACK").unwrap_or(defaults.engine.lookback),
            warm_up: env_parse("WARM_UP").unwrap_or(defaults.engine.warm_up),
            fetch_limit: env_parse("FETCH_LIMIT").unwrap_or(defaults.engine.fetch_limit),
            quote: env::var("QUOTE_CURRENCY").unwrap_or(defaults.engine.quote),
            timeframe: env::var("MARKET_TIMEFRAME").unwrap_or(defaults.engine.timeframe),
        };

        let labels = LabelConfig {
            horizon: env_parse("LABEL_HORIZON").unwrap_or(defaults.labels.horizon),
            threshold: env_parse("LABEL_THRESHOLD").unwrap_or(defaults.labels.threshold),
        };

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            binance_api_url: env::var("BINANCE_API_URL").unwrap_or(defaults.binance_api_url),
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch_timeout_secs),
            model_path: env::var("MODEL_PATH").ok().filter(|p| !p.is_empty()).map(PathBuf::from),
            results_db_path: env::var("RESULTS_DB_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            engine,
            labels,
        }
    }
}
