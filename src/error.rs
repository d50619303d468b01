use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient history: {available} valid rows, need {required}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InsufficientHistory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::MarketDataUnavailable(_) => StatusCode::BAD_GATEWAY,
            EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::Storage(_) | EngineError::SerdeJson(_) | EngineError::Sqlite(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
