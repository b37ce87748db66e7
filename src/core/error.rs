//! Error types for the cost model

use thiserror::Error;

/// Errors raised by the rate table, converter, aggregator and chart pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BudgetError {
    #[error("Currency unavailable: {}", .0.join(", "))]
    CurrencyUnavailable(Vec<String>),

    #[error("Invalid rate for {code}: {reason}")]
    InvalidRate { code: String, reason: String },

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),

    #[error("Failed to fetch rates for base {base}: {reason}")]
    RefreshTransport { base: String, reason: String },

    #[error("Rate supplier returned no usable rates for base {base}")]
    EmptyRateBatch { base: String },

    #[error("Invalid trip {trip_id}: {reason}")]
    InvalidTrip { trip_id: u64, reason: String },

    #[error("Rate store error: {0}")]
    Store(String),

    #[error("Amount overflow: {0}")]
    AmountOverflow(String),
}

impl BudgetError {
    /// Codes named by a `CurrencyUnavailable` error, empty for other kinds.
    pub fn missing_currencies(&self) -> &[String] {
        match self {
            BudgetError::CurrencyUnavailable(codes) => codes,
            _ => &[],
        }
    }
}

/// Result type alias for cost model operations
pub type Result<T> = std::result::Result<T, BudgetError>;
