use thiserror::Error;

/// Validation and contract errors exposed by `netflow-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("timestamp out of range: {millis}ms since epoch")]
    TimestampOutOfRange { millis: i64 },
    #[error("utc offset must look like +08:00 or -05:30: '{value}'")]
    InvalidUtcOffset { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' is not a decimal number: '{value}'")]
    InvalidDecimal { field: &'static str, value: String },

    #[error("candle high must be >= low")]
    InvalidCandleRange,
    #[error("candle open/close must be within high/low range")]
    InvalidCandleBounds,
    #[error("taker-buy quote volume {taker_buy} exceeds quote volume {quote}")]
    InvalidTakerVolume { taker_buy: String, quote: String },

    #[error("indicator window '{name}' must be greater than zero")]
    EmptyWindow { name: &'static str },
}

