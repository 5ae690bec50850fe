//! Market data source trait and request/response types.
//!
//! This module defines the adapter contract ([`MarketDataSource`]) the scan
//! pipeline consumes, along with the request and error types for each endpoint.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Tickers | – | `Vec<TickerSnapshot>` | 24h statistics for every listed instrument |
//! | Candles | [`CandlesRequest`] | [`CandleSeries`] | Most recent klines, oldest first |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{CandleSeries, Interval, Symbol, TickerSnapshot};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    Timeout,
    RateLimited,
    InvalidRequest,
    Malformed,
}

/// Structured source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message)
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Malformed => "source.malformed",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for candle endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandlesRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub limit: usize,
}

impl CandlesRequest {
    /// Upper bound accepted by the futures klines endpoint.
    pub const MAX_LIMIT: usize = 1_500;

    pub fn new(symbol: Symbol, interval: Interval, limit: usize) -> Result<Self, SourceError> {
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "candles request limit must be greater than zero",
            ));
        }
        if limit > Self::MAX_LIMIT {
            return Err(SourceError::invalid_request(format!(
                "candles request limit {limit} exceeds {}",
                Self::MAX_LIMIT
            )));
        }
        Ok(Self {
            symbol,
            interval,
            limit,
        })
    }
}

/// Source adapter contract.
///
/// Implementations must be `Send + Sync`: the pipeline fetches candles for
/// several symbols concurrently through one shared adapter.
pub trait MarketDataSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches 24h statistics for every listed instrument.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the provider is unreachable, times out,
    /// rate limits the caller, or returns a payload that cannot be parsed.
    fn tickers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TickerSnapshot>, SourceError>> + Send + 'a>>;

    /// Fetches the most recent `limit` candles, ordered oldest to newest.
    ///
    /// # Errors
    ///
    /// Same conditions as [`tickers`](MarketDataSource::tickers), plus
    /// `InvalidRequest` when the exchange rejects the symbol.
    fn candles<'a>(
        &'a self,
        req: CandlesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CandleSeries, SourceError>> + Send + 'a>>;
}
