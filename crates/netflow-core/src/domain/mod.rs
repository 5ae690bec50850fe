//! # Domain Models
//!
//! Canonical domain types for futures market data.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated exchange instrument id |
//! | [`Interval`] | Kline interval (`1h`) |
//! | [`UtcDateTime`] | UTC timestamp |
//! | [`ReportOffset`] | Fixed offset used when rendering report times |
//! | [`TickerSnapshot`] | 24h price/volume statistics |
//! | [`Candle`] | OHLCV candle with taker-buy split |
//! | [`CandleSeries`] | Ordered candles for a symbol/interval |
//!
//! All constructors validate their invariants and return [`ValidationError`](crate::ValidationError).

mod interval;
mod models;
mod symbol;
mod timestamp;

pub use interval::Interval;
pub use models::{Candle, CandleSeries, TickerSnapshot};
pub use symbol::Symbol;
pub use timestamp::{ReportOffset, UtcDateTime};
