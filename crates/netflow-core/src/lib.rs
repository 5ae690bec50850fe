//! Core contracts for netflow.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - HTTP transport and the Binance futures adapter
//! - Request throttling
//! - Indicators, symbol selection, flow aggregation and the scan pipeline

pub mod adapters;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod flow;
pub mod http_client;
pub mod indicators;
pub mod scan;
pub mod selector;
pub mod throttling;

pub use adapters::BinanceFuturesAdapter;
pub use data_source::{CandlesRequest, MarketDataSource, SourceError, SourceErrorKind};
pub use domain::{
    Candle, CandleSeries, Interval, ReportOffset, Symbol, TickerSnapshot, UtcDateTime,
};
pub use error::ValidationError;
pub use flow::{summarize_flow, FlowSummary};
pub use http_client::{
    HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    StaticHttpClient,
};
pub use indicators::{IndicatorConfig, IndicatorSet};
pub use scan::{run_scan, ScanConfig, ScanReport, ScanResult, SkippedSymbol};
pub use selector::{fetch_top_symbols, select_top_symbols, SelectorConfig};
pub use throttling::RequestThrottle;
