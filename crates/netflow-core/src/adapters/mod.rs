mod binance;

pub use binance::{parse_klines, parse_tickers, BinanceFuturesAdapter, DEFAULT_BASE_URL};
