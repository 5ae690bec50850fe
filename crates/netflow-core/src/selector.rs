use serde::{Deserialize, Serialize};

use crate::data_source::{MarketDataSource, SourceError};
use crate::TickerSnapshot;

pub const DEFAULT_MIN_QUOTE_VOLUME: f64 = 300_000_000.0;
pub const DEFAULT_TOP_N: usize = 30;

/// Liquidity floor and universe size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub min_quote_volume: f64,
    pub top_n: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_quote_volume: DEFAULT_MIN_QUOTE_VOLUME,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Keeps liquid USDT perpetuals, most traded first, at most `top_n` of them.
pub fn select_top_symbols(
    tickers: Vec<TickerSnapshot>,
    config: &SelectorConfig,
) -> Vec<TickerSnapshot> {
    let mut selected: Vec<TickerSnapshot> = tickers
        .into_iter()
        .filter(|ticker| ticker.symbol.is_usdt_perpetual())
        .filter(|ticker| ticker.quote_volume >= config.min_quote_volume)
        .collect();

    selected.sort_by(|a, b| b.quote_volume.total_cmp(&a.quote_volume));
    selected.truncate(config.top_n);
    selected
}

/// Fetches the ticker list and applies [`select_top_symbols`].
///
/// # Errors
///
/// Propagates the source failure; the caller aborts the cycle.
pub async fn fetch_top_symbols(
    source: &dyn MarketDataSource,
    config: &SelectorConfig,
) -> Result<Vec<TickerSnapshot>, SourceError> {
    let tickers = source.tickers().await?;
    let listed = tickers.len();
    let selected = select_top_symbols(tickers, config);

    tracing::info!(
        source = source.name(),
        listed,
        selected = selected.len(),
        "selected liquid symbols"
    );

    Ok(selected)
}
