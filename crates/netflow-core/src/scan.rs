//! One scan cycle: selection, per-symbol flow aggregation, indicators.
//!
//! Symbols are evaluated with bounded concurrency through an ordered buffered
//! stream, then ranked by net inflow with a stable sort so the output never
//! depends on completion order.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data_source::{CandlesRequest, MarketDataSource, SourceError};
use crate::flow::{summarize_flow, FlowSummary, DEFAULT_FLOW_CANDLES};
use crate::indicators::{round_dp, IndicatorConfig, IndicatorSet};
use crate::selector::{fetch_top_symbols, SelectorConfig};
use crate::{Candle, Interval, Symbol, TickerSnapshot, UtcDateTime, ValidationError};

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub selector: SelectorConfig,
    pub indicators: IndicatorConfig,
    pub interval: Interval,
    /// Candles summed for the buy/sell split.
    pub flow_candles: usize,
    /// Symbols evaluated at the same time.
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            selector: SelectorConfig::default(),
            indicators: IndicatorConfig::default(),
            interval: Interval::OneHour,
            flow_candles: DEFAULT_FLOW_CANDLES,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.indicators.validate()?;
        if self.flow_candles == 0 {
            return Err(ValidationError::EmptyWindow {
                name: "flow_candles",
            });
        }
        Ok(())
    }
}

/// One ranked row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub time: UtcDateTime,
    pub symbol: Symbol,
    pub price: f64,
    /// 24h quote volume.
    pub amount: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub net_inflow: f64,
    pub money_flow: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl ScanResult {
    fn new(
        time: UtcDateTime,
        ticker: &TickerSnapshot,
        flow: &FlowSummary,
        indicators: IndicatorSet,
    ) -> Self {
        Self {
            time,
            symbol: ticker.symbol.clone(),
            price: ticker.last_price,
            amount: round_dp(ticker.quote_volume, 1),
            buy_volume: round_dp(flow.buy_volume, 1),
            sell_volume: round_dp(flow.sell_volume, 1),
            net_inflow: round_dp(flow.net_inflow, 1),
            money_flow: indicators.money_flow.map(|ratio| round_dp(ratio, 3)),
            stop_loss: indicators.stop_loss.map(|price| round_dp(price, 2)),
        }
    }
}

/// A selected symbol that could not be evaluated this cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    pub reason: String,
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub cycle_id: Uuid,
    pub started_at: UtcDateTime,
    pub selected: usize,
    pub skipped: Vec<SkippedSymbol>,
    pub results: Vec<ScanResult>,
}

impl ScanReport {
    /// Report for a cycle whose ticker fetch failed.
    pub fn empty(cycle_id: Uuid, started_at: UtcDateTime) -> Self {
        Self {
            cycle_id,
            started_at,
            selected: 0,
            skipped: Vec::new(),
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SymbolOutcome {
    Included(ScanResult),
    Outflow,
    Skipped(SkippedSymbol),
}

/// Runs one cycle against `source`.
///
/// # Errors
///
/// Fails only when the ticker list cannot be fetched. Per-symbol failures
/// are recorded in [`ScanReport::skipped`].
pub async fn run_scan(
    source: &dyn MarketDataSource,
    config: &ScanConfig,
    cycle_id: Uuid,
    started_at: UtcDateTime,
) -> Result<ScanReport, SourceError> {
    let selected = fetch_top_symbols(source, &config.selector).await?;
    let selected_count = selected.len();

    // Owned tickers keep the stream future `'static`-spawnable.
    let outcomes: Vec<SymbolOutcome> = stream::iter(selected)
        .map(|ticker| evaluate_symbol(source, ticker, config, started_at))
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let mut report = ScanReport {
        selected: selected_count,
        ..ScanReport::empty(cycle_id, started_at)
    };
    for outcome in outcomes {
        match outcome {
            SymbolOutcome::Included(result) => report.results.push(result),
            SymbolOutcome::Outflow => {}
            SymbolOutcome::Skipped(skipped) => report.skipped.push(skipped),
        }
    }
    rank_by_net_inflow(&mut report.results);

    tracing::info!(
        selected = report.selected,
        included = report.results.len(),
        skipped = report.skipped.len(),
        "scan finished"
    );

    Ok(report)
}

/// Descending by net inflow; ties keep their current order.
pub fn rank_by_net_inflow(results: &mut [ScanResult]) {
    results.sort_by(|a, b| b.net_inflow.total_cmp(&a.net_inflow));
}

async fn evaluate_symbol(
    source: &dyn MarketDataSource,
    ticker: TickerSnapshot,
    config: &ScanConfig,
    observed_at: UtcDateTime,
) -> SymbolOutcome {
    let symbol = &ticker.symbol;
    let skipped = |reason: String| {
        tracing::warn!(symbol = %symbol, %reason, "skipping symbol");
        SymbolOutcome::Skipped(SkippedSymbol {
            symbol: symbol.clone(),
            reason,
        })
    };

    let series = match fetch_candles(source, symbol, config.interval, config.flow_candles).await {
        Ok(series) => series,
        Err(error) => return skipped(format!("flow candles unavailable: {error}")),
    };
    let Some(flow) = summarize_flow(&series) else {
        return skipped(String::from("flow candles empty"));
    };
    if !flow.is_inflow() {
        tracing::debug!(symbol = %symbol, net_inflow = flow.net_inflow, "net outflow");
        return SymbolOutcome::Outflow;
    }

    let indicators = match fetch_candles(
        source,
        symbol,
        config.interval,
        config.indicators.required_candles(),
    )
    .await
    {
        Ok(candles) => IndicatorSet::compute(&candles, &config.indicators),
        Err(error) => {
            tracing::warn!(symbol = %symbol, %error, "indicator candles unavailable");
            IndicatorSet::default()
        }
    };

    SymbolOutcome::Included(ScanResult::new(observed_at, &ticker, &flow, indicators))
}

async fn fetch_candles(
    source: &dyn MarketDataSource,
    symbol: &Symbol,
    interval: Interval,
    limit: usize,
) -> Result<Vec<Candle>, SourceError> {
    let request = CandlesRequest::new(symbol.clone(), interval, limit)?;
    source.candles(request).await.map(|series| series.candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, net_inflow: f64) -> ScanResult {
        ScanResult {
            time: UtcDateTime::from_unix_millis(0).expect("epoch"),
            symbol: Symbol::parse(symbol).expect("symbol"),
            price: 1.0,
            amount: 1.0,
            buy_volume: 1.0,
            sell_volume: 1.0,
            net_inflow,
            money_flow: None,
            stop_loss: None,
        }
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut results = vec![
            result("AUSDT", 5.0),
            result("BUSDT", 9.0),
            result("CUSDT", 5.0),
            result("DUSDT", 0.1),
        ];

        rank_by_net_inflow(&mut results);

        let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BUSDT", "AUSDT", "CUSDT", "DUSDT"]);
    }

    #[test]
    fn result_fields_are_rounded() {
        let symbol = Symbol::parse("BTCUSDT").expect("symbol");
        let ticker = TickerSnapshot::new(symbol, 42_123.456, 1_234.56).expect("ticker");
        let flow = FlowSummary {
            buy_volume: 100.04,
            sell_volume: 40.06,
            net_inflow: 59.99,
        };
        let indicators = IndicatorSet {
            money_flow: Some(0.123_56),
            stop_loss: Some(93.1),
        };

        let row = ScanResult::new(UtcDateTime::now(), &ticker, &flow, indicators);

        assert_eq!(row.price, 42_123.456);
        assert_eq!(row.amount, 1_234.6);
        assert_eq!(row.buy_volume, 100.0);
        assert_eq!(row.sell_volume, 40.1);
        assert_eq!(row.net_inflow, 60.0);
        assert_eq!(row.money_flow, Some(0.124));
    }

    #[tokio::test]
    async fn a_scan_runs_on_its_own_task() {
        use std::sync::Arc;

        use crate::{BinanceFuturesAdapter, HttpResponse, StaticHttpClient};

        let http = Arc::new(
            StaticHttpClient::new()
                .route(
                    "/fapi/v1/ticker/24hr",
                    HttpResponse::ok_json(
                        r#"[{"symbol":"BTCUSDT","lastPrice":"42000","quoteVolume":"900000000"}]"#,
                    ),
                )
                .route("/fapi/v1/klines", HttpResponse::ok_json("[]")),
        );
        let source: Arc<dyn MarketDataSource> =
            Arc::new(BinanceFuturesAdapter::with_http_client(http).base_url("https://binance.test"));
        let config = ScanConfig::default();

        let report = tokio::spawn(async move {
            run_scan(source.as_ref(), &config, Uuid::nil(), UtcDateTime::now()).await
        })
        .await
        .expect("scan task")
        .expect("scan");

        assert_eq!(report.selected, 1);
        assert!(report.results.is_empty());
        assert_eq!(report.skipped[0].reason, "flow candles empty");
    }

    #[test]
    fn zero_flow_window_is_rejected() {
        let config = ScanConfig {
            flow_candles: 0,
            ..ScanConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
