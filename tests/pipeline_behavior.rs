//! Behavior-driven tests for one scan cycle
//!
//! These tests drive the whole pipeline (selection, flow aggregation,
//! indicators, ranking) against a canned Binance market and check what a
//! user would see in the resulting report.

use netflow_core::{
    run_scan, select_top_symbols, ScanConfig, SelectorConfig, SourceErrorKind, Symbol,
    TickerSnapshot,
};
use netflow_report::{Cell, MemorySurface, ReportSink, ReportSurface};
use netflow_tests::{at, flow_bars, ticker, Arc, Bar, Market};
use uuid::Uuid;

const STARTED: &str = "2024-01-15T09:00:00Z";

fn symbols(report: &netflow_core::ScanReport) -> Vec<&str> {
    report.results.iter().map(|r| r.symbol.as_str()).collect()
}

// =============================================================================
// Symbol selection
// =============================================================================

#[tokio::test]
async fn when_one_symbol_clears_the_liquidity_floor_only_it_is_evaluated() {
    // Given: one symbol with 500M quote volume and 23 below 300M
    let mut tickers = vec![ticker("BTCUSDT", 42_000.5, 500_000_000.0)];
    tickers.extend((0..23).map(|i| {
        ticker(&format!("LOW{i}USDT"), 1.0, 299_999_999.0 - f64::from(i) * 1_000_000.0)
    }));
    let (client, source) = Market::new(tickers)
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: exactly one symbol was selected and no other klines were fetched
    assert_eq!(report.selected, 1);
    assert_eq!(symbols(&report), vec!["BTCUSDT"]);
    let kline_calls = client
        .recorded_requests()
        .iter()
        .filter(|request| request.url.contains("/fapi/v1/klines"))
        .count();
    assert_eq!(kline_calls, 2, "one flow fetch and one indicator fetch");
}

#[test]
fn selection_keeps_the_thirty_most_liquid_usdt_perpetuals() {
    // Given: 40 eligible perpetuals, a dated contract and a non-USDT pair
    let mut tickers: Vec<TickerSnapshot> = (0..40)
        .map(|i| {
            TickerSnapshot::new(
                Symbol::parse(&format!("S{i}USDT")).expect("symbol"),
                1.0,
                400_000_000.0 + f64::from(i) * 1_000_000.0,
            )
            .expect("ticker")
        })
        .collect();
    for raw in ["BTCUSDT_250328", "ETHBTC"] {
        tickers.push(
            TickerSnapshot::new(Symbol::parse(raw).expect("symbol"), 1.0, 9e12).expect("ticker"),
        );
    }

    // When: the selector ranks them
    let selected = select_top_symbols(tickers, &SelectorConfig::default());

    // Then: the 30 largest USDT perpetuals remain, largest first
    assert_eq!(selected.len(), 30);
    assert_eq!(selected[0].symbol.as_str(), "S39USDT");
    assert_eq!(selected[29].symbol.as_str(), "S10USDT");
    assert!(selected
        .windows(2)
        .all(|pair| pair[0].quote_volume >= pair[1].quote_volume));
    assert!(selected.iter().all(|t| t.symbol.is_usdt_perpetual()));
}

// =============================================================================
// Flow aggregation
// =============================================================================

#[tokio::test]
async fn when_buyers_outweigh_sellers_net_inflow_is_reported() {
    // Given: taker buys of 100 against total quote volume of 140
    let (_, source) = Market::new(vec![ticker("BTCUSDT", 42_000.5, 912_345_678.94)])
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: buy 100, sell 40, net 60, amount rounded to one decimal
    let row = &report.results[0];
    assert_eq!(row.buy_volume, 100.0);
    assert_eq!(row.sell_volume, 40.0);
    assert_eq!(row.net_inflow, 60.0);
    assert_eq!(row.amount, 912_345_678.9);
    assert_eq!(row.price, 42_000.5);
    assert_eq!(row.time, at(STARTED));
}

#[tokio::test]
async fn sellers_dominating_symbols_are_dropped_silently() {
    // Given: one inflow symbol and one outflow symbol
    let (_, source) = Market::new(vec![
        ticker("BTCUSDT", 1.0, 900_000_000.0),
        ticker("ETHUSDT", 1.0, 800_000_000.0),
    ])
    .flow("BTCUSDT", &flow_bars(100.0, 40.0))
    .flow("ETHUSDT", &flow_bars(40.0, 100.0))
    .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: the outflow symbol is neither reported nor counted as skipped
    assert_eq!(symbols(&report), vec!["BTCUSDT"]);
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn results_are_ranked_by_net_inflow_not_by_liquidity() {
    // Given: liquidity order A > B > C but net inflow order B > C > A
    let (_, source) = Market::new(vec![
        ticker("AUSDT", 1.0, 900_000_000.0),
        ticker("BUSDT", 1.0, 800_000_000.0),
        ticker("CUSDT", 1.0, 700_000_000.0),
    ])
    .flow("AUSDT", &flow_bars(20.0, 10.0))
    .flow("BUSDT", &flow_bars(100.0, 40.0))
    .flow("CUSDT", &flow_bars(50.0, 20.0))
    .into_adapter();

    // When: a cycle runs with several symbols in flight
    let config = ScanConfig {
        concurrency: 3,
        ..ScanConfig::default()
    };
    let report = run_scan(&source, &config, Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: rows are sorted by net inflow, descending
    assert_eq!(symbols(&report), vec!["BUSDT", "CUSDT", "AUSDT"]);
}

#[tokio::test]
async fn a_failing_symbol_is_skipped_and_the_cycle_continues() {
    // Given: the exchange rejects klines for one selected symbol
    let (_, source) = Market::new(vec![
        ticker("BTCUSDT", 1.0, 900_000_000.0),
        ticker("XRPUSDT", 1.0, 800_000_000.0),
    ])
    .flow("BTCUSDT", &flow_bars(100.0, 40.0))
    .failing("XRPUSDT", 400)
    .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: the failure is recorded and the other symbol is still reported
    assert_eq!(symbols(&report), vec!["BTCUSDT"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].symbol.as_str(), "XRPUSDT");
    assert!(report.skipped[0].reason.contains("Invalid symbol"));
}

#[tokio::test]
async fn ticker_outage_aborts_the_cycle() {
    // Given: the ticker endpoint is down
    let client = Arc::new(netflow_core::StaticHttpClient::new().route(
        "/fapi/v1/ticker/24hr",
        netflow_core::HttpResponse::new(503, "maintenance"),
    ));
    let source = netflow_core::BinanceFuturesAdapter::with_http_client(client)
        .base_url(netflow_tests::BASE_URL);

    // When: a cycle runs
    let err = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect_err("must fail");

    // Then: the error says the source is unavailable
    assert_eq!(err.kind(), SourceErrorKind::Unavailable);
}

// =============================================================================
// Indicators
// =============================================================================

#[tokio::test]
async fn closes_at_the_high_give_full_money_flow() {
    // Given: 20 indicator candles that all close at their high
    let bars = vec![Bar::ranged(99.0, 101.0, 101.0, 10.0); 20];
    let (_, source) = Market::new(vec![ticker("BTCUSDT", 101.0, 900_000_000.0)])
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .indicators("BTCUSDT", &bars)
        .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: money flow is 1 and the stop sits 5% under the lowest low
    assert_eq!(report.results[0].money_flow, Some(1.0));
    assert_eq!(report.results[0].stop_loss, Some(94.05));
}

#[tokio::test]
async fn rangeless_candles_leave_money_flow_blank() {
    // Given: 20 indicator candles with high == low
    let bars = vec![Bar::flat(100.0, 50.0); 20];
    let (_, source) = Market::new(vec![ticker("BTCUSDT", 100.0, 900_000_000.0)])
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .indicators("BTCUSDT", &bars)
        .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: money flow is undefined but the stop-loss is still computed
    assert_eq!(report.results[0].money_flow, None);
    assert_eq!(report.results[0].stop_loss, Some(95.0));
}

#[tokio::test]
async fn a_volume_spike_anchors_the_stop_loss() {
    // Given: 20 candles; in the trailing 15, index 7 has 10x the previous
    // volume and a low of 98, while a later candle dips to 90
    let mut bars = vec![Bar::ranged(95.0, 101.0, 100.0, 100.0); 20];
    bars[12] = Bar::ranged(98.0, 101.0, 100.0, 1_000.0);
    bars[15] = Bar::ranged(90.0, 101.0, 100.0, 100.0);
    let (_, source) = Market::new(vec![ticker("BTCUSDT", 100.0, 900_000_000.0)])
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .indicators("BTCUSDT", &bars)
        .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: the stop is 5% under the spike's low, not under the window minimum
    assert_eq!(report.results[0].stop_loss, Some(93.1));
}

#[tokio::test]
async fn missing_indicator_candles_degrade_to_blank_indicators() {
    // Given: flow candles exist but the indicator fetch has no answer
    let (_, source) = Market::new(vec![ticker("BTCUSDT", 1.0, 900_000_000.0)])
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .into_adapter();

    // When: a cycle runs
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");

    // Then: the symbol is still reported with both indicators blank
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].money_flow, None);
    assert_eq!(report.results[0].stop_loss, None);
}

// =============================================================================
// Scan to report
// =============================================================================

#[tokio::test]
async fn a_cycle_lands_in_the_monthly_sheet() {
    // Given: a market with one qualifying symbol and an empty surface
    let bars = vec![Bar::ranged(99.0, 101.0, 101.0, 10.0); 20];
    let (_, source) = Market::new(vec![ticker("BTCUSDT", 101.0, 900_000_000.0)])
        .flow("BTCUSDT", &flow_bars(100.0, 40.0))
        .indicators("BTCUSDT", &bars)
        .into_adapter();
    let surface = Arc::new(MemorySurface::new());
    let sink = ReportSink::new(surface.clone() as Arc<dyn ReportSurface>);

    // When: the cycle's results are published
    let report = run_scan(&source, &ScanConfig::default(), Uuid::new_v4(), at(STARTED))
        .await
        .expect("scan");
    sink.publish(&report.results, at(STARTED))
        .await
        .expect("publish");

    // Then: the row sits under the header in the January sheet
    let rows = surface
        .read_rows("2024-01-Binance-NetInflow")
        .await
        .expect("rows");
    assert_eq!(
        rows[3],
        vec![
            Cell::text("01-15 09:00:00"),
            Cell::text("BTCUSDT"),
            Cell::Number(101.0),
            Cell::Number(900_000_000.0),
            Cell::Number(100.0),
            Cell::Number(40.0),
            Cell::Number(60.0),
            Cell::Number(1.0),
            Cell::Number(94.05),
        ]
    );
}
