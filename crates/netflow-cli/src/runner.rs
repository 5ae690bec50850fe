//! Scheduler: one cycle at startup, then one per cadence boundary.

use std::sync::Arc;
use std::time::Duration;

use netflow_core::{run_scan, MarketDataSource, ScanConfig, ScanReport, UtcDateTime};
use netflow_report::ReportSink;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

/// Everything one cycle needs.
pub struct Pipeline {
    source: Arc<dyn MarketDataSource>,
    config: ScanConfig,
    sink: Option<ReportSink>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn MarketDataSource>, config: ScanConfig) -> Self {
        Self {
            source,
            config,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: ReportSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Scans and writes one batch. Never fails: a ticker failure yields an
    /// empty report and a write failure is logged.
    pub async fn run_cycle(&self) -> ScanReport {
        let cycle_id = Uuid::new_v4();
        let started_at = UtcDateTime::now();
        let span = tracing::info_span!("cycle", %cycle_id);

        async move {
            tracing::info!(source = self.source.name(), "cycle started");
            let report = match run_scan(self.source.as_ref(), &self.config, cycle_id, started_at).await
            {
                Ok(report) => report,
                Err(error) => {
                    tracing::error!(%error, "ticker fetch failed, cycle produced no results");
                    ScanReport::empty(cycle_id, started_at)
                }
            };

            if let Some(sink) = &self.sink {
                if let Err(error) = sink.publish(&report.results, started_at).await {
                    tracing::error!(%error, "report write failed");
                }
            }

            tracing::info!(results = report.results.len(), "cycle finished");
            report
        }
        .instrument(span)
        .await
    }
}

/// First cadence boundary strictly after `now`, aligned to the Unix epoch so
/// an hourly cadence lands on `:00`.
pub fn next_boundary(now: UtcDateTime, cadence: Duration) -> UtcDateTime {
    let cadence_secs = i64::try_from(cadence.as_secs().max(1)).unwrap_or(i64::MAX);
    let now_secs = now.unix_timestamp();
    let boundary_secs = (now_secs.div_euclid(cadence_secs) + 1).saturating_mul(cadence_secs);

    UtcDateTime::from_unix_millis(boundary_secs.saturating_mul(1_000)).unwrap_or(now)
}

/// Time left until `target`, zero when it has passed.
pub fn delay_until(now: UtcDateTime, target: UtcDateTime) -> Duration {
    Duration::try_from(target.into_inner() - now.into_inner()).unwrap_or(Duration::ZERO)
}

/// Boundaries after `planned` and up to `now` that were not served.
///
/// `planned` need not sit on a boundary: the startup cycle begins whenever
/// the process starts.
fn missed_boundaries(planned: UtcDateTime, now: UtcDateTime, cadence: Duration) -> u64 {
    let cadence_secs = i64::try_from(cadence.as_secs().max(1)).unwrap_or(i64::MAX);
    let crossed = now.unix_timestamp().div_euclid(cadence_secs)
        - planned.unix_timestamp().div_euclid(cadence_secs);
    u64::try_from(crossed).unwrap_or(0)
}

async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender stops the scheduler too.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Runs cycles until `shutdown` flips to `true`.
///
/// Each cycle runs in its own task so a panic is contained. Cycles never
/// overlap; boundaries that pass while a cycle is running are skipped.
pub async fn run_forever(
    pipeline: Arc<Pipeline>,
    cadence: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut planned = UtcDateTime::now();

    loop {
        let cycle = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.run_cycle().await }
        });
        if let Err(error) = cycle.await {
            tracing::error!(%error, "cycle task aborted");
        }

        let now = UtcDateTime::now();
        let skipped = missed_boundaries(planned, now, cadence);
        if skipped > 0 {
            tracing::warn!(skipped, "cycle overran the cadence, skipping missed boundaries");
        }
        planned = next_boundary(now, cadence);
        tracing::info!(next_cycle = %planned, "waiting for next boundary");

        tokio::select! {
            () = tokio::time::sleep(delay_until(UtcDateTime::now(), planned)) => {}
            () = stop_requested(&mut shutdown) => {
                tracing::info!("scheduler stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netflow_core::{BinanceFuturesAdapter, HttpResponse, StaticHttpClient};
    use netflow_report::{MemorySurface, ReportSurface};

    const HOUR: Duration = Duration::from_secs(3_600);

    fn at(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("timestamp")
    }

    #[test]
    fn hourly_boundary_is_next_full_hour() {
        assert_eq!(
            next_boundary(at("2024-01-15T09:41:07Z"), HOUR),
            at("2024-01-15T10:00:00Z")
        );
        assert_eq!(
            next_boundary(at("2024-01-15T23:59:59Z"), HOUR),
            at("2024-01-16T00:00:00Z")
        );
    }

    #[test]
    fn boundary_is_strictly_after_now() {
        let on_boundary = at("2024-01-15T10:00:00Z");
        assert_eq!(next_boundary(on_boundary, HOUR), at("2024-01-15T11:00:00Z"));
        assert_eq!(
            next_boundary(on_boundary, Duration::from_secs(900)),
            at("2024-01-15T10:15:00Z")
        );
    }

    #[test]
    fn delay_is_zero_for_past_targets() {
        let now = at("2024-01-15T10:00:00Z");
        assert_eq!(delay_until(now, at("2024-01-15T09:00:00Z")), Duration::ZERO);
        assert_eq!(
            delay_until(now, at("2024-01-15T10:00:30Z")),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn counts_boundaries_missed_by_an_overrun() {
        let planned = at("2024-01-15T10:00:00Z");
        assert_eq!(missed_boundaries(planned, at("2024-01-15T10:20:00Z"), HOUR), 0);
        assert_eq!(missed_boundaries(planned, at("2024-01-15T12:05:00Z"), HOUR), 2);
    }

    #[test]
    fn startup_cycle_crossing_a_boundary_counts_as_missed() {
        let started = at("2024-01-15T09:59:30Z");
        assert_eq!(missed_boundaries(started, at("2024-01-15T10:00:30Z"), HOUR), 1);
        assert_eq!(missed_boundaries(started, at("2024-01-15T09:59:59Z"), HOUR), 0);
    }

    #[tokio::test]
    async fn ticker_failure_yields_empty_cycle_without_writing() {
        let http = Arc::new(
            StaticHttpClient::new().route("/fapi/v1/ticker/24hr", HttpResponse::new(503, "down")),
        );
        let source = Arc::new(
            BinanceFuturesAdapter::with_http_client(http).base_url("https://binance.test"),
        );
        let surface = Arc::new(MemorySurface::new());
        let pipeline = Pipeline::new(source, ScanConfig::default())
            .with_sink(ReportSink::new(surface.clone() as Arc<dyn ReportSurface>));

        let report = pipeline.run_cycle().await;

        assert!(report.results.is_empty());
        assert_eq!(report.selected, 0);
        assert!(surface.sheet_titles().is_empty());
    }

    #[tokio::test]
    async fn scheduler_stops_on_shutdown_signal() {
        let http = Arc::new(StaticHttpClient::new().route(
            "/fapi/v1/ticker/24hr",
            HttpResponse::ok_json("[]"),
        ));
        let source = Arc::new(
            BinanceFuturesAdapter::with_http_client(http.clone()).base_url("https://binance.test"),
        );
        let pipeline = Arc::new(Pipeline::new(source, ScanConfig::default()));
        let (stop, shutdown) = watch::channel(false);

        let task = tokio::spawn(run_forever(pipeline, HOUR, shutdown));
        stop.send(true).expect("scheduler listening");
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("scheduler must stop")
            .expect("scheduler task");

        assert_eq!(http.recorded_requests().len(), 1);
    }
}
