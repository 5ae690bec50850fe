mod run;
mod scan;

use std::sync::Arc;

use netflow_core::{
    BinanceFuturesAdapter, HttpClient, MarketDataSource, ReqwestHttpClient, RequestThrottle,
    ScanConfig,
};
use netflow_report::{
    MemorySurface, ReportSink, ReportSurface, ServiceAccountAuth, ServiceAccountKey,
    SheetsSurface, TokenSource, WarehouseConfig, WarehouseSurface,
};

use crate::cli::{Cli, Command, SinkKind};
use crate::config::AppConfig;
use crate::error::CliError;

pub async fn run(cli: &Cli, config: &AppConfig) -> Result<(), CliError> {
    match &cli.command {
        Command::Run(args) => run::run(cli, args, config).await,
        Command::Scan(args) => scan::run(cli, args, config).await,
    }
}

fn scan_config(cli: &Cli) -> Result<ScanConfig, CliError> {
    let config = ScanConfig {
        concurrency: cli.concurrency.max(1),
        ..ScanConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn build_source(
    cli: &Cli,
    config: &AppConfig,
    http_client: Arc<dyn HttpClient>,
) -> Arc<dyn MarketDataSource> {
    Arc::new(
        BinanceFuturesAdapter::with_http_client(http_client)
            .base_url(config.binance_url.as_str())
            .throttle(RequestThrottle::per_second(config.requests_per_second))
            .timeout_ms(cli.timeout_ms),
    )
}

/// Opens the configured surface. Every failure here is fatal at startup.
async fn build_surface(
    cli: &Cli,
    config: &AppConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<Arc<dyn ReportSurface>, CliError> {
    match cli.sink {
        SinkKind::Sheets => {
            let credentials = config.credentials_path.as_deref().ok_or_else(|| {
                CliError::Config(String::from(
                    "the sheets sink needs NETFLOW_CREDENTIALS_PATH",
                ))
            })?;
            let spreadsheet_id = config.spreadsheet_id.as_deref().ok_or_else(|| {
                CliError::Config(String::from("the sheets sink needs NETFLOW_SPREADSHEET_ID"))
            })?;

            let key = ServiceAccountKey::from_file(credentials)?;
            let auth = ServiceAccountAuth::new(key, Arc::clone(&http_client), cli.timeout_ms)?;
            auth.token().await?;
            tracing::info!(client_email = auth.client_email(), "sheets credentials accepted");

            Ok(Arc::new(
                SheetsSurface::new(http_client, Arc::new(auth), spreadsheet_id)
                    .timeout_ms(cli.timeout_ms),
            ))
        }
        SinkKind::Warehouse => {
            let surface = WarehouseSurface::open(WarehouseConfig::new(&config.warehouse_path))?;
            tracing::info!(path = %surface.db_path().display(), "warehouse surface opened");
            Ok(Arc::new(surface))
        }
        SinkKind::Memory => Ok(Arc::new(MemorySurface::new())),
    }
}

async fn build_sink(
    cli: &Cli,
    config: &AppConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<ReportSink, CliError> {
    let surface = build_surface(cli, config, http_client).await?;
    Ok(ReportSink::new(surface)
        .offset(config.utc_offset)
        .empty_policy(cli.empty_policy))
}

fn http_client() -> Arc<dyn HttpClient> {
    Arc::new(ReqwestHttpClient::new())
}
