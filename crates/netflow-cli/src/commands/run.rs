use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::{build_sink, build_source, http_client, scan_config};
use crate::cli::{Cli, RunArgs};
use crate::config::AppConfig;
use crate::error::CliError;
use crate::liveness;
use crate::runner::{self, Pipeline};

pub async fn run(cli: &Cli, args: &RunArgs, config: &AppConfig) -> Result<(), CliError> {
    let http_client = http_client();
    let sink = build_sink(cli, config, Arc::clone(&http_client)).await?;
    let source = build_source(cli, config, http_client);
    let pipeline = Pipeline::new(source, scan_config(cli)?).with_sink(sink);

    if args.once {
        pipeline.run_cycle().await;
        return Ok(());
    }

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown signal received"),
            Err(error) => tracing::error!(%error, "failed to listen for ctrl-c"),
        }
        let _ = stop.send(true);
    });

    let liveness = if args.no_liveness {
        None
    } else {
        let port = args.port.unwrap_or(config.port);
        let shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(error) = liveness::serve(port, shutdown).await {
                tracing::error!(%error, port, "liveness endpoint failed");
            }
        }))
    };

    let cadence = Duration::from_secs(u64::from(args.interval_minutes) * 60);
    tracing::info!(interval_minutes = args.interval_minutes, "scheduler started");
    runner::run_forever(Arc::new(pipeline), cadence, shutdown).await;

    if let Some(task) = liveness {
        if let Err(error) = task.await {
            tracing::error!(%error, "liveness task aborted");
        }
    }
    Ok(())
}
