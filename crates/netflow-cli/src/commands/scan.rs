use std::sync::Arc;

use super::{build_sink, build_source, http_client, scan_config};
use crate::cli::{Cli, ScanArgs};
use crate::config::AppConfig;
use crate::error::CliError;
use crate::output;
use crate::runner::Pipeline;

pub async fn run(cli: &Cli, args: &ScanArgs, config: &AppConfig) -> Result<(), CliError> {
    let http_client = http_client();
    let source = build_source(cli, config, Arc::clone(&http_client));
    let mut pipeline = Pipeline::new(source, scan_config(cli)?);
    if args.write {
        pipeline = pipeline.with_sink(build_sink(cli, config, http_client).await?);
    }

    let report = pipeline.run_cycle().await;
    output::render(&report, args.format, config.utc_offset)
}
