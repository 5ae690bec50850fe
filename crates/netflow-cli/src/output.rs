use netflow_core::{ReportOffset, ScanReport, ScanResult};
use netflow_report::HEADER_LABELS;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    report: &ScanReport,
    format: OutputFormat,
    offset: ReportOffset,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => print!("{}", render_table(report, offset)),
    }
    Ok(())
}

fn render_table(report: &ScanReport, offset: ReportOffset) -> String {
    let mut out = String::new();
    out.push_str(&format!("cycle_id  : {}\n", report.cycle_id));
    out.push_str(&format!("started_at: {}\n", report.started_at));
    out.push_str(&format!(
        "selected  : {} (included {}, skipped {})\n",
        report.selected,
        report.results.len(),
        report.skipped.len()
    ));

    let mut rows: Vec<Vec<String>> =
        vec![HEADER_LABELS.iter().map(|label| (*label).to_owned()).collect()];
    rows.extend(report.results.iter().map(|result| table_row(result, offset)));
    let widths: Vec<usize> = (0..HEADER_LABELS.len())
        .map(|column| rows.iter().map(|row| row[column].len()).max().unwrap_or(0))
        .collect();

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }

    if !report.skipped.is_empty() {
        out.push_str("skipped:\n");
        for skipped in &report.skipped {
            out.push_str(&format!("  - {}: {}\n", skipped.symbol, skipped.reason));
        }
    }
    out
}

fn table_row(result: &ScanResult, offset: ReportOffset) -> Vec<String> {
    let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    vec![
        result.time.format_short(offset),
        result.symbol.to_string(),
        result.price.to_string(),
        format!("{:.1}", result.amount),
        format!("{:.1}", result.buy_volume),
        format!("{:.1}", result.sell_volume),
        format!("{:.1}", result.net_inflow),
        optional(result.money_flow),
        optional(result.stop_loss),
    ]
}
