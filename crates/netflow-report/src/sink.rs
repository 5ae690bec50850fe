//! Report sink: turns a ranked batch into a block of rows and inserts it
//! below the header region of the current month's sheet.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use netflow_core::{ReportOffset, ScanResult, UtcDateTime};
use serde::{Deserialize, Serialize};

use crate::surface::{Cell, CellRange, NumberFormat, ReportSurface, HEADER_ROWS};
use crate::ReportError;

pub const HEADER_LABELS: [&str; 9] = [
    "Time",
    "Symbol",
    "Price",
    "24h Amount",
    "Buy Volume",
    "Sell Volume",
    "Net Inflow",
    "CMF",
    "Stop Loss",
];
pub const PLACEHOLDER_TEXT: &str = "no qualifying symbol";
pub const SHEET_SUFFIX: &str = "Binance-NetInflow";

/// Amount, buy, sell and net inflow columns (D..=G).
const MILLIONS_COLUMNS: (usize, usize) = (3, 7);
/// Stop-loss column (I).
const CURRENCY_COLUMN: usize = 8;

/// What to write when a cycle produced no qualifying symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBatchPolicy {
    /// Write nothing.
    #[default]
    Skip,
    /// Write the header, one placeholder row and the separator.
    Placeholder,
}

impl EmptyBatchPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Placeholder => "placeholder",
        }
    }
}

impl FromStr for EmptyBatchPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(format!(
                "unknown empty batch policy '{other}', expected skip or placeholder"
            )),
        }
    }
}

impl Display for EmptyBatchPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublishOutcome {
    Written { sheet: String, data_rows: usize },
    SkippedEmpty,
}

/// Writes scan batches to a report surface.
#[derive(Clone)]
pub struct ReportSink {
    surface: Arc<dyn ReportSurface>,
    offset: ReportOffset,
    empty_policy: EmptyBatchPolicy,
}

impl ReportSink {
    pub fn new(surface: Arc<dyn ReportSurface>) -> Self {
        Self {
            surface,
            offset: ReportOffset::UTC,
            empty_policy: EmptyBatchPolicy::default(),
        }
    }

    pub fn offset(mut self, offset: ReportOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn empty_policy(mut self, policy: EmptyBatchPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    /// `YYYY-MM-Binance-NetInflow` for the month `now` falls in.
    pub fn sheet_title(&self, now: UtcDateTime) -> String {
        format!("{}-{SHEET_SUFFIX}", now.year_month(self.offset))
    }

    /// Header row, one row per result, blank separator.
    pub fn build_block(&self, results: &[ScanResult]) -> Vec<Vec<Cell>> {
        let mut block = Vec::with_capacity(results.len() + 2);
        block.push(header_row());
        block.extend(results.iter().map(|result| self.result_row(result)));
        block.push(Vec::new());
        block
    }

    fn result_row(&self, result: &ScanResult) -> Vec<Cell> {
        vec![
            Cell::text(result.time.format_short(self.offset)),
            Cell::text(result.symbol.as_str()),
            Cell::Number(result.price),
            Cell::Number(result.amount),
            Cell::Number(result.buy_volume),
            Cell::Number(result.sell_volume),
            Cell::Number(result.net_inflow),
            Cell::optional_number(result.money_flow),
            Cell::optional_number(result.stop_loss),
        ]
    }

    /// Inserts the batch directly below the header region, pushing earlier
    /// batches down.
    ///
    /// # Errors
    /// Returns the surface error of the first failing write.
    pub async fn publish(
        &self,
        results: &[ScanResult],
        now: UtcDateTime,
    ) -> Result<PublishOutcome, ReportError> {
        let block = if results.is_empty() {
            match self.empty_policy {
                EmptyBatchPolicy::Skip => {
                    tracing::info!("no qualifying symbol this cycle, nothing written");
                    return Ok(PublishOutcome::SkippedEmpty);
                }
                EmptyBatchPolicy::Placeholder => vec![
                    header_row(),
                    vec![
                        Cell::text(now.format_short(self.offset)),
                        Cell::text(PLACEHOLDER_TEXT),
                    ],
                    Vec::new(),
                ],
            }
        } else {
            self.build_block(results)
        };

        let title = self.sheet_title(now);
        let sheet = self.surface.ensure_sheet(&title).await?;
        self.surface.insert_rows(&sheet, HEADER_ROWS, block).await?;

        if !results.is_empty() {
            let first_data_row = HEADER_ROWS + 1;
            let end_row = first_data_row + results.len();
            let millions = CellRange::new(
                first_data_row,
                end_row,
                MILLIONS_COLUMNS.0,
                MILLIONS_COLUMNS.1 + 1,
            )?;
            let currency =
                CellRange::new(first_data_row, end_row, CURRENCY_COLUMN, CURRENCY_COLUMN + 1)?;
            self.surface
                .format_range(&sheet, millions, NumberFormat::Millions)
                .await?;
            self.surface
                .format_range(&sheet, currency, NumberFormat::Currency)
                .await?;
        }

        for result in results {
            if let Some(ratio) = result.money_flow.filter(|ratio| *ratio > 0.0) {
                tracing::info!(
                    symbol = %result.symbol,
                    cmf = ratio,
                    net_inflow = result.net_inflow,
                    "buyers dominate"
                );
            }
        }

        tracing::info!(
            sheet = %title,
            surface = self.surface.name(),
            rows = results.len(),
            "report batch written"
        );
        Ok(PublishOutcome::Written {
            sheet: title,
            data_rows: results.len(),
        })
    }
}

fn header_row() -> Vec<Cell> {
    HEADER_LABELS.iter().map(|label| Cell::text(*label)).collect()
}
