//! Report surface contract.
//!
//! A surface is a set of named sheets, each a grid of cells addressed by
//! zero-based row and column. Sheets start with a blank header region of
//! [`HEADER_ROWS`] rows; batches are inserted directly below it.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ReportError;

/// Blank rows at the top of every sheet.
pub const HEADER_ROWS: usize = 2;
/// Grid size of a freshly created sheet.
pub const DEFAULT_SHEET_ROWS: usize = 2_000;
pub const DEFAULT_SHEET_COLUMNS: usize = 10;

pub type SurfaceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ReportError>> + Send + 'a>>;

/// One cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Blank,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn optional_number(value: Option<f64>) -> Self {
        value.map_or(Self::Blank, Self::Number)
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }

    /// Wire value for spreadsheet APIs; blanks are empty strings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Blank => Value::String(String::new()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(number) => serde_json::Number::from_f64(*number)
                .map_or_else(|| Value::String(number.to_string()), Value::Number),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Blank,
            Value::String(text) if text.is_empty() => Self::Blank,
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(number) => number.as_f64().map_or(Self::Blank, Self::Number),
            Value::Bool(flag) => Self::Text(flag.to_string().to_ascii_uppercase()),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Display formats applied to numeric cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// `1234567.8` renders as `1.23M`.
    Millions,
    /// `93.1` renders as `$93.10`.
    Currency,
}

impl NumberFormat {
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::Millions => r#"#,##0.00,,"M""#,
            Self::Currency => "\"$\"#,##0.00",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Millions => "millions",
            Self::Currency => "currency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "millions" => Some(Self::Millions),
            "currency" => Some(Self::Currency),
            _ => None,
        }
    }
}

/// Zero-based, half-open block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl CellRange {
    pub fn new(
        start_row: usize,
        end_row: usize,
        start_column: usize,
        end_column: usize,
    ) -> Result<Self, ReportError> {
        if start_row >= end_row || start_column >= end_column {
            return Err(ReportError::Rejected(format!(
                "empty cell range rows {start_row}..{end_row} columns {start_column}..{end_column}"
            )));
        }
        Ok(Self {
            start_row,
            end_row,
            start_column,
            end_column,
        })
    }

    pub fn contains(&self, row: usize, column: usize) -> bool {
        (self.start_row..self.end_row).contains(&row)
            && (self.start_column..self.end_column).contains(&column)
    }

    /// Same block moved `rows` rows down.
    pub fn shifted_down(&self, rows: usize) -> Self {
        Self {
            start_row: self.start_row + rows,
            end_row: self.end_row + rows,
            ..*self
        }
    }

    /// A1 notation without a sheet prefix, e.g. `D4:G6`.
    pub fn a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letter(self.start_column),
            self.start_row + 1,
            column_letter(self.end_column - 1),
            self.end_row
        )
    }
}

impl Display for CellRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.a1())
    }
}

/// Spreadsheet column name for a zero-based index: 0 → `A`, 26 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push(char::from(b'A' + offset as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Resolved sheet on a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetHandle {
    pub sheet_id: i64,
    pub title: String,
}

/// Storage for report sheets.
pub trait ReportSurface: Send + Sync {
    /// Short surface name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the sheet titled `title`, creating it with a blank header
    /// region when it does not exist.
    fn ensure_sheet<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, SheetHandle>;

    /// Inserts `rows` so the first lands at `at_row`, shifting existing rows
    /// at or below it downward. Nothing is overwritten.
    fn insert_rows<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        at_row: usize,
        rows: Vec<Vec<Cell>>,
    ) -> SurfaceFuture<'a, ()>;

    fn format_range<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        range: CellRange,
        format: NumberFormat,
    ) -> SurfaceFuture<'a, ()>;

    /// Reads a sheet top to bottom, see [`normalize_rows`] for the shape.
    fn read_rows<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, Vec<Vec<Cell>>>;
}

/// Canonical read shape shared by every surface: trailing blank cells of each
/// row and trailing blank rows are dropped, interior blanks are kept.
pub fn normalize_rows(rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    let mut rows: Vec<Vec<Cell>> = rows
        .into_iter()
        .map(|mut row| {
            while row.last().is_some_and(Cell::is_blank) {
                row.pop();
            }
            row
        })
        .collect();
    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }
    rows
}
