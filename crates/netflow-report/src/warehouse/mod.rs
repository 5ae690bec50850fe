//! # Warehouse surface
//!
//! Local `DuckDB` rendition of a report spreadsheet. Sheets, cells and
//! number formats live in three tables; inserting rows shifts the row index
//! of everything at or below the insert point, mirroring a spreadsheet.
//!
//! | Table | Description |
//! |-------|-------------|
//! | `report_sheets` | One row per sheet title with its grid size |
//! | `report_cells` | Non-blank cells by sheet/row/column |
//! | `report_formats` | Number formats applied to cell ranges |
//! | `schema_migrations` | Applied migration versions |

mod migrations;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ::duckdb::{Connection, OptionalExt, ToSql};

use crate::surface::{
    normalize_rows, Cell, CellRange, NumberFormat, ReportSurface, SheetHandle, SurfaceFuture,
    DEFAULT_SHEET_COLUMNS, DEFAULT_SHEET_ROWS,
};
use crate::ReportError;

/// Configuration for the warehouse surface.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl WarehouseConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// Report surface stored in a local `DuckDB` file.
///
/// The sink is the only writer, so one connection behind a mutex serves
/// every operation.
#[derive(Clone)]
pub struct WarehouseSurface {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl WarehouseSurface {
    /// Opens (and migrates) the database at `config.db_path`.
    pub fn open(config: WarehouseConfig) -> Result<Self, ReportError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(&config.db_path)?;
        connection.execute_batch("PRAGMA disable_progress_bar;")?;
        migrations::apply_migrations(&connection)?;

        tracing::debug!(path = %config.db_path.display(), "warehouse surface ready");
        Ok(Self {
            db_path: config.db_path,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number formats stored for `title`, oldest first.
    pub fn formats(&self, title: &str) -> Result<Vec<(CellRange, NumberFormat)>, ReportError> {
        with_connection(&self.connection, |connection| {
            let sheet_id = require_sheet_id(connection, title)?;
            let mut statement = connection.prepare(
                "SELECT start_row, end_row, start_column, end_column, number_format \
                 FROM report_formats WHERE sheet_id = ? ORDER BY format_seq",
            )?;
            let rows = statement.query_map([sheet_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut formats = Vec::new();
            for row in rows {
                let (start_row, end_row, start_column, end_column, format) = row?;
                let format = NumberFormat::parse(&format).ok_or_else(|| {
                    ReportError::Rejected(format!("unknown number format '{format}'"))
                })?;
                let range = CellRange::new(
                    from_sql_index(start_row)?,
                    from_sql_index(end_row)?,
                    from_sql_index(start_column)?,
                    from_sql_index(end_column)?,
                )?;
                formats.push((range, format));
            }
            Ok(formats)
        })
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, ReportError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ReportError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || with_connection(&connection, work)).await?
    }
}

fn with_connection<T>(
    connection: &Mutex<Connection>,
    work: impl FnOnce(&Connection) -> Result<T, ReportError>,
) -> Result<T, ReportError> {
    let guard = connection.lock().unwrap_or_else(PoisonError::into_inner);
    work(&*guard)
}

/// Commits on success, rolls back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, ReportError>,
) -> Result<T, ReportError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

impl ReportSurface for WarehouseSurface {
    fn name(&self) -> &'static str {
        "warehouse"
    }

    fn ensure_sheet<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, SheetHandle> {
        let title = title.to_owned();
        Box::pin(self.blocking(move |connection| {
            if let Some(sheet_id) = find_sheet_id(connection, &title)? {
                return Ok(SheetHandle { sheet_id, title });
            }

            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<i64, ReportError> {
                let sheet_id: i64 = connection.query_row(
                    "SELECT COALESCE(MAX(sheet_id), 0) + 1 FROM report_sheets",
                    [],
                    |row| row.get(0),
                )?;
                let row_count = to_sql_index(DEFAULT_SHEET_ROWS)?;
                let column_count = to_sql_index(DEFAULT_SHEET_COLUMNS)?;
                let params: [&dyn ToSql; 4] = [&sheet_id, &title, &row_count, &column_count];
                connection.execute(
                    "INSERT INTO report_sheets (sheet_id, title, row_count, column_count, created_at) \
                     VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)",
                    params.as_slice(),
                )?;
                Ok(sheet_id)
            })();
            let sheet_id = finalize_transaction(connection, result)?;

            tracing::info!(sheet = %title, sheet_id, "created warehouse sheet");
            Ok(SheetHandle { sheet_id, title })
        }))
    }

    fn insert_rows<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        at_row: usize,
        rows: Vec<Vec<Cell>>,
    ) -> SurfaceFuture<'a, ()> {
        let title = sheet.title.clone();
        Box::pin(self.blocking(move |connection| {
            let sheet_id = require_sheet_id(connection, &title)?;
            let at_row = to_sql_index(at_row)?;
            let inserted = to_sql_index(rows.len())?;

            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<(), ReportError> {
                let params: [&dyn ToSql; 3] = [&inserted, &sheet_id, &at_row];
                connection.execute(
                    "UPDATE report_cells SET row_index = row_index + ? \
                     WHERE sheet_id = ? AND row_index >= ?",
                    params.as_slice(),
                )?;
                let params: [&dyn ToSql; 4] = [&inserted, &inserted, &sheet_id, &at_row];
                connection.execute(
                    "UPDATE report_formats SET start_row = start_row + ?, end_row = end_row + ? \
                     WHERE sheet_id = ? AND start_row >= ?",
                    params.as_slice(),
                )?;

                let mut statement = connection.prepare(
                    "INSERT INTO report_cells \
                     (sheet_id, row_index, column_index, text_value, number_value) \
                     VALUES (?, ?, ?, ?, ?)",
                )?;
                for (offset, row) in rows.iter().enumerate() {
                    let row_index = at_row + to_sql_index(offset)?;
                    for (column, cell) in row.iter().enumerate() {
                        let column_index = to_sql_index(column)?;
                        let (text, number): (Option<&str>, Option<f64>) = match cell {
                            Cell::Blank => continue,
                            Cell::Text(text) => (Some(text.as_str()), None),
                            Cell::Number(number) => (None, Some(*number)),
                        };
                        let params: [&dyn ToSql; 5] =
                            [&sheet_id, &row_index, &column_index, &text, &number];
                        statement.execute(params.as_slice())?;
                    }
                }

                let params: [&dyn ToSql; 2] = [&inserted, &sheet_id];
                connection.execute(
                    "UPDATE report_sheets SET row_count = row_count + ? WHERE sheet_id = ?",
                    params.as_slice(),
                )?;
                Ok(())
            })();
            finalize_transaction(connection, result)
        }))
    }

    fn format_range<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        range: CellRange,
        format: NumberFormat,
    ) -> SurfaceFuture<'a, ()> {
        let title = sheet.title.clone();
        Box::pin(self.blocking(move |connection| {
            let sheet_id = require_sheet_id(connection, &title)?;
            let start_row = to_sql_index(range.start_row)?;
            let end_row = to_sql_index(range.end_row)?;
            let start_column = to_sql_index(range.start_column)?;
            let end_column = to_sql_index(range.end_column)?;
            let format = format.as_str();
            let params: [&dyn ToSql; 6] = [
                &sheet_id,
                &start_row,
                &end_row,
                &start_column,
                &end_column,
                &format,
            ];
            connection.execute(
                "INSERT INTO report_formats \
                 (format_seq, sheet_id, start_row, end_row, start_column, end_column, number_format) \
                 VALUES (nextval('report_format_seq'), ?, ?, ?, ?, ?, ?)",
                params.as_slice(),
            )?;
            Ok(())
        }))
    }

    fn read_rows<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, Vec<Vec<Cell>>> {
        let title = title.to_owned();
        Box::pin(self.blocking(move |connection| {
            let sheet_id = require_sheet_id(connection, &title)?;
            let mut statement = connection.prepare(
                "SELECT row_index, column_index, text_value, number_value \
                 FROM report_cells WHERE sheet_id = ? ORDER BY row_index, column_index",
            )?;
            let cells = statement.query_map([sheet_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })?;

            let mut grid: Vec<Vec<Cell>> = Vec::new();
            for cell in cells {
                let (row_index, column_index, text, number) = cell?;
                let (row_index, column_index) =
                    (from_sql_index(row_index)?, from_sql_index(column_index)?);
                if grid.len() <= row_index {
                    grid.resize(row_index + 1, Vec::new());
                }
                let row = &mut grid[row_index];
                if row.len() <= column_index {
                    row.resize(column_index + 1, Cell::Blank);
                }
                row[column_index] = match (text, number) {
                    (Some(text), _) => Cell::Text(text),
                    (None, Some(number)) => Cell::Number(number),
                    (None, None) => Cell::Blank,
                };
            }
            Ok(normalize_rows(grid))
        }))
    }
}

fn find_sheet_id(connection: &Connection, title: &str) -> Result<Option<i64>, ReportError> {
    let params: [&dyn ToSql; 1] = [&title];
    let sheet_id = connection
        .query_row(
            "SELECT sheet_id FROM report_sheets WHERE title = ?",
            params.as_slice(),
            |row| row.get(0),
        )
        .optional()?;
    Ok(sheet_id)
}

fn require_sheet_id(connection: &Connection, title: &str) -> Result<i64, ReportError> {
    find_sheet_id(connection, title)?
        .ok_or_else(|| ReportError::Rejected(format!("unknown sheet '{title}'")))
}

fn to_sql_index(value: usize) -> Result<i64, ReportError> {
    i64::try_from(value).map_err(|_| ReportError::Rejected(format!("index {value} out of range")))
}

fn from_sql_index(value: i64) -> Result<usize, ReportError> {
    usize::try_from(value)
        .map_err(|_| ReportError::Rejected(format!("stored index {value} is negative")))
}
