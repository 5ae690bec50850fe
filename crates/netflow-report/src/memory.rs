use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::surface::{
    normalize_rows, Cell, CellRange, NumberFormat, ReportSurface, SheetHandle, SurfaceFuture,
    HEADER_ROWS,
};
use crate::ReportError;

#[derive(Debug, Default)]
struct MemorySheet {
    sheet_id: i64,
    rows: Vec<Vec<Cell>>,
    formats: Vec<(CellRange, NumberFormat)>,
}

/// Process-local surface for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    sheets: Mutex<BTreeMap<String, MemorySheet>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_titles(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Format applied to a cell, if any. Later formats win.
    pub fn format_at(&self, title: &str, row: usize, column: usize) -> Option<NumberFormat> {
        self.lock().get(title).and_then(|sheet| {
            sheet
                .formats
                .iter()
                .rev()
                .find(|(range, _)| range.contains(row, column))
                .map(|(_, format)| *format)
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemorySheet>> {
        self.sheets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportSurface for MemorySurface {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ensure_sheet<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, SheetHandle> {
        Box::pin(async move {
            let mut sheets = self.lock();
            let next_id = sheets.len() as i64 + 1;
            let sheet = sheets.entry(title.to_owned()).or_insert_with(|| MemorySheet {
                sheet_id: next_id,
                rows: vec![Vec::new(); HEADER_ROWS],
                formats: Vec::new(),
            });

            Ok(SheetHandle {
                sheet_id: sheet.sheet_id,
                title: title.to_owned(),
            })
        })
    }

    fn insert_rows<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        at_row: usize,
        rows: Vec<Vec<Cell>>,
    ) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            let mut sheets = self.lock();
            let target = sheets
                .get_mut(&sheet.title)
                .ok_or_else(|| ReportError::Rejected(format!("unknown sheet '{}'", sheet.title)))?;

            if target.rows.len() < at_row {
                target.rows.resize(at_row, Vec::new());
            }
            let inserted = rows.len();
            target.rows.splice(at_row..at_row, rows);

            for (range, _) in &mut target.formats {
                if range.start_row >= at_row {
                    *range = range.shifted_down(inserted);
                }
            }
            Ok(())
        })
    }

    fn format_range<'a>(
        &'a self,
        sheet: &'a SheetHandle,
        range: CellRange,
        format: NumberFormat,
    ) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            let mut sheets = self.lock();
            let target = sheets
                .get_mut(&sheet.title)
                .ok_or_else(|| ReportError::Rejected(format!("unknown sheet '{}'", sheet.title)))?;
            target.formats.push((range, format));
            Ok(())
        })
    }

    fn read_rows<'a>(&'a self, title: &'a str) -> SurfaceFuture<'a, Vec<Vec<Cell>>> {
        Box::pin(async move {
            let sheets = self.lock();
            let sheet = sheets
                .get(title)
                .ok_or_else(|| ReportError::Rejected(format!("unknown sheet '{title}'")))?;
            Ok(normalize_rows(sheet.rows.clone()))
        })
    }
}
