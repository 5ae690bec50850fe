//! Report output for netflow.
//!
//! A [`ReportSurface`] is a set of monthly sheets. Three surfaces exist:
//! - [`SheetsSurface`]: Google Sheets v4 over a service-account token
//! - [`WarehouseSurface`]: local `DuckDB` file with the same insert semantics
//! - [`MemorySurface`]: process-local, for dry runs and tests
//!
//! [`ReportSink`] turns a ranked batch into rows and writes it.

pub mod error;
pub mod memory;
pub mod sheets;
pub mod sink;
pub mod surface;
pub mod warehouse;

pub use error::ReportError;
pub use memory::MemorySurface;
pub use sheets::{ServiceAccountAuth, ServiceAccountKey, SheetsSurface, StaticToken, TokenSource};
pub use sink::{EmptyBatchPolicy, PublishOutcome, ReportSink, HEADER_LABELS};
pub use surface::{Cell, CellRange, NumberFormat, ReportSurface, SheetHandle, HEADER_ROWS};
pub use warehouse::{WarehouseConfig, WarehouseSurface};
