//! Google Sheets surface and its service-account authentication.

pub mod auth;
pub mod client;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, StaticToken, TokenSource};
pub use client::{quote_sheet_title, SheetsSurface, DEFAULT_SHEETS_URL};
