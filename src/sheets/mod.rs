//! Spreadsheet capability used by the router and the placement engine.
//!
//! The trait mirrors exactly what this system needs from a sheets backend:
//! resolve a worksheet by title (failing distinctly when absent), read every
//! row, grow row capacity, and write one row at a 1-based index. Production
//! talks to the Sheets v4 REST API; tests use an in-memory fake.

pub mod rest;

pub use rest::RestSheetsClient;

use async_trait::async_trait;

use crate::error::SheetsError;

/// Handle to a resolved worksheet. `row_count` is the grid capacity at
/// resolution time, not the number of populated rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub spreadsheet_id: String,
    pub sheet_id: i64,
    pub title: String,
    pub row_count: u32,
}

#[async_trait]
pub trait SpreadsheetClient: Send + Sync {
    /// Resolve a worksheet by title within a spreadsheet.
    async fn worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<Worksheet, SheetsError>;

    /// All populated rows, as rendered strings. Trailing empty rows within
    /// the grid capacity are not included.
    async fn read_rows(&self, ws: &Worksheet) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Grow the worksheet's row capacity by `count` rows.
    async fn add_rows(&self, ws: &Worksheet, count: u32) -> Result<(), SheetsError>;

    /// Write `values` starting at column A of the given 1-based row index.
    async fn write_row(
        &self,
        ws: &Worksheet,
        row_index: u32,
        values: &[String],
    ) -> Result<(), SheetsError>;
}

#[cfg(test)]
pub(crate) mod fake;
