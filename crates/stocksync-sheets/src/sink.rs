//! The tabular surface the synchronizer writes through.

use std::future::Future;

use crate::error::SheetsError;

/// Grid capacity of a worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorksheetSize {
    pub rows: u32,
    pub columns: u32,
}

impl WorksheetSize {
    #[must_use]
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Smallest grid that holds `self` and `rows x columns` cells.
    #[must_use]
    pub fn covering(self, rows: usize, columns: usize) -> Self {
        Self {
            rows: self.rows.max(saturating_u32(rows)),
            columns: self.columns.max(saturating_u32(columns)),
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// A spreadsheet made of named worksheets holding rows of text cells.
///
/// Writes always start at the top-left cell and store values verbatim; the
/// sink never interprets a cell as a number, date or formula.
pub trait SpreadsheetSink {
    /// Creates `name` with `size` if no worksheet has that name.
    ///
    /// Returns `true` when the worksheet was created.
    fn ensure_worksheet(
        &self,
        name: &str,
        size: WorksheetSize,
    ) -> impl Future<Output = Result<bool, SheetsError>> + Send;

    /// Removes every value from `name`. Grid size is unchanged.
    fn clear(&self, name: &str) -> impl Future<Output = Result<(), SheetsError>> + Send;

    /// Rows of `name` up to the last non-empty one, trailing empty cells
    /// trimmed from each row.
    fn read_all(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, SheetsError>> + Send;

    /// Writes `rows` starting at A1 in one call, growing the grid first when
    /// it is too small.
    fn write_rows(
        &self,
        name: &str,
        rows: &[Vec<String>],
    ) -> impl Future<Output = Result<(), SheetsError>> + Send;
}
