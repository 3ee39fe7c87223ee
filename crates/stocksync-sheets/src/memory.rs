//! In-memory [`SpreadsheetSink`] for tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::SheetsError;
use crate::sink::{SpreadsheetSink, WorksheetSize};

#[derive(Debug, Clone, Default)]
struct Worksheet {
    size: Option<WorksheetSize>,
    cells: Vec<Vec<String>>,
}

/// Worksheets held in a map, with a call log and injectable failures.
#[derive(Debug, Default)]
pub struct MemorySpreadsheet {
    sheets: Mutex<BTreeMap<String, Worksheet>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
}

impl MemorySpreadsheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a worksheet with `rows`, as if written by someone else.
    #[must_use]
    pub fn with_sheet(self, name: &str, rows: Vec<Vec<String>>) -> Self {
        lock(&self.sheets).insert(
            name.to_string(),
            Worksheet {
                size: None,
                cells: rows,
            },
        );
        self
    }

    /// Makes every later operation on `name` fail.
    pub fn fail_on(&self, name: &str) {
        lock(&self.failing).push(name.to_string());
    }

    /// Current rows of `name`, or `None` if the worksheet does not exist.
    #[must_use]
    pub fn rows(&self, name: &str) -> Option<Vec<Vec<String>>> {
        lock(&self.sheets).get(name).map(|ws| visible_rows(&ws.cells))
    }

    /// Grid size `name` was created with, if it was created through the sink.
    #[must_use]
    pub fn size(&self, name: &str) -> Option<WorksheetSize> {
        lock(&self.sheets).get(name).and_then(|ws| ws.size)
    }

    /// Operations performed so far, as `op:sheet` strings.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, op: &str, name: &str) -> Result<(), SheetsError> {
        lock(&self.calls).push(format!("{op}:{name}"));
        if lock(&self.failing).iter().any(|n| n == name) {
            return Err(SheetsError::Api {
                operation: op.to_string(),
                status: 503,
                body: format!("injected failure for '{name}'"),
            });
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn visible_rows(cells: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = cells
        .iter()
        .map(|row| {
            let end = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            row[..end].to_vec()
        })
        .collect();
    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }
    rows
}

impl SpreadsheetSink for MemorySpreadsheet {
    async fn ensure_worksheet(&self, name: &str, size: WorksheetSize) -> Result<bool, SheetsError> {
        self.record("ensure", name)?;
        let mut sheets = lock(&self.sheets);
        if sheets.contains_key(name) {
            return Ok(false);
        }
        sheets.insert(
            name.to_string(),
            Worksheet {
                size: Some(size),
                cells: Vec::new(),
            },
        );
        Ok(true)
    }

    async fn clear(&self, name: &str) -> Result<(), SheetsError> {
        self.record("clear", name)?;
        let mut sheets = lock(&self.sheets);
        let sheet = sheets
            .get_mut(name)
            .ok_or_else(|| SheetsError::WorksheetNotFound(name.to_string()))?;
        sheet.cells.clear();
        Ok(())
    }

    async fn read_all(&self, name: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        self.record("read", name)?;
        lock(&self.sheets)
            .get(name)
            .map(|ws| visible_rows(&ws.cells))
            .ok_or_else(|| SheetsError::WorksheetNotFound(name.to_string()))
    }

    async fn write_rows(&self, name: &str, rows: &[Vec<String>]) -> Result<(), SheetsError> {
        self.record("write", name)?;
        let mut sheets = lock(&self.sheets);
        let sheet = sheets
            .get_mut(name)
            .ok_or_else(|| SheetsError::WorksheetNotFound(name.to_string()))?;

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if let Some(size) = sheet.size {
            sheet.size = Some(size.covering(rows.len(), width));
        }
        if sheet.cells.len() < rows.len() {
            sheet.cells.resize(rows.len(), Vec::new());
        }
        for (target, source) in sheet.cells.iter_mut().zip(rows) {
            if target.len() < source.len() {
                target.resize(source.len(), String::new());
            }
            target[..source.len()].clone_from_slice(source);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[tokio::test]
    async fn write_overwrites_from_top_left_and_keeps_the_rest() {
        let sheet = MemorySpreadsheet::new()
            .with_sheet("s", vec![row(&["a", "b", "c"]), row(&["d"]), row(&["e"])]);

        sheet.write_rows("s", &[row(&["x"]), row(&["y", "z"])]).await.unwrap();

        assert_eq!(
            sheet.rows("s").unwrap(),
            vec![row(&["x", "b", "c"]), row(&["y", "z"]), row(&["e"])]
        );
    }

    #[tokio::test]
    async fn ensure_reports_creation_once() {
        let sheet = MemorySpreadsheet::new();
        let size = WorksheetSize::new(10, 2);
        assert!(sheet.ensure_worksheet("m", size).await.unwrap());
        assert!(!sheet.ensure_worksheet("m", size).await.unwrap());
        assert_eq!(sheet.size("m"), Some(size));
    }

    #[tokio::test]
    async fn write_grows_recorded_grid() {
        let sheet = MemorySpreadsheet::new();
        sheet.ensure_worksheet("m", WorksheetSize::new(1, 1)).await.unwrap();
        sheet
            .write_rows("m", &[row(&["a", "b", "c"]), row(&["d"])])
            .await
            .unwrap();
        assert_eq!(sheet.size("m"), Some(WorksheetSize::new(2, 3)));
    }

    #[tokio::test]
    async fn injected_failure_is_api_error() {
        let sheet = MemorySpreadsheet::new().with_sheet("s", vec![]);
        sheet.fail_on("s");
        let err = sheet.read_all("s").await.unwrap_err();
        assert!(matches!(err, SheetsError::Api { status: 503, .. }));
        assert_eq!(sheet.calls(), vec!["read:s".to_string()]);
    }

    #[tokio::test]
    async fn missing_sheet_is_not_found() {
        let sheet = MemorySpreadsheet::new();
        let err = sheet.clear("nope").await.unwrap_err();
        assert!(matches!(err, SheetsError::WorksheetNotFound(ref n) if n == "nope"));
    }
}
