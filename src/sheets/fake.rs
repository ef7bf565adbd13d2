//! In-memory stand-in for the spreadsheet capability, for placement and
//! router tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SpreadsheetClient, Worksheet};
use crate::error::SheetsError;

#[derive(Debug)]
pub struct FakeWorksheet {
    pub sheet_id: i64,
    pub row_count: u32,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct FakeSheets {
    inner: Mutex<HashMap<(String, String), FakeWorksheet>>,
}

impl FakeSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        spreadsheet_id: &str,
        title: &str,
        row_count: u32,
        rows: Vec<Vec<String>>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        let sheet_id = inner.len() as i64 + 1;
        inner.insert(
            (spreadsheet_id.to_string(), title.to_string()),
            FakeWorksheet {
                sheet_id,
                row_count,
                rows,
            },
        );
    }

    pub fn rows(&self, spreadsheet_id: &str, title: &str) -> Vec<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        inner[&(spreadsheet_id.to_string(), title.to_string())]
            .rows
            .clone()
    }

    pub fn capacity(&self, spreadsheet_id: &str, title: &str) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner[&(spreadsheet_id.to_string(), title.to_string())].row_count
    }
}

#[async_trait]
impl SpreadsheetClient for FakeSheets {
    async fn worksheet(&self, spreadsheet_id: &str, title: &str) -> Result<Worksheet, SheetsError> {
        let inner = self.inner.lock().unwrap();
        inner
            .get(&(spreadsheet_id.to_string(), title.to_string()))
            .map(|ws| Worksheet {
                spreadsheet_id: spreadsheet_id.to_string(),
                sheet_id: ws.sheet_id,
                title: title.to_string(),
                row_count: ws.row_count,
            })
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                spreadsheet_id: spreadsheet_id.to_string(),
                title: title.to_string(),
            })
    }

    async fn read_rows(&self, ws: &Worksheet) -> Result<Vec<Vec<String>>, SheetsError> {
        Ok(self.rows(&ws.spreadsheet_id, &ws.title))
    }

    async fn add_rows(&self, ws: &Worksheet, count: u32) -> Result<(), SheetsError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .get_mut(&(ws.spreadsheet_id.clone(), ws.title.clone()))
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                spreadsheet_id: ws.spreadsheet_id.clone(),
                title: ws.title.clone(),
            })?;
        entry.row_count += count;
        Ok(())
    }

    async fn write_row(
        &self,
        ws: &Worksheet,
        row_index: u32,
        values: &[String],
    ) -> Result<(), SheetsError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner
            .get_mut(&(ws.spreadsheet_id.clone(), ws.title.clone()))
            .ok_or_else(|| SheetsError::WorksheetNotFound {
                spreadsheet_id: ws.spreadsheet_id.clone(),
                title: ws.title.clone(),
            })?;

        let idx = row_index as usize;
        if entry.rows.len() < idx {
            entry.rows.resize(idx, Vec::new());
        }
        entry.rows[idx - 1] = values.to_vec();
        Ok(())
    }
}
