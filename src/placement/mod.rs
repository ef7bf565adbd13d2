//! Row placement: append one shaped row at the first truly-empty position.
//!
//! "Empty" means every cell is blank or whitespace — trailing rows that only
//! look empty are skipped over when computing the append index, so a sheet
//! with decorative blank rows never gets data written into the middle of its
//! history, and existing rows are never overwritten.

use tracing::{debug, warn};

use crate::error::SheetsError;
use crate::models::{Category, ControlRecord, Observation};
use crate::sheets::SpreadsheetClient;

/// Rows to over-allocate beyond the immediate deficit when the grid is full,
/// so repeated daily appends do not grow the sheet one row at a time.
const GROW_SLACK_ROWS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Appended { row: u32 },
    WorksheetMissing,
    UnknownCategory,
}

/// Append `observation` to the record's target worksheet.
///
/// A missing worksheet or an unrecognized category is a reported no-op, not a
/// failure; only spreadsheet API errors propagate.
pub async fn append_observation(
    client: &dyn SpreadsheetClient,
    record: &ControlRecord,
    observation: &Observation,
) -> Result<Placement, SheetsError> {
    let ws = match client
        .worksheet(&record.target_sheet_id, &record.target_worksheet_name)
        .await
    {
        Ok(ws) => ws,
        Err(SheetsError::WorksheetNotFound { .. }) => {
            warn!(
                "Worksheet {:?} not found in spreadsheet {}, skipping",
                record.target_worksheet_name, record.target_sheet_id
            );
            return Ok(Placement::WorksheetMissing);
        }
        Err(e) => return Err(e),
    };

    let Some(category) = Category::parse(&record.category) else {
        warn!(
            "Unexpected category {:?} for {}, skipping",
            record.category,
            record.display_name()
        );
        return Ok(Placement::UnknownCategory);
    };

    let row = category.shape_row(observation);

    let existing = client.read_rows(&ws).await?;
    let append_index = last_nonblank_row(&existing) + 1;

    if append_index > ws.row_count {
        let grow_by = append_index - ws.row_count + GROW_SLACK_ROWS;
        debug!(
            "{}/{}: capacity {} < append index {}, growing by {}",
            ws.spreadsheet_id, ws.title, ws.row_count, append_index, grow_by
        );
        client.add_rows(&ws, grow_by).await?;
    }

    client.write_row(&ws, append_index, &row).await?;
    Ok(Placement::Appended { row: append_index })
}

/// 1-based index of the last row with at least one non-whitespace cell;
/// 0 when every row is blank.
fn last_nonblank_row(rows: &[Vec<String>]) -> u32 {
    let mut last = 0u32;
    for (i, row) in rows.iter().enumerate() {
        if row.iter().any(|cell| !cell.trim().is_empty()) {
            last = (i + 1) as u32;
        }
    }
    last
}

// ── Tests ─────────────────────────────────────────────────────────────────────
