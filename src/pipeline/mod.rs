//! Record router: control list → fetch (with retry) → placement.
//!
//! One record's failure never aborts the batch. The only fatal paths are the
//! ones before any record is processed: unreadable master worksheet, missing
//! secrets, client construction. Everything after that is caught, logged
//! with the record's identity, and recorded in the run report.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::fetcher::QuoteSource;
use crate::models::ControlRecord;
use crate::placement::{self, Placement};
use crate::retry::with_retry;
use crate::sheets::SpreadsheetClient;

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Raw rows of the master control worksheet, header included.
    /// Shared with the `check` command.
    pub async fn control_rows(
        &self,
        sheets: &dyn SpreadsheetClient,
    ) -> Result<Vec<Vec<String>>> {
        let cfg = &self.config.sheets;
        ensure!(
            !cfg.master_sheet_id.is_empty(),
            "sheets.master_sheet_id is required (set ICIS_SYNC_SHEETS__MASTER_SHEET_ID)"
        );

        let master = sheets
            .worksheet(&cfg.master_sheet_id, &cfg.master_worksheet)
            .await
            .with_context(|| {
                format!(
                    "Could not open control worksheet {:?} in {}",
                    cfg.master_worksheet, cfg.master_sheet_id
                )
            })?;

        sheets
            .read_rows(&master)
            .await
            .context("Could not read control worksheet")
    }

    pub async fn run(
        &self,
        sheets: &dyn SpreadsheetClient,
        source: &dyn QuoteSource,
    ) -> Result<RunReport> {
        let started_at = Utc::now().naive_utc();
        let rows = self.control_rows(sheets).await?;
        info!(
            "{} control rows ({} records after header)",
            rows.len(),
            rows.len().saturating_sub(1)
        );

        let mut outcomes = Vec::new();

        // Row 1 is the header; control-sheet row numbers start at 2.
        for (idx, cells) in rows.iter().enumerate().skip(1) {
            let row_number = idx + 1;
            info!("--- Control row {} ---", row_number);

            let record = match ControlRecord::from_row(row_number, cells) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: skipped ({})", row_number, e);
                    outcomes.push(RecordOutcome {
                        row_number,
                        label: cells.first().cloned().unwrap_or_default(),
                        status: OutcomeStatus::Invalid(e.to_string()),
                    });
                    continue;
                }
            };

            let status = self.process_record(sheets, source, &record).await;
            outcomes.push(RecordOutcome {
                row_number,
                label: record.display_name().to_string(),
                status,
            });
        }

        let report = RunReport {
            started_at,
            outcomes,
        };
        info!(
            "=== Done: {} records | {} appended | {} skipped | {} failed ===",
            report.outcomes.len(),
            report.appended(),
            report.skipped(),
            report.failed(),
        );
        // End-of-run triage summary: one line per record that did not append.
        for outcome in &report.outcomes {
            let (row, label) = (outcome.row_number, &outcome.label);
            match &outcome.status {
                OutcomeStatus::Appended { .. } => {}
                OutcomeStatus::Invalid(reason) => {
                    warn!("Row {} ({}): invalid record: {}", row, label, reason);
                }
                OutcomeStatus::WorksheetMissing => {
                    warn!("Row {} ({}): target worksheet not found", row, label);
                }
                OutcomeStatus::UnknownCategory => {
                    warn!("Row {} ({}): unrecognized category", row, label);
                }
                OutcomeStatus::FetchFailed(reason) => {
                    warn!("Row {} ({}): fetch failed: {}", row, label, reason);
                }
                OutcomeStatus::PlacementFailed(reason) => {
                    warn!("Row {} ({}): placement failed: {}", row, label, reason);
                }
            }
        }
        Ok(report)
    }

    async fn process_record(
        &self,
        sheets: &dyn SpreadsheetClient,
        source: &dyn QuoteSource,
        record: &ControlRecord,
    ) -> OutcomeStatus {
        let cfg = &self.config.pipeline;
        info!(
            "Row {}: {} → {}/{}",
            record.row_number,
            record.display_name(),
            record.target_sheet_id,
            record.target_worksheet_name,
        );

        let observation = match with_retry(
            cfg.max_attempts as usize,
            Duration::from_secs(cfg.retry_delay_secs),
            || source.fetch_latest(&record.source_url),
        )
        .await
        {
            Ok(observation) => observation,
            Err(e) => {
                warn!(
                    "Row {} ({}): fetch failed after {} attempts: {}",
                    record.row_number, record.source_url, cfg.max_attempts, e
                );
                return OutcomeStatus::FetchFailed(e.to_string());
            }
        };

        match placement::append_observation(sheets, record, &observation).await {
            Ok(Placement::Appended { row }) => {
                info!(
                    "Row {}: appended at row {} of {}/{}",
                    record.row_number, row, record.target_sheet_id, record.target_worksheet_name
                );
                OutcomeStatus::Appended { row }
            }
            Ok(Placement::WorksheetMissing) => OutcomeStatus::WorksheetMissing,
            Ok(Placement::UnknownCategory) => OutcomeStatus::UnknownCategory,
            Err(e) => {
                warn!(
                    "Row {}: placement failed for {}/{}: {}",
                    record.row_number, record.target_sheet_id, record.target_worksheet_name, e
                );
                OutcomeStatus::PlacementFailed(e.to_string())
            }
        }
    }
}

// ── Run report ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RunReport {
    pub started_at: NaiveDateTime,
    pub outcomes: Vec<RecordOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub row_number: usize,
    pub label: String,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Appended { row: u32 },
    Invalid(String),
    WorksheetMissing,
    UnknownCategory,
    FetchFailed(String),
    PlacementFailed(String),
}

impl RunReport {
    pub fn appended(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Appended { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| {
            matches!(
                s,
                OutcomeStatus::Invalid(_)
                    | OutcomeStatus::WorksheetMissing
                    | OutcomeStatus::UnknownCategory
            )
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|s| {
            matches!(
                s,
                OutcomeStatus::FetchFailed(_) | OutcomeStatus::PlacementFailed(_)
            )
        })
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
