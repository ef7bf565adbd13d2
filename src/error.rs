//! Domain error kinds.
//!
//! Four distinct families, each with its own recovery policy:
//! - [`ConfigurationError`] aborts the run before any record is touched.
//! - [`ValidationError`] skips the offending control record.
//! - [`FetchError`] is retried, then surfaced to the router once exhausted.
//! - [`SheetsError`] aborts the current record only, except that a missing
//!   worksheet is handled as a reported no-op by the placement engine.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("required environment variable {0} is not set")]
    MissingEnv(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("control row has {got} columns, expected at least 5")]
    TooFewColumns { got: usize },

    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("source_url {url:?} is not a valid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unrecognized category {0:?}")]
    UnknownCategory(String),
}

/// One variant per stage of the browser flow, so the router's log line says
/// where a record died without needing the session transcript.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("login marker {selector:?} not visible after {timeout:?}")]
    LoginWaitTimeout { selector: String, timeout: Duration },

    #[error("login submission failed: {0}")]
    LoginSubmit(String),

    #[error("price display {selector:?} not visible after {timeout:?}")]
    DataWaitTimeout { selector: String, timeout: Duration },

    #[error("could not extract quotation text: {0}")]
    Extraction(String),
}

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("worksheet {title:?} not found in spreadsheet {spreadsheet_id}")]
    WorksheetNotFound {
        spreadsheet_id: String,
        title: String,
    },

    #[error("sheets api transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sheets api returned {status} for {context}: {body}")]
    Api {
        status: u16,
        context: String,
        body: String,
    },
}
