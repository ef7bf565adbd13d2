use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigurationError;

// The portal's generated class names drift across its deployments, which is
// why the locators live in configuration rather than in the fetch code.
const PRICE_SELECTOR: &str = "#content > div > div > div > div > div.Zoomstyle__BodyContainer-LbgNq.fhHJpQ > div.Zoomstyle__Section-hqZqfX.jKLgrv > div.Largestyle__DisplayWrapperLarge-iWzxqM.hISDst > div.Largestyle__DisplayItem-vzpFY.fbUftf > div > div:nth-child(2) > div > div > div.PriceDeltastyle__DeltaContainer-jdFEoE.dtfcmD > div.Textstyles__Heading1Blue-gtxuIB.dzShK";
const DATE_SELECTOR: &str = "#content > div > div > div > div > div.Zoomstyle__BodyContainer-LbgNq.fhHJpQ > div.Zoomstyle__Section-hqZqfX.jKLgrv > div.Largestyle__DisplayWrapperLarge-iWzxqM.hISDst > div.Mainstyle__Group-ciNpsy.fYvNPb > div > div > div:nth-child(2) > div";

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub sheets: SheetsConfig,
    pub pipeline: PipelineConfig,
}

/// Browser fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_login_wait_secs")]
    pub login_wait_secs: u64,

    /// Short bounded wait for the optional continue/consent control.
    #[serde(default = "default_continue_wait_secs")]
    pub continue_wait_secs: u64,

    #[serde(default = "default_data_wait_secs")]
    pub data_wait_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub no_sandbox: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Where the page render lands when a fetch fails.
    #[serde(default = "default_error_pdf_path")]
    pub error_pdf_path: PathBuf,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Structural locators for the portal's login form and price display.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorConfig {
    #[serde(default = "default_login_button")]
    pub login_button: String,

    #[serde(default = "default_username_input")]
    pub username_input: String,

    #[serde(default = "default_password_input")]
    pub password_input: String,

    #[serde(default = "default_continue_button")]
    pub continue_button: String,

    #[serde(default = "default_price")]
    pub price: String,

    #[serde(default = "default_date")]
    pub date: String,
}

/// Sheets API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,

    #[serde(default = "default_sheets_timeout_secs")]
    pub timeout_secs: u64,

    /// Spreadsheet holding the control worksheet. Required; no default.
    #[serde(default)]
    pub master_sheet_id: String,

    #[serde(default = "default_master_worksheet")]
    pub master_worksheet: String,
}

/// Router configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_login_wait_secs() -> u64 {
    60
}
fn default_continue_wait_secs() -> u64 {
    10
}
fn default_data_wait_secs() -> u64 {
    60
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_viewport_width() -> u32 {
    1920
}
fn default_viewport_height() -> u32 {
    1080
}
fn default_error_pdf_path() -> PathBuf {
    PathBuf::from("webpage_error.pdf")
}
fn default_login_button() -> String {
    "#login-button".to_string()
}
fn default_username_input() -> String {
    "#username-input".to_string()
}
fn default_password_input() -> String {
    "#password-input".to_string()
}
fn default_continue_button() -> String {
    "#continue-login-button".to_string()
}
fn default_price() -> String {
    PRICE_SELECTOR.to_string()
}
fn default_date() -> String {
    DATE_SELECTOR.to_string()
}
fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}
fn default_sheets_timeout_secs() -> u64 {
    30
}
fn default_master_worksheet() -> String {
    "Commodity".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("ICIS_SYNC").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            sheets: SheetsConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            login_wait_secs: default_login_wait_secs(),
            continue_wait_secs: default_continue_wait_secs(),
            data_wait_secs: default_data_wait_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            no_sandbox: true,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            error_pdf_path: default_error_pdf_path(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            login_button: default_login_button(),
            username_input: default_username_input(),
            password_input: default_password_input(),
            continue_button: default_continue_button(),
            price: default_price(),
            date: default_date(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_sheets_base_url(),
            timeout_secs: default_sheets_timeout_secs(),
            master_sheet_id: String::new(),
            master_worksheet: default_master_worksheet(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

// ── Secrets ──────────────────────────────────────────────────────────────────

pub const USERNAME_ENV: &str = "ICIS_USERNAME";
pub const PASSWORD_ENV: &str = "ICIS_PASSWORD";
pub const SHEETS_TOKEN_ENV: &str = "SHEETS_ACCESS_TOKEN";

/// Portal login secrets. No Debug derive; these never land in logs.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Ok(Self {
            username: require_env(USERNAME_ENV)?,
            password: require_env(PASSWORD_ENV)?,
        })
    }
}

/// Bearer token for the Sheets API. Minting and refresh happen outside this
/// process; we only require that a usable token is present.
pub fn sheets_token_from_env() -> Result<String, ConfigurationError> {
    require_env(SHEETS_TOKEN_ENV)
}

fn require_env(name: &'static str) -> Result<String, ConfigurationError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigurationError::MissingEnv(name)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_timings() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.fetcher.login_wait_secs, 60);
        assert_eq!(cfg.fetcher.data_wait_secs, 60);
        assert_eq!(cfg.pipeline.max_attempts, 3);
        assert_eq!(cfg.pipeline.retry_delay_secs, 5);
        assert!(cfg.sheets.master_sheet_id.is_empty());
    }

    #[test]
    fn selector_defaults_point_at_login_controls() {
        let sel = SelectorConfig::default();
        assert_eq!(sel.login_button, "#login-button");
        assert_eq!(sel.username_input, "#username-input");
        assert_eq!(sel.password_input, "#password-input");
        assert!(sel.price.starts_with("#content"));
        assert!(sel.date.starts_with("#content"));
    }
}
