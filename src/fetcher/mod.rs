//! Browser-automation fetch of one (date, price) observation.

pub mod session;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use self::session::BrowserSession;
use crate::config::{Credentials, FetcherConfig, SelectorConfig};
use crate::error::FetchError;
use crate::models::Observation;

/// Settle time between the continue control appearing and the click; the
/// portal re-renders the control once while its session check completes.
const CONTINUE_SETTLE: Duration = Duration::from_secs(2);

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable quotation source abstraction.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_latest(&self, url: &str) -> Result<Observation, FetchError>;
}

// ── Portal fetcher ────────────────────────────────────────────────────────────

pub struct PortalFetcher {
    config: FetcherConfig,
    credentials: Credentials,
}

impl PortalFetcher {
    pub fn new(config: FetcherConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    async fn drive(&self, session: &BrowserSession, url: &str) -> Result<Observation, FetchError> {
        let cfg = &self.config;
        let sel = &cfg.selectors;

        session.goto(url).await?;

        let login_wait = Duration::from_secs(cfg.login_wait_secs);
        if !session.wait_for_visible(&sel.login_button, login_wait).await {
            return Err(FetchError::LoginWaitTimeout {
                selector: sel.login_button.clone(),
                timeout: login_wait,
            });
        }

        // Credentials go in by DOM value assignment, and the login action is
        // a DOM-level click; scripted keystrokes lose characters when the
        // form re-renders mid-typing.
        if !session
            .eval_bool(login_script(sel, &self.credentials))
            .await
        {
            return Err(FetchError::LoginSubmit(
                "login controls not present".to_string(),
            ));
        }
        info!("Login submitted");

        // A secondary confirmation control appears when the portal wants the
        // session re-acknowledged. Its absence is the normal case.
        let continue_wait = Duration::from_secs(cfg.continue_wait_secs);
        if session
            .wait_for_clickable(&sel.continue_button, continue_wait)
            .await
        {
            tokio::time::sleep(CONTINUE_SETTLE).await;
            if session.click(&sel.continue_button).await {
                info!("Continue control clicked");
            } else {
                debug!("Continue control vanished before the click, proceeding");
            }
        } else {
            debug!("No continue control, proceeding");
        }

        debug!("Waiting for price display");
        let data_wait = Duration::from_secs(cfg.data_wait_secs);
        if !session.wait_for_visible(&sel.price, data_wait).await {
            return Err(FetchError::DataWaitTimeout {
                selector: sel.price.clone(),
                timeout: data_wait,
            });
        }

        let price = session
            .text_content(&sel.price)
            .await?
            .ok_or_else(|| FetchError::Extraction("price element has no text".to_string()))?;
        let date = session
            .text_content(&sel.date)
            .await?
            .ok_or_else(|| FetchError::Extraction("date element has no text".to_string()))?;

        info!("Quotation fetched: date={:?} price={:?}", date, price);
        Ok(Observation { date, price })
    }
}

#[async_trait]
impl QuoteSource for PortalFetcher {
    async fn fetch_latest(&self, url: &str) -> Result<Observation, FetchError> {
        info!("Fetching quotation from {}", url);

        let session = BrowserSession::launch(&self.config).await?;
        let result = self.drive(&session, url).await;

        if result.is_err() {
            session.save_failure_pdf(&self.config.error_pdf_path).await;
        }
        session.shutdown().await;

        result
    }
}

/// One script fills both fields and triggers the login click; credentials are
/// JSON-escaped so arbitrary secret characters cannot break the script.
fn login_script(selectors: &SelectorConfig, credentials: &Credentials) -> String {
    let creds = serde_json::json!({
        "username": credentials.username,
        "password": credentials.password,
    });
    let user_sel = serde_json::Value::String(selectors.username_input.clone());
    let pass_sel = serde_json::Value::String(selectors.password_input.clone());
    let btn_sel = serde_json::Value::String(selectors.login_button.clone());

    format!(
        r#"(function(creds) {{
  const user = document.querySelector({user_sel});
  const pass = document.querySelector({pass_sel});
  const btn = document.querySelector({btn_sel});
  if (!user || !pass || !btn) return false;
  user.value = creds.username;
  pass.value = creds.password;
  btn.click();
  return true;
}})({creds})"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn login_script_targets_configured_selectors() {
        let script = login_script(&SelectorConfig::default(), &creds("user", "hunter2"));
        assert!(script.contains(r##"querySelector("#username-input")"##));
        assert!(script.contains(r##"querySelector("#password-input")"##));
        assert!(script.contains(r##"querySelector("#login-button")"##));
    }

    #[test]
    fn login_script_escapes_awkward_secrets() {
        let script = login_script(&SelectorConfig::default(), &creds("user", r#"pa"ss\word"#));
        assert!(script.contains(r#""password":"pa\"ss\\word""#));
    }
}
