//! One headless browser context per fetch.
//!
//! The session is never reused across records: portal state (auth cookies,
//! SPA routing) from one fetch must not leak into the next. Teardown runs on
//! every exit path, including the failure path that first renders the page to
//! the diagnostic PDF.

use std::path::Path;
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::FetcherConfig;
use crate::error::FetchError;

pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
    poll_interval: Duration,
}

impl BrowserSession {
    pub async fn launch(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut builder = BrowserConfig::builder()
            .arg(format!(
                "--window-size={},{}",
                config.viewport_width, config.viewport_height
            ))
            .arg("--disable-dev-shm-usage");
        if config.no_sandbox {
            builder = builder.arg("--no-sandbox");
        }
        let browser_config = builder.build().map_err(FetchError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        match browser.new_page("about:blank").await {
            Ok(page) => Ok(Self {
                browser,
                handler_task,
                page,
                poll_interval: Duration::from_millis(config.poll_interval_ms),
            }),
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                Err(FetchError::Launch(e.to_string()))
            }
        }
    }

    pub async fn goto(&self, url: &str) -> Result<(), FetchError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Evaluate a script expected to return a boolean. Evaluation errors
    /// (page mid-navigation, detached context) read as `false` so pollers can
    /// keep going until their deadline.
    pub async fn eval_bool(&self, script: String) -> bool {
        match self.page.evaluate(script).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                debug!("evaluate failed: {}", e);
                false
            }
        }
    }

    /// Poll until `selector` is present and visible, or the deadline passes.
    pub async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> bool {
        self.poll(visibility_probe(selector), timeout).await
    }

    /// Poll until `selector` is visible and enabled, or the deadline passes.
    pub async fn wait_for_clickable(&self, selector: &str, timeout: Duration) -> bool {
        self.poll(clickable_probe(selector), timeout).await
    }

    async fn poll(&self, probe: String, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval_bool(probe.clone()).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// DOM-level `click()` on the matched element. Returns whether the
    /// element was found.
    pub async fn click(&self, selector: &str) -> bool {
        let sel = js_string(selector);
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; el.click(); return true; }})()"
        );
        self.eval_bool(script).await
    }

    /// Verbatim `textContent` of the matched element.
    pub async fn text_content(&self, selector: &str) -> Result<Option<String>, FetchError> {
        let sel = js_string(selector);
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); return el ? el.textContent : null; }})()"
        );
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| FetchError::Extraction(e.to_string()))?;
        result
            .into_value::<Option<String>>()
            .map_err(|e| FetchError::Extraction(e.to_string()))
    }

    /// Best-effort page render for post-mortem debugging of selector drift.
    /// Failure to produce the artifact never masks the original error.
    pub async fn save_failure_pdf(&self, path: &Path) {
        let params = PrintToPdfParams {
            landscape: Some(false),
            display_header_footer: Some(false),
            print_background: Some(true),
            prefer_css_page_size: Some(true),
            ..Default::default()
        };
        match self.page.save_pdf(params, path).await {
            Ok(_) => info!("Saved failure snapshot to {:?}", path),
            Err(e) => warn!("Could not save failure snapshot to {:?}: {}", path, e),
        }
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

/// JS string literal for a selector, JSON-escaped so quotes and backslashes
/// in configured locators cannot break out of the script.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn visibility_probe(selector: &str) -> String {
    let sel = js_string(selector);
    format!(
        "(() => {{ const el = document.querySelector({sel}); return !!el && el.offsetParent !== null; }})()"
    )
}

fn clickable_probe(selector: &str) -> String {
    let sel = js_string(selector);
    format!(
        "(() => {{ const el = document.querySelector({sel}); return !!el && el.offsetParent !== null && !el.disabled; }})()"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_json_escaped_into_probes() {
        let probe = visibility_probe(r#"div[data-x="a'b"]"#);
        assert!(probe.contains(r#""div[data-x=\"a'b\"]""#));
    }

    #[test]
    fn probe_checks_presence_and_visibility() {
        let probe = visibility_probe("#login-button");
        assert!(probe.contains("querySelector(\"#login-button\")"));
        assert!(probe.contains("offsetParent"));
    }

    #[test]
    fn clickable_probe_also_checks_disabled() {
        let probe = clickable_probe("#continue-login-button");
        assert!(probe.contains("!el.disabled"));
    }
}
