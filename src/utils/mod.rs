use std::time::Instant;
use tracing::info;

/// Wall-clock span logged on drop; wraps the whole batch in `run`.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("⏱  {} took {:.2?}", self.label, self.start.elapsed());
    }
}

/// Clip a string for log output, respecting char boundaries.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
