//! Browser page abstraction consumed by the harvesting pipeline
//!
//! A `PageSession` owns one navigable browser tab. The collector, extractor
//! and image fetcher only ever talk to this trait, so the same pipeline runs
//! against headless Chromium or against recorded pages in tests.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a page session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {waited_ms}ms waiting for '{selector}'")]
    Timeout { selector: String, waited_ms: u64 },

    #[error("In-page script failed: {0}")]
    Script(String),

    #[error("Page session already closed")]
    Closed,
}

impl SessionError {
    pub fn timeout(selector: &str, waited: Duration) -> Self {
        Self::Timeout {
            selector: selector.to_string(),
            waited_ms: waited.as_millis() as u64,
        }
    }

    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Sleep for `duration`; a zero pause returns immediately
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// One browser tab, used strictly sequentially by a single pipeline run
#[async_trait]
pub trait PageSession: Send {
    /// Load `url`, returning once the load event fired or the load timeout elapsed
    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// Address of the document currently shown, after any redirect
    async fn current_url(&mut self) -> SessionResult<String>;

    /// Fully rendered markup of the current document
    async fn render(&mut self) -> SessionResult<String>;

    /// Block until an element matches `selector`, or fail with `SessionError::Timeout`
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> SessionResult<()>;

    async fn scroll_by(&mut self, pixels: u32) -> SessionResult<()>;

    /// Current vertical scroll offset in CSS pixels
    async fn scroll_position(&mut self) -> SessionResult<f64>;

    /// Whether the viewport reaches the end of the document
    async fn at_bottom(&mut self) -> SessionResult<bool>;

    /// Fetch `url` from inside the page so cookies apply.
    ///
    /// `Ok(None)` means the request completed without a usable body.
    async fn fetch_binary(&mut self, url: &str, timeout: Duration)
    -> SessionResult<Option<Vec<u8>>>;

    /// Release every browser resource. Calling it twice is harmless.
    async fn close(&mut self) -> SessionResult<()>;
}
