//! In-memory page session serving recorded HTML
//!
//! Pages are keyed by URL. Unknown URLs load an empty document, the way a
//! storefront answers a page number past the end of a catalog. Binary
//! payloads can be scripted to fail a number of times before succeeding.

use super::page_session::{PageSession, SessionError, SessionResult};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const EMPTY_DOCUMENT: &str = "<html><head></head><body></body></html>";

#[derive(Debug, Clone, Default)]
struct ScriptedPayload {
    bytes: Option<Vec<u8>>,
    failures_left: u32,
}

/// Page session replaying recorded documents
#[derive(Debug, Clone)]
pub struct ReplaySession {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    payloads: HashMap<String, ScriptedPayload>,
    current: Option<String>,
    scroll_y: f64,
    document_height: f64,
    viewport_height: f64,
    visits: Vec<String>,
    fetches: Vec<String>,
    closed: bool,
}

impl Default for ReplaySession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplaySession {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            redirects: HashMap::new(),
            payloads: HashMap::new(),
            current: None,
            scroll_y: 0.0,
            document_height: 0.0,
            viewport_height: 1200.0,
            visits: Vec::new(),
            fetches: Vec::new(),
            closed: false,
        }
    }

    /// Serve `html` whenever `url` is loaded
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Loading `from` lands on `to`
    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    /// `fetch_binary(url)` returns `bytes`
    pub fn with_binary(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.payloads.entry(url.into()).or_default().bytes = Some(bytes.into());
        self
    }

    /// The next `failures` fetches of `url` yield no body
    pub fn with_failing_fetches(mut self, url: impl Into<String>, failures: u32) -> Self {
        self.payloads.entry(url.into()).or_default().failures_left = failures;
        self
    }

    /// Pretend every document is `height` pixels tall for scrolling purposes
    pub fn with_document_height(mut self, height: f64) -> Self {
        self.document_height = height;
        self
    }

    /// URLs passed to `navigate`, in order
    pub fn visits(&self) -> &[String] {
        &self.visits
    }

    /// URLs passed to `fetch_binary`, one entry per attempt
    pub fn fetches(&self) -> &[String] {
        &self.fetches
    }

    pub fn fetch_attempts(&self, url: &str) -> usize {
        self.fetches.iter().filter(|u| *u == url).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn current_document(&self) -> &str {
        self.current
            .as_deref()
            .and_then(|url| self.pages.get(url))
            .map(String::as_str)
            .unwrap_or(EMPTY_DOCUMENT)
    }

    fn max_scroll(&self) -> f64 {
        (self.document_height - self.viewport_height).max(0.0)
    }
}

#[async_trait]
impl PageSession for ReplaySession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.visits.push(url.to_string());
        let landed = self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        debug!("Replay navigate {} -> {}", url, landed);
        self.current = Some(landed);
        self.scroll_y = 0.0;
        Ok(())
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        self.ensure_open()?;
        Ok(self.current.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn render(&mut self) -> SessionResult<String> {
        self.ensure_open()?;
        Ok(self.current_document().to_string())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> SessionResult<()> {
        self.ensure_open()?;
        let parsed = Selector::parse(selector)
            .map_err(|e| SessionError::Script(format!("invalid selector '{selector}': {e}")))?;
        // Recorded documents never change, so a miss is final
        let found = Html::parse_document(self.current_document())
            .select(&parsed)
            .next()
            .is_some();
        if found {
            Ok(())
        } else {
            Err(SessionError::timeout(selector, timeout))
        }
    }

    async fn scroll_by(&mut self, pixels: u32) -> SessionResult<()> {
        self.ensure_open()?;
        self.scroll_y = (self.scroll_y + f64::from(pixels)).min(self.max_scroll());
        Ok(())
    }

    async fn scroll_position(&mut self) -> SessionResult<f64> {
        self.ensure_open()?;
        Ok(self.scroll_y)
    }

    async fn at_bottom(&mut self) -> SessionResult<bool> {
        self.ensure_open()?;
        Ok(self.viewport_height + self.scroll_y >= self.document_height - 5.0)
    }

    async fn fetch_binary(
        &mut self,
        url: &str,
        _timeout: Duration,
    ) -> SessionResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        self.fetches.push(url.to_string());
        let Some(payload) = self.payloads.get_mut(url) else {
            return Ok(None);
        };
        if payload.failures_left > 0 {
            payload.failures_left -= 1;
            return Err(SessionError::Script(format!("scripted failure for {url}")));
        }
        Ok(payload.bytes.clone())
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.closed = true;
        Ok(())
    }
}
