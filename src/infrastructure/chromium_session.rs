//! Headless Chromium page session using chromiumoxide

use super::page_session::{PageSession, SessionError, SessionResult};
use crate::infrastructure::config::{AppConfig, BrowserConfig as BrowserSettings};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Environment variable pointing at a Chromium/Chrome binary
pub const CHROMIUM_PATH_ENV: &str = "BSR_CHROMIUM_PATH";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary: explicit setting, environment, then `PATH`
pub fn find_chromium(settings: &BrowserSettings) -> Option<PathBuf> {
    if let Some(path) = settings.chromium_path.as_ref().filter(|p| p.exists()) {
        return Some(path.clone());
    }

    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points at a missing file: {}", CHROMIUM_PATH_ENV, p);
    }

    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Page session backed by a single Chromium tab
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    page_load_timeout: Duration,
    script_timeout: Duration,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank tab
    pub async fn launch(config: &AppConfig) -> SessionResult<Self> {
        let settings = &config.browser;
        let chrome_path = find_chromium(settings).ok_or_else(|| {
            SessionError::Launch(format!(
                "Chromium not found; set browser.chromium_path or {CHROMIUM_PATH_ENV}"
            ))
        })?;
        info!("Launching Chromium from {:?} (headless: {})", chrome_path, settings.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(settings.window_width, settings.window_height)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", settings.user_agent));
        if !settings.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| SessionError::Launch(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionError::Launch(format!("failed to open tab: {e}")))?;

        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler),
            page_load_timeout: Duration::from_secs(settings.page_load_timeout_secs),
            script_timeout: config.images.script_timeout(),
        })
    }

    fn page(&self) -> SessionResult<&Page> {
        self.page.as_ref().ok_or(SessionError::Closed)
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> SessionResult<T> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| SessionError::Script(format!("unexpected script result: {e:?}")))
    }
}

/// Run a page load under `timeout`.
///
/// Hitting the timeout is not an error: the document is usable even if
/// some subresource or client-side redirect never settled.
async fn within_load_timeout<F>(url: &str, timeout: Duration, load: F) -> SessionResult<()>
where
    F: std::future::Future<Output = SessionResult<()>>,
{
    match tokio::time::timeout(timeout, load).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Page load timeout after {:?}: {}", timeout, url);
            Ok(())
        }
    }
}

/// In-page request returning the body as a data URL, or null
fn fetch_script(url: &str, timeout: Duration) -> SessionResult<String> {
    let quoted = serde_json::to_string(url).map_err(|e| SessionError::Script(e.to_string()))?;
    Ok(format!(
        r#"new Promise((resolve) => {{
    const xhr = new XMLHttpRequest();
    xhr.open('GET', {quoted}, true);
    xhr.responseType = 'blob';
    xhr.timeout = {timeout_ms};
    xhr.onload = () => {{
        if (xhr.status !== 200) {{ resolve(null); return; }}
        const reader = new FileReader();
        reader.onloadend = () => resolve(reader.result);
        reader.onerror = () => resolve(null);
        reader.readAsDataURL(xhr.response);
    }};
    xhr.onerror = () => resolve(null);
    xhr.ontimeout = () => resolve(null);
    xhr.send();
}})"#,
        timeout_ms = timeout.as_millis()
    ))
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URL
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let (_, payload) = data_url.split_once(',')?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()
        .filter(|bytes| !bytes.is_empty())
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        let page = self.page()?;
        let load = async {
            page.goto(url)
                .await
                .map_err(|e| SessionError::navigation(url, e))?;
            if let Err(e) = page.wait_for_navigation().await {
                debug!("wait_for_navigation after {} failed: {}", url, e);
            }
            Ok(())
        };
        within_load_timeout(url, self.page_load_timeout, load).await
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        let url = self
            .page()?
            .url()
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?;
        Ok(url.map(|u| u.to_string()).unwrap_or_default())
    }

    async fn render(&mut self) -> SessionResult<String> {
        self.eval("document.documentElement.outerHTML").await
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> SessionResult<()> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| SessionError::Script(e.to_string()))?;
        let presence_check = format!("document.querySelector({quoted}) !== null");
        let started = Instant::now();
        loop {
            if self.eval::<bool>(&presence_check).await? {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(SessionError::timeout(selector, timeout));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn scroll_by(&mut self, pixels: u32) -> SessionResult<()> {
        self.eval::<serde_json::Value>(&format!("window.scrollBy(0, {pixels}); null"))
            .await
            .map(|_| ())
    }

    async fn scroll_position(&mut self) -> SessionResult<f64> {
        self.eval("window.pageYOffset").await
    }

    async fn at_bottom(&mut self) -> SessionResult<bool> {
        self.eval("(window.innerHeight + window.pageYOffset) >= document.body.scrollHeight - 5")
            .await
    }

    async fn fetch_binary(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> SessionResult<Option<Vec<u8>>> {
        let params = EvaluateParams::builder()
            .expression(fetch_script(url, timeout)?)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(SessionError::Script)?;

        let page = self.page()?;
        let result = tokio::time::timeout(self.script_timeout, page.evaluate_expression(params))
            .await
            .map_err(|_| {
                SessionError::Script(format!("image script exceeded {:?}", self.script_timeout))
            })?
            .map_err(|e| SessionError::Script(e.to_string()))?;

        let data_url: Option<String> = result
            .into_value()
            .map_err(|e| SessionError::Script(format!("unexpected fetch result: {e:?}")))?;
        Ok(data_url.as_deref().and_then(decode_data_url))
    }

    async fn close(&mut self) -> SessionResult<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Closing tab failed: {}", e);
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Closing browser failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Waiting for browser exit failed: {}", e);
            }
            info!("Browser session closed");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        Ok(())
    }
}
