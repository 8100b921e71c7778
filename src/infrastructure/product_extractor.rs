//! Product page extraction through a page session

use crate::domain::ProductRecord;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::page_session::{PageSession, SessionError, settle};
use crate::infrastructure::parsing::{DetailParseContext, ParsingResult, ProductDetailParser};
use crate::infrastructure::pipeline_error::{PipelineError, PipelineResult};
use scraper::Html;
use std::time::Duration;
use tracing::{info, warn};

/// Loads product pages and turns them into records
pub struct ProductExtractor {
    parser: ProductDetailParser,
    title_marker: String,
    base_url: String,
    title_timeout: Duration,
    cookie_settle: Duration,
}

impl ProductExtractor {
    pub fn new(config: &AppConfig) -> ParsingResult<Self> {
        Ok(Self {
            parser: ProductDetailParser::with_config(&config.selectors)?,
            title_marker: config.selectors.detail.title.clone(),
            base_url: config.site.base_url.clone(),
            title_timeout: Duration::from_secs(config.extraction.title_timeout_secs),
            cookie_settle: Duration::from_millis(config.browser.cookie_settle_ms),
        })
    }

    /// Record for `url`, or `None` when the page never rendered a product title
    pub async fn extract(&self, session: &mut dyn PageSession, url: &str) -> Option<ProductRecord> {
        match self.try_extract(session, url).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Like `extract`, keeping the reason a page was rejected
    pub async fn try_extract(
        &self,
        session: &mut dyn PageSession,
        url: &str,
    ) -> PipelineResult<ProductRecord> {
        info!("Opening product page: {}", url);
        let not_rendered = |source: SessionError| PipelineError::PageRenderTimeout {
            url: url.to_string(),
            source,
        };

        session.navigate(url).await.map_err(not_rendered)?;
        settle(self.cookie_settle).await;
        session
            .wait_for(&self.title_marker, self.title_timeout)
            .await
            .map_err(not_rendered)?;
        let rendered = session.render().await.map_err(not_rendered)?;

        let record = {
            let html = Html::parse_document(&rendered);
            let context = DetailParseContext::new(url, self.base_url.clone());
            self.parser.parse(&html, &context)
        };
        Ok(record)
    }
}
