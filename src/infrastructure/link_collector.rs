//! Catalog link collection
//!
//! Walks a paginated catalog through a page session: scroll each page until
//! the lazy grid is fully rendered, harvest product links, then move on to
//! `?page=N+1` until the cap, the page limit or the end of the catalog.

use crate::domain::{EventSink, LinkSet, PipelineEvent};
use crate::infrastructure::config::{AppConfig, CollectionConfig};
use crate::infrastructure::page_session::{PageSession, SessionResult, settle};
use crate::infrastructure::parsing::url_rules::next_page_url;
use crate::infrastructure::parsing::{ParseContext, ParsingResult, ProductListParser};
use crate::infrastructure::pipeline_error::PipelineError;
use anyhow::Result;
use scraper::Html;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Collects product URLs from a catalog
pub struct LinkCollector {
    parser: ProductListParser,
    grid_item: String,
    base_url: String,
    settings: CollectionConfig,
    cookie_settle: Duration,
    events: EventSink,
}

impl LinkCollector {
    pub fn new(config: &AppConfig) -> ParsingResult<Self> {
        Ok(Self {
            parser: ProductListParser::with_config(&config.selectors.grid)?,
            grid_item: config.selectors.grid.grid_item.clone(),
            base_url: config.site.base_url.clone(),
            settings: config.collection.clone(),
            cookie_settle: Duration::from_millis(config.browser.cookie_settle_ms),
            events: EventSink::disabled(),
        })
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Unique product URLs from `catalog_url`, at most `max_links` of them.
    ///
    /// Never fails: any error ends collection and whatever was gathered so
    /// far is returned.
    pub async fn collect(
        &self,
        session: &mut dyn PageSession,
        catalog_url: &str,
        max_links: usize,
    ) -> Vec<String> {
        let mut links = LinkSet::with_cap(max_links);
        if max_links == 0 {
            return Vec::new();
        }

        if let Err(e) = self.collect_into(session, catalog_url, &mut links).await {
            error!("Link collection from {} stopped early: {:?}", catalog_url, e);
        }

        info!("Total collected: {} product URLs", links.len());
        links.into_vec()
    }

    async fn collect_into(
        &self,
        session: &mut dyn PageSession,
        catalog_url: &str,
        links: &mut LinkSet,
    ) -> Result<()> {
        info!("Collecting product URLs from: {}", catalog_url);
        session.navigate(catalog_url).await?;
        settle(self.cookie_settle).await;
        settle(self.settings.page_settle()).await;
        session
            .wait_for(&self.grid_item, self.settings.initial_grid_timeout())
            .await
            .map_err(|source| PipelineError::CollectionTimeout {
                url: catalog_url.to_string(),
                source,
            })?;

        let mut page = 1;
        while !links.is_full() && page <= self.settings.max_pages {
            let steps = self.scroll_incremental(session).await?;
            debug!("Page {}: scrolled {} steps", page, steps);

            let rendered = session.render().await?;
            let added = {
                let html = Html::parse_document(&rendered);
                let context = ParseContext::new(page, self.base_url.clone());
                self.parser.scan_page(&html, &context, links)
            };
            info!("Page {}: collected {} (+{})", page, links.len(), added);
            self.events.emit(PipelineEvent::PageScanned {
                page,
                collected: links.len(),
                added,
            });

            if links.is_full() {
                info!("Reached limit of {} products", links.cap());
                break;
            }

            let next_page = page + 1;
            let next_url = next_page_url(&session.current_url().await?, next_page);
            info!("Moving to page {}: {}", next_page, next_url);
            session.navigate(&next_url).await?;
            settle(self.settings.page_settle()).await;

            let landed = session.current_url().await?;
            if !landed.contains(&format!("page={next_page}")) && landed != next_url {
                info!("No more pages (last: {})", page);
                break;
            }

            if let Err(e) = session
                .wait_for(&self.grid_item, self.settings.next_page_timeout())
                .await
            {
                warn!("Product grid did not load on page {}: {}", next_page, e);
                break;
            }
            page = next_page;
        }

        Ok(())
    }

    /// Scroll down step by step so lazily rendered grid items load.
    ///
    /// Stops at the bottom of the document, after `stagnant_limit` steps
    /// without movement, or after `max_steps`. Returns the steps taken.
    pub async fn scroll_incremental(&self, session: &mut dyn PageSession) -> SessionResult<u32> {
        let scroll = &self.settings.scroll;
        let pause = Duration::from_millis(scroll.pause_ms);
        let mut last_y: Option<f64> = None;
        let mut stagnant = 0;

        for step in 1..=scroll.max_steps {
            session.scroll_by(scroll.step_px).await?;
            settle(pause).await;

            let y = session.scroll_position().await?;
            if last_y == Some(y) {
                stagnant += 1;
            } else {
                stagnant = 0;
            }
            last_y = Some(y);

            if session.at_bottom().await? || stagnant >= scroll.stagnant_limit {
                return Ok(step);
            }
        }

        Ok(scroll.max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::replay_session::ReplaySession;

    const CATALOG: &str = "https://blackscreenrecords.com/collections/all";

    fn grid(hrefs: &[&str]) -> String {
        let items: String = hrefs
            .iter()
            .map(|h| {
                format!(
                    r#"<div class="product-grid-item"><a class="product-grid-item__title" data-grid-link href="{h}">x</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{items}</body></html>")
    }

    fn collector() -> LinkCollector {
        LinkCollector::new(&AppConfig::without_delays()).unwrap()
    }

    #[tokio::test]
    async fn test_collects_across_pages_until_catalog_ends() {
        let mut session = ReplaySession::new()
            .with_page(CATALOG, grid(&["/collections/all/products/a", "/collections/all/products/b"]))
            .with_page(
                format!("{CATALOG}?page=2"),
                grid(&["/collections/all/products/b", "/collections/all/products/c"]),
            );

        let links = collector().collect(&mut session, CATALOG, 10).await;

        assert_eq!(
            links,
            vec![
                "https://blackscreenrecords.com/collections/all/products/a",
                "https://blackscreenrecords.com/collections/all/products/b",
                "https://blackscreenrecords.com/collections/all/products/c",
            ]
        );
        // Page 3 is an empty document, so the grid never appears there
        assert_eq!(session.visits().last().map(String::as_str), Some(&*format!("{CATALOG}?page=3")));
    }

    #[tokio::test]
    async fn test_redirect_without_page_number_ends_collection() {
        let mut session = ReplaySession::new()
            .with_page(CATALOG, grid(&["/collections/all/products/a"]))
            .with_redirect(format!("{CATALOG}?page=2"), CATALOG);

        let links = collector().collect(&mut session, CATALOG, 10).await;

        assert_eq!(links.len(), 1);
        assert_eq!(session.visits().len(), 2);
    }

    #[tokio::test]
    async fn test_cap_stops_before_next_page() {
        let mut session = ReplaySession::new().with_page(
            CATALOG,
            grid(&[
                "/collections/all/products/a",
                "/collections/all/products/b",
                "/collections/all/products/c",
            ]),
        );

        let links = collector().collect(&mut session, CATALOG, 2).await;

        assert_eq!(links.len(), 2);
        assert_eq!(session.visits(), [CATALOG]);
    }

    #[tokio::test]
    async fn test_missing_grid_returns_empty() {
        let mut session = ReplaySession::new().with_page(CATALOG, "<html><body></body></html>");
        let links = collector().collect(&mut session, CATALOG, 10).await;
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_returns_empty() {
        let mut session = ReplaySession::new();
        session.close().await.unwrap();
        assert!(collector().collect(&mut session, CATALOG, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_scroll_stops_at_bottom() {
        let mut session = ReplaySession::new().with_document_height(4000.0);
        session.navigate(CATALOG).await.unwrap();

        let steps = collector().scroll_incremental(&mut session).await.unwrap();

        // 4000px document, 1200px viewport, 800px steps
        assert_eq!(steps, 4);
    }

    /// A page whose scroll position never moves and never reports the bottom
    struct StuckSession {
        scrolls: u32,
    }

    #[async_trait::async_trait]
    impl PageSession for StuckSession {
        async fn navigate(&mut self, _url: &str) -> SessionResult<()> {
            Ok(())
        }
        async fn current_url(&mut self) -> SessionResult<String> {
            Ok(CATALOG.to_string())
        }
        async fn render(&mut self) -> SessionResult<String> {
            Ok(String::new())
        }
        async fn wait_for(&mut self, _selector: &str, _timeout: Duration) -> SessionResult<()> {
            Ok(())
        }
        async fn scroll_by(&mut self, _pixels: u32) -> SessionResult<()> {
            self.scrolls += 1;
            Ok(())
        }
        async fn scroll_position(&mut self) -> SessionResult<f64> {
            Ok(0.0)
        }
        async fn at_bottom(&mut self) -> SessionResult<bool> {
            Ok(false)
        }
        async fn fetch_binary(
            &mut self,
            _url: &str,
            _timeout: Duration,
        ) -> SessionResult<Option<Vec<u8>>> {
            Ok(None)
        }
        async fn close(&mut self) -> SessionResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_scroll_stops_when_position_stagnates() {
        let mut session = StuckSession { scrolls: 0 };

        let steps = collector().scroll_incremental(&mut session).await.unwrap();

        // First reading sets the baseline, three more unchanged readings stop it
        assert_eq!(steps, 4);
        assert_eq!(session.scrolls, 4);
    }

    #[tokio::test]
    async fn test_scroll_honors_step_limit() {
        let mut config = AppConfig::without_delays();
        config.collection.scroll.max_steps = 2;
        let collector = LinkCollector::new(&config).unwrap();
        let mut session = StuckSession { scrolls: 0 };

        assert_eq!(collector.scroll_incremental(&mut session).await.unwrap(), 2);
    }
}
