//! Catalog harvesting pipeline
//!
//! Two batch runs share one page session each:
//! - link collection: catalog pages → link list file
//! - product parsing: link list → one folder per product with `info.txt`
//!   and downloaded images
//!
//! Items are processed strictly one after another. A failing product is
//! logged and skipped; only session setup and link file I/O abort a run.

use crate::domain::{EventSink, PipelineEvent, PipelineStage, ProductRecord};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::image_fetcher::{ImageFetcher, image_base_name};
use crate::infrastructure::link_collector::LinkCollector;
use crate::infrastructure::page_session::PageSession;
use crate::infrastructure::parsing::ParsingResult;
use crate::infrastructure::pipeline_error::{PipelineError, PipelineResult};
use crate::infrastructure::product_extractor::ProductExtractor;
use crate::infrastructure::record_writer::RecordWriter;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of a product parsing run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Products whose record was written
    pub processed_ok: usize,
    pub total: usize,
    pub output_root: PathBuf,
}

/// Write `urls` one per line
pub async fn write_link_file(path: &Path, urls: &[String]) -> PipelineResult<()> {
    let link_file_error = |source: std::io::Error| PipelineError::LinkFile {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(link_file_error)?;
    }

    let body: String = urls.iter().map(|url| format!("{url}\n")).collect();
    tokio::fs::write(path, body).await.map_err(link_file_error)?;
    info!("Saved {} links to {:?}", urls.len(), path);
    Ok(())
}

/// Trimmed, non-empty lines of a link list file
pub async fn read_link_file(path: &Path) -> PipelineResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PipelineError::LinkFile {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Drives collection and parsing runs over a page session
pub struct CatalogPipeline {
    collector: LinkCollector,
    extractor: ProductExtractor,
    fetcher: ImageFetcher,
    writer: RecordWriter,
    events: EventSink,
}

impl CatalogPipeline {
    /// Build every stage from `config`; fails only on invalid selectors
    pub fn new(config: &AppConfig) -> ParsingResult<Self> {
        Self::with_events(config, EventSink::disabled())
    }

    pub fn with_events(config: &AppConfig, events: EventSink) -> ParsingResult<Self> {
        Ok(Self {
            collector: LinkCollector::new(config)?.with_events(events.clone()),
            extractor: ProductExtractor::new(config)?,
            fetcher: ImageFetcher::new(&config.images),
            writer: RecordWriter::new(&config.output.output_root, &config.site.site_name),
            events,
        })
    }

    pub fn output_root(&self) -> &Path {
        self.writer.output_root()
    }

    /// Product URLs from `catalog_url`, at most `max_links`
    pub async fn collect_links(
        &self,
        session: &mut dyn PageSession,
        catalog_url: &str,
        max_links: usize,
    ) -> Vec<String> {
        self.events.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::LinkCollection,
            target: catalog_url.to_string(),
        });

        let links = self.collector.collect(session, catalog_url, max_links).await;

        self.events
            .emit(PipelineEvent::LinksCollected { total: links.len() });
        links
    }

    /// Collect links and save them to `links_file`
    pub async fn collect_links_to_file(
        &self,
        session: &mut dyn PageSession,
        catalog_url: &str,
        max_links: usize,
        links_file: &Path,
    ) -> PipelineResult<Vec<String>> {
        let links = self.collect_links(session, catalog_url, max_links).await;
        write_link_file(links_file, &links).await?;
        Ok(links)
    }

    /// Parse every URL in order, isolating per-product failures
    pub async fn parse_links(&self, session: &mut dyn PageSession, urls: &[String]) -> BatchSummary {
        let total = urls.len();
        self.events.emit(PipelineEvent::StageStarted {
            stage: PipelineStage::ProductParsing,
            target: self.output_root().display().to_string(),
        });
        if urls.is_empty() {
            warn!("Link list is empty, nothing to parse");
        }

        let mut processed_ok = 0;
        for (index, url) in urls.iter().enumerate() {
            info!("[{}/{}] Processing {}", index + 1, total, url);
            self.events.emit(PipelineEvent::ProductStarted {
                index: index + 1,
                total,
                url: url.clone(),
            });

            match self.process_product(session, url).await {
                Ok(folder) => {
                    processed_ok += 1;
                    self.events.emit(PipelineEvent::ProductSaved {
                        url: url.clone(),
                        folder,
                    });
                }
                Err(e) => {
                    error!("Skipping {}: {}", url, e);
                    self.events.emit(PipelineEvent::ProductSkipped {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Parsing finished: {}/{} products saved", processed_ok, total);
        self.events
            .emit(PipelineEvent::BatchFinished { processed_ok, total });

        BatchSummary {
            processed_ok,
            total,
            output_root: self.output_root().to_path_buf(),
        }
    }

    /// Read `links_file` and parse its URLs
    pub async fn parse_link_file(
        &self,
        session: &mut dyn PageSession,
        links_file: &Path,
    ) -> PipelineResult<BatchSummary> {
        let urls = read_link_file(links_file).await?;
        info!("Loaded {} links from {:?}", urls.len(), links_file);
        Ok(self.parse_links(session, &urls).await)
    }

    /// Extract, save and download images for one product.
    ///
    /// A record that cannot be written ends the item before any image is fetched.
    async fn process_product(
        &self,
        session: &mut dyn PageSession,
        url: &str,
    ) -> PipelineResult<PathBuf> {
        let mut record = self.extractor.try_extract(session, url).await?;

        let folder = self.writer.product_folder(&record);
        let info_path = self.writer.write(&record, &folder).await?;

        self.download_images(session, &mut record, &folder).await;
        self.writer
            .append_downloaded_images(&info_path, &record.downloaded_images)
            .await?;

        Ok(folder)
    }

    async fn download_images(
        &self,
        session: &mut dyn PageSession,
        record: &mut ProductRecord,
        folder: &Path,
    ) {
        if record.image_urls.is_empty() {
            info!("No product images found for {}", record.source_url);
            return;
        }

        let base_name = image_base_name(&record.display_stem(), Local::now().date_naive());
        record.downloaded_images = self
            .fetcher
            .fetch_all(session, &record.image_urls, folder, &base_name)
            .await;

        self.events.emit(PipelineEvent::ImagesDownloaded {
            url: record.source_url.clone(),
            downloaded: record.downloaded_images.len(),
            resolved: record.image_urls.len(),
        });
    }
}

/// Launch the browser used by a run
#[cfg(feature = "chromium")]
pub async fn open_browser_session(
    config: &AppConfig,
) -> PipelineResult<crate::infrastructure::chromium_session::ChromiumSession> {
    crate::infrastructure::chromium_session::ChromiumSession::launch(config)
        .await
        .map_err(PipelineError::SessionSetup)
}

/// Close a session at the end of a run; a close failure is only logged
pub async fn close_session(session: &mut dyn PageSession) {
    if let Err(e) = session.close().await {
        warn!("Page session did not close cleanly: {}", e);
    }
}
