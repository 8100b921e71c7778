//! Command-line front-end
//!
//! `collect` walks a catalog and saves a link list; `parse` turns a link
//! list into product folders. Progress events are printed as they arrive.

use crate::application::CatalogPipeline;
use crate::domain::{EventSink, PipelineEvent};
use crate::infrastructure::config::{AppConfig, ConfigManager};
use crate::infrastructure::logging::init_logging_with_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "bsr-catalog",
    about = "Harvest product records and images from the BlackScreen Records catalog",
    version
)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override: error, warn, info, debug or trace
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect product links from a catalog into a link list file
    Collect {
        /// Catalog page to start from (e.g. https://blackscreenrecords.com/collections/all)
        #[arg(long)]
        catalog_url: String,
        /// Maximum number of product links to collect
        #[arg(long)]
        max_links: Option<usize>,
        /// Where to save the link list
        #[arg(long)]
        links_file: Option<PathBuf>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
    /// Parse every product in a link list file
    Parse {
        /// Link list to read
        #[arg(long)]
        links_file: Option<PathBuf>,
        /// Root folder for product folders
        #[arg(long)]
        output: Option<PathBuf>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
}

impl Command {
    fn headed(&self) -> bool {
        match self {
            Self::Collect { headed, .. } | Self::Parse { headed, .. } => *headed,
        }
    }
}

/// Load configuration and apply command-line overrides
pub async fn load_config(cli: &Cli) -> Result<AppConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_config().await?;

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.command.headed() {
        config.browser.headless = false;
    }
    match &cli.command {
        Command::Collect {
            max_links,
            links_file,
            ..
        } => {
            if let Some(max_links) = max_links {
                config.collection.max_links = *max_links;
            }
            if let Some(path) = links_file {
                config.output.links_file = path.clone();
            }
        }
        Command::Parse {
            links_file, output, ..
        } => {
            if let Some(path) = links_file {
                config.output.links_file = path.clone();
            }
            if let Some(path) = output {
                config.output.output_root = path.clone();
            }
        }
    }
    Ok(config)
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;
    init_logging_with_config(&config.logging)?;

    let (tx, rx) = unbounded_channel();
    let printer = tokio::spawn(print_events(rx));
    let pipeline = CatalogPipeline::with_events(&config, EventSink::new(tx))
        .context("Invalid storefront selectors in configuration")?;

    let result = match &cli.command {
        Command::Collect { catalog_url, .. } => run_collect(&pipeline, &config, catalog_url).await,
        Command::Parse { .. } => run_parse(&pipeline, &config).await,
    };

    // Dropping the pipeline closes the event channel so the printer finishes
    drop(pipeline);
    if let Err(e) = printer.await {
        tracing::warn!("Event printer stopped abnormally: {}", e);
    }
    result
}

#[cfg(feature = "chromium")]
async fn run_collect(pipeline: &CatalogPipeline, config: &AppConfig, catalog_url: &str) -> Result<()> {
    use crate::application::{close_session, open_browser_session};

    let mut session = open_browser_session(config).await?;
    let result = pipeline
        .collect_links_to_file(
            &mut session,
            catalog_url,
            config.collection.max_links,
            &config.output.links_file,
        )
        .await;
    close_session(&mut session).await;

    let links = result?;
    info!("Collected {} links into {:?}", links.len(), config.output.links_file);
    Ok(())
}

#[cfg(feature = "chromium")]
async fn run_parse(pipeline: &CatalogPipeline, config: &AppConfig) -> Result<()> {
    use crate::application::{close_session, open_browser_session, read_link_file};

    let urls = read_link_file(&config.output.links_file).await?;
    if urls.is_empty() {
        info!("Link list {:?} is empty, nothing to parse", config.output.links_file);
        return Ok(());
    }

    let mut session = open_browser_session(config).await?;
    let summary = pipeline.parse_links(&mut session, &urls).await;
    close_session(&mut session).await;

    info!(
        "Saved {}/{} products under {:?}",
        summary.processed_ok, summary.total, summary.output_root
    );
    Ok(())
}

#[cfg(not(feature = "chromium"))]
async fn run_collect(_pipeline: &CatalogPipeline, _config: &AppConfig, _catalog_url: &str) -> Result<()> {
    anyhow::bail!("built without the `chromium` feature; no browser session available")
}

#[cfg(not(feature = "chromium"))]
async fn run_parse(_pipeline: &CatalogPipeline, _config: &AppConfig) -> Result<()> {
    anyhow::bail!("built without the `chromium` feature; no browser session available")
}

async fn print_events(mut rx: UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = rx.recv().await {
        println!("{}", describe_event(&event));
    }
}

/// One console line per user-facing event
pub fn describe_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::StageStarted { stage, target } => format!("Starting {stage}: {target}"),
        PipelineEvent::PageScanned {
            page,
            collected,
            added,
        } => format!("Page {page}: {collected} links (+{added})"),
        PipelineEvent::LinksCollected { total } => format!("Collected {total} links"),
        PipelineEvent::ProductStarted { index, total, url } => format!("[{index}/{total}] {url}"),
        PipelineEvent::ProductSkipped { url, reason } => format!("  skipped {url}: {reason}"),
        PipelineEvent::ProductSaved { folder, .. } => format!("  saved to {}", folder.display()),
        PipelineEvent::ImagesDownloaded {
            downloaded,
            resolved,
            ..
        } => format!("  images: {downloaded}/{resolved}"),
        PipelineEvent::BatchFinished {
            processed_ok,
            total,
        } => format!("Done: {processed_ok}/{total} products parsed"),
    }
}
