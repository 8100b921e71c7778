//! Configuration infrastructure
//!
//! Contains configuration loading and management for storefront harvesting.
//!
//! Configuration is organized by concern:
//! 1. Site identity and browser session settings
//! 2. Link collection, extraction and image download behavior
//! 3. Output locations and logging
//! 4. Storefront CSS selectors

#![allow(clippy::derivable_impls)]

use crate::infrastructure::parsing::StorefrontSelectors;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub collection: CollectionConfig,
    pub extraction: ExtractionConfig,
    pub images: ImageConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub selectors: StorefrontSelectors,
}

/// Storefront identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Short identifier written into every record header
    pub site_name: String,

    /// Origin used to resolve relative links and image sources
    pub base_url: String,
}

/// Headless browser session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Explicit Chromium binary; discovered automatically when unset
    pub chromium_path: Option<PathBuf>,

    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
    pub page_load_timeout_secs: u64,

    /// Pause after each navigation so consent banners can settle
    pub cookie_settle_ms: u64,
}

/// Incremental scroll used to load lazily-rendered grid items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub step_px: u32,
    pub pause_ms: u64,
    pub max_steps: u32,

    /// Consecutive steps without movement before scrolling stops
    pub stagnant_limit: u32,
}

/// Catalog pagination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub max_links: usize,
    pub max_pages: u32,
    pub initial_grid_timeout_secs: u64,
    pub next_page_timeout_secs: u64,

    /// Pause after loading a catalog page before inspecting it
    pub page_settle_ms: u64,

    pub scroll: ScrollConfig,
}

/// Product page extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// How long to wait for the product title to render
    pub title_timeout_secs: u64,
}

/// Image download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,

    /// Transport-level timeout of the in-page request
    pub transfer_timeout_secs: u64,

    /// Ceiling for the whole in-page script
    pub script_timeout_secs: u64,

    pub jpeg_quality: u8,
}

/// Where link lists and product folders are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub links_file: PathBuf,
    pub output_root: PathBuf,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for session log files; `logs/parser` next to the working directory when unset
    pub log_dir: Option<PathBuf>,

    /// Number of session log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: bsr::SITE_NAME.to_string(),
            base_url: bsr::BASE_URL.to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: defaults::HEADLESS,
            chromium_path: None,
            window_width: defaults::WINDOW_WIDTH,
            window_height: defaults::WINDOW_HEIGHT,
            user_agent: defaults::USER_AGENT.to_string(),
            page_load_timeout_secs: defaults::PAGE_LOAD_TIMEOUT_SECS,
            cookie_settle_ms: defaults::COOKIE_SETTLE_MS,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_px: defaults::SCROLL_STEP_PX,
            pause_ms: defaults::SCROLL_PAUSE_MS,
            max_steps: defaults::SCROLL_MAX_STEPS,
            stagnant_limit: defaults::SCROLL_STAGNANT_LIMIT,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_links: defaults::MAX_LINKS,
            max_pages: defaults::MAX_PAGES,
            initial_grid_timeout_secs: defaults::INITIAL_GRID_TIMEOUT_SECS,
            next_page_timeout_secs: defaults::NEXT_PAGE_TIMEOUT_SECS,
            page_settle_ms: defaults::PAGE_SETTLE_MS,
            scroll: ScrollConfig::default(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            title_timeout_secs: defaults::TITLE_TIMEOUT_SECS,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::IMAGE_MAX_ATTEMPTS,
            retry_delay_ms: defaults::IMAGE_RETRY_DELAY_MS,
            transfer_timeout_secs: defaults::IMAGE_TRANSFER_TIMEOUT_SECS,
            script_timeout_secs: defaults::IMAGE_SCRIPT_TIMEOUT_SECS,
            jpeg_quality: defaults::JPEG_QUALITY,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            links_file: PathBuf::from(defaults::LINKS_FILE),
            output_root: PathBuf::from(defaults::OUTPUT_ROOT),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
        }
    }
}

impl CollectionConfig {
    pub const fn initial_grid_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_grid_timeout_secs)
    }

    pub const fn next_page_timeout(&self) -> Duration {
        Duration::from_secs(self.next_page_timeout_secs)
    }

    pub const fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }
}

impl ImageConfig {
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub const fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub const fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

impl AppConfig {
    /// Configuration with every pause set to zero, for replayed sessions
    pub fn without_delays() -> Self {
        let mut config = Self::default();
        config.browser.cookie_settle_ms = 0;
        config.collection.page_settle_ms = 0;
        config.collection.scroll.pause_ms = 0;
        config.images.retry_delay_ms = 0;
        config
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("bsr-catalog");

        Ok(config_dir)
    }

    /// Create a configuration manager pointing at the per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("config.json");
        Ok(Self { config_path })
    }

    /// Create a configuration manager for an explicit file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("⚠️  Configuration file could not be parsed: {}", parse_error);
                warn!("⚠️  Resetting to default configuration");

                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// BlackScreen Records storefront constants
pub mod bsr {
    /// Identifier written into record headers and log file names
    pub const SITE_NAME: &str = "BSR";

    /// Storefront origin
    pub const BASE_URL: &str = "https://blackscreenrecords.com";
}

/// Default harvesting configuration values
pub mod defaults {
    pub const HEADLESS: bool = true;
    pub const WINDOW_WIDTH: u32 = 1920;
    pub const WINDOW_HEIGHT: u32 = 1200;
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/94.0.4606.61 Safari/537.36";
    pub const PAGE_LOAD_TIMEOUT_SECS: u64 = 30;
    pub const COOKIE_SETTLE_MS: u64 = 500;

    /// Default cap on collected product URLs
    pub const MAX_LINKS: usize = 200;

    /// Default cap on catalog pages visited
    pub const MAX_PAGES: u32 = 50;

    pub const INITIAL_GRID_TIMEOUT_SECS: u64 = 20;
    pub const NEXT_PAGE_TIMEOUT_SECS: u64 = 15;
    pub const PAGE_SETTLE_MS: u64 = 2000;

    pub const SCROLL_STEP_PX: u32 = 800;
    pub const SCROLL_PAUSE_MS: u64 = 600;
    pub const SCROLL_MAX_STEPS: u32 = 300;
    pub const SCROLL_STAGNANT_LIMIT: u32 = 3;

    pub const TITLE_TIMEOUT_SECS: u64 = 20;

    pub const IMAGE_MAX_ATTEMPTS: u32 = 3;
    pub const IMAGE_RETRY_DELAY_MS: u64 = 2000;
    pub const IMAGE_TRANSFER_TIMEOUT_SECS: u64 = 30;
    pub const IMAGE_SCRIPT_TIMEOUT_SECS: u64 = 60;
    pub const JPEG_QUALITY: u8 = 92;

    pub const LINKS_FILE: &str = "blackscreen_links.txt";
    pub const OUTPUT_ROOT: &str = "parsed";

    // Log configuration defaults
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_MAX_FILES: u32 = 10;
    pub const LOG_AUTO_CLEANUP: bool = true;
}
