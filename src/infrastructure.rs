//! Infrastructure layer: configuration, logging, browser sessions, HTML
//! parsing and the storage side of the harvesting pipeline.
//!
//! Every browser interaction goes through the `PageSession` trait, so the
//! collector, extractor and fetcher run the same way against Chromium or
//! against replayed pages.

pub mod config; // Configuration sections, defaults and site constants
pub mod logging; // tracing subscriber setup and log housekeeping
pub mod parsing_error;
pub mod pipeline_error;
pub mod page_session; // PageSession capability
pub mod replay_session; // In-memory session serving recorded pages
#[cfg(feature = "chromium")]
pub mod chromium_session; // Headless Chromium through chromiumoxide
pub mod parsing; // Storefront HTML parsers
pub mod link_collector;
pub mod product_extractor;
pub mod image_fetcher;
pub mod record_writer;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, LoggingConfig};
pub use logging::{cleanup_old_logs, get_log_directory, init_logging, init_logging_with_config};
pub use page_session::{PageSession, SessionError, SessionResult};
pub use replay_session::ReplaySession;
#[cfg(feature = "chromium")]
pub use chromium_session::ChromiumSession;
pub use parsing::{
    ImageResolver, ParsingError, ParsingResult, ProductDetailParser, ProductListParser,
    StorefrontSelectors,
};
pub use pipeline_error::{PipelineError, PipelineResult};
pub use link_collector::LinkCollector;
pub use product_extractor::ProductExtractor;
pub use image_fetcher::{ImageFetcher, safe_file_stem};
pub use record_writer::{RecordWriter, render_record};
