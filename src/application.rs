//! Application layer module
//!
//! Orchestrates the infrastructure stages into batch runs: link collection
//! and product parsing.

pub mod catalog_pipeline;

pub use catalog_pipeline::{
    BatchSummary, CatalogPipeline, close_session, read_link_file, write_link_file,
};
#[cfg(feature = "chromium")]
pub use catalog_pipeline::open_browser_session;
