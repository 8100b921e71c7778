//! BSR Catalog - browser-driven product catalog harvester
//!
//! Collects product links from the BlackScreen Records storefront, extracts
//! each product page into a text record and downloads its imagery.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod cli;

pub use application::{BatchSummary, CatalogPipeline};
pub use domain::{EventSink, PipelineEvent, ProductRecord};

/// Parse the command line and execute the requested run
pub async fn run() -> anyhow::Result<()> {
    use clap::Parser;

    cli::execute(cli::Cli::parse()).await
}
