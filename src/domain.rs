//! Domain module - product records, link sets and pipeline events
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod events;
pub mod product;

pub use events::{EventSink, PipelineEvent, PipelineStage};
pub use product::{ALREADY_AVAILABLE, LinkSet, ProductRecord, UNKNOWN_ARTIST, UNTITLED};
