//! Progress events emitted by the catalog pipeline
//!
//! The pipeline never talks to a presentation layer directly. Instead it
//! pushes `PipelineEvent`s into an optional channel; a CLI, a GUI or a test
//! can listen on the receiving end.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Represents the current stage of a pipeline run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PipelineStage {
    /// Paginating the catalog and gathering product URLs
    LinkCollection,
    /// Visiting product pages, writing records and images
    ProductParsing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkCollection => write!(f, "link collection"),
            Self::ProductParsing => write!(f, "product parsing"),
        }
    }
}

/// Everything a front-end may want to display while a run is in progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: PipelineStage,
        target: String,
    },
    PageScanned {
        page: u32,
        collected: usize,
        added: usize,
    },
    LinksCollected {
        total: usize,
    },
    ProductStarted {
        index: usize,
        total: usize,
        url: String,
    },
    ProductSkipped {
        url: String,
        reason: String,
    },
    ProductSaved {
        url: String,
        folder: PathBuf,
    },
    ImagesDownloaded {
        url: String,
        downloaded: usize,
        resolved: usize,
    },
    BatchFinished {
        processed_ok: usize,
        total: usize,
    },
}

/// Fire-and-forget sender for pipeline events.
///
/// A missing or closed receiver is not an error: events are simply dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("Event receiver dropped; discarding pipeline event");
            }
        }
    }
}
