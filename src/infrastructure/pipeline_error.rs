//! Pipeline failure taxonomy
//!
//! Only `SessionSetup` and `LinkFile` abort a whole run. Every other variant
//! is caught at its own boundary, logged and turned into a skip.

use crate::infrastructure::page_session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Browser session could not be created: {0}")]
    SessionSetup(#[source] SessionError),

    #[error("Catalog grid never appeared at {url}: {source}")]
    CollectionTimeout {
        url: String,
        #[source]
        source: SessionError,
    },

    #[error("Product page {url} did not render its title: {source}")]
    PageRenderTimeout {
        url: String,
        #[source]
        source: SessionError,
    },

    #[error("Image {url} not downloaded after {attempts} attempts")]
    ImageFetch { url: String, attempts: u32 },

    #[error("Record could not be written to {path:?}: {source}")]
    RecordWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Link list file {path:?} unavailable: {source}")]
    LinkFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Failures that end the whole run instead of a single item
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionSetup(_) | Self::LinkFile { .. })
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_setup_and_link_file_are_fatal() {
        assert!(PipelineError::SessionSetup(SessionError::Launch("no binary".into())).is_fatal());
        assert!(
            !PipelineError::ImageFetch {
                url: "https://x/a.jpg".into(),
                attempts: 3
            }
            .is_fatal()
        );
        assert!(
            !PipelineError::PageRenderTimeout {
                url: "https://x/p".into(),
                source: SessionError::Timeout {
                    selector: "h1".into(),
                    waited_ms: 10
                }
            }
            .is_fatal()
        );
    }
}
