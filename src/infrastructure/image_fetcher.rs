//! Product image download through a page session
//!
//! Images are fetched from inside the page so the storefront's cookies apply.
//! Each URL gets a bounded number of attempts; a failed URL keeps its
//! sequence number, so later files are never renumbered.

use crate::infrastructure::config::ImageConfig;
use crate::infrastructure::page_session::{PageSession, settle};
use crate::infrastructure::pipeline_error::{PipelineError, PipelineResult};
use chrono::NaiveDate;
use image::codecs::jpeg::JpegEncoder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

static FORBIDDEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("forbidden chars pattern is valid"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("dash pattern is valid"));

/// Remove characters that are not allowed in file names
pub fn strip_forbidden_chars(text: &str) -> String {
    FORBIDDEN_CHARS.replace_all(text, "").into_owned()
}

/// File-name slug: forbidden characters removed, whitespace runs turned
/// into `-` and repeated dashes collapsed.
pub fn safe_file_stem(text: &str) -> String {
    let stripped = strip_forbidden_chars(text);
    let dashed = WHITESPACE_RUNS.replace_all(&stripped, "-");
    DASH_RUNS.replace_all(&dashed, "-").into_owned()
}

/// `<slug>_<YYYY.MM.DD>`, shared by every image of one product
pub fn image_base_name(display_stem: &str, date: NaiveDate) -> String {
    format!("{}_{}", safe_file_stem(display_stem), date.format("%Y.%m.%d"))
}

/// `<base>_<NN>.jpeg` for the 1-based position `sequence`
pub fn image_file_name(base_name: &str, sequence: usize) -> String {
    format!("{base_name}_{sequence:02}.jpeg")
}

/// Normalize image bytes to RGB JPEG
pub fn reencode_jpeg(bytes: &[u8], quality: u8) -> image::ImageResult<Vec<u8>> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Downloads resolved image URLs with bounded retries
pub struct ImageFetcher {
    settings: ImageConfig,
}

impl ImageFetcher {
    pub fn new(settings: &ImageConfig) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Download every URL in order into `dir`.
    ///
    /// Returns the file names that were saved; a URL that fails every
    /// attempt is left out without affecting the others.
    pub async fn fetch_all(
        &self,
        session: &mut dyn PageSession,
        urls: &[String],
        dir: &Path,
        base_name: &str,
    ) -> Vec<String> {
        let mut saved = Vec::new();
        for (index, url) in urls.iter().enumerate() {
            let file_name = image_file_name(base_name, index + 1);
            match self.fetch_one(session, url, &dir.join(&file_name)).await {
                Ok(()) => saved.push(file_name),
                Err(e) => warn!("{}", e),
            }
        }
        info!("Downloaded {}/{} images into {:?}", saved.len(), urls.len(), dir);
        saved
    }

    async fn fetch_one(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        path: &Path,
    ) -> PipelineResult<()> {
        let attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=attempts {
            debug!(
                "Image download attempt {}/{} | url={} | file={:?}",
                attempt, attempts, url, path
            );
            match session
                .fetch_binary(url, self.settings.transfer_timeout())
                .await
            {
                Ok(Some(bytes)) if !bytes.is_empty() => match self.persist(&bytes, path).await {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!("Saving {:?} failed (attempt {}): {}", path, attempt, e),
                },
                Ok(_) => warn!("Empty image response for {} (attempt {})", url, attempt),
                Err(e) => warn!("Image fetch error for {} (attempt {}): {}", url, attempt, e),
            }

            if attempt < attempts {
                settle(self.settings.retry_delay()).await;
            }
        }

        Err(PipelineError::ImageFetch {
            url: url.to_string(),
            attempts,
        })
    }

    /// Write a re-encoded JPEG, or the raw bytes when they cannot be decoded.
    /// The file is written once so a failed write never truncates a good copy.
    async fn persist(&self, bytes: &[u8], path: &Path) -> std::io::Result<()> {
        let payload = match reencode_jpeg(bytes, self.settings.jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                debug!("Keeping raw bytes for {:?}, re-encode failed: {}", path, e);
                bytes.to_vec()
            }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, payload).await
    }
}
