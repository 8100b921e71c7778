//! `info.txt` persistence for product records

use crate::domain::ProductRecord;
use crate::infrastructure::image_fetcher::strip_forbidden_chars;
use crate::infrastructure::pipeline_error::{PipelineError, PipelineResult};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const INFO_FILE_NAME: &str = "info.txt";

/// Key-value text for `record`, without the downloaded image block
pub fn render_record(record: &ProductRecord, site_name: &str) -> String {
    let mut lines = vec![
        format!("Source URL: {}", record.source_url),
        format!("Site: {site_name}"),
        String::new(),
    ];

    for (key, value) in record.scalar_fields() {
        match value {
            Some(value) => lines.push(format!("{key}: {value}")),
            None => lines.push(format!("{key}:")),
        }
    }

    lines.push("image_urls:".to_string());
    lines.extend(record.image_urls.iter().map(|url| format!("  {url}")));

    lines.join("\n")
}

/// Writes one folder per product under the output root
#[derive(Debug, Clone)]
pub struct RecordWriter {
    output_root: PathBuf,
    site_name: String,
}

impl RecordWriter {
    pub fn new(output_root: impl Into<PathBuf>, site_name: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            site_name: site_name.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// `<root>/<Artist - Title>_<YYYY-MM-DD_HH-MM-SS>` for a record saved now
    pub fn product_folder(&self, record: &ProductRecord) -> PathBuf {
        self.product_folder_at(record, Local::now())
    }

    pub fn product_folder_at(&self, record: &ProductRecord, at: DateTime<Local>) -> PathBuf {
        let stem = strip_forbidden_chars(&record.display_stem());
        self.output_root
            .join(format!("{}_{}", stem, at.format("%Y-%m-%d_%H-%M-%S")))
    }

    /// Write `info.txt` into `folder`, creating it if needed
    pub async fn write(&self, record: &ProductRecord, folder: &Path) -> PipelineResult<PathBuf> {
        let path = folder.join(INFO_FILE_NAME);
        let write_error = |source: std::io::Error| PipelineError::RecordWrite {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(folder).await.map_err(write_error)?;
        tokio::fs::write(&path, render_record(record, &self.site_name))
            .await
            .map_err(write_error)?;

        info!("Saved product info: {:?}", path);
        Ok(path)
    }

    /// Append the `downloaded_images:` block; nothing happens for an empty list
    pub async fn append_downloaded_images(
        &self,
        info_path: &Path,
        file_names: &[String],
    ) -> PipelineResult<()> {
        if file_names.is_empty() {
            debug!("No downloaded images to record in {:?}", info_path);
            return Ok(());
        }

        let mut block = String::from("\n\ndownloaded_images:\n");
        block.push_str(
            &file_names
                .iter()
                .map(|name| format!("  {name}"))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let write_error = |source: std::io::Error| PipelineError::RecordWrite {
            path: info_path.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(info_path)
            .await
            .map_err(write_error)?;
        file.write_all(block.as_bytes()).await.map_err(write_error)?;
        file.flush().await.map_err(write_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record() -> ProductRecord {
        let mut record = ProductRecord::new("https://blackscreenrecords.com/products/suspiria");
        record.artist = "Goblin".to_string();
        record.title = "Suspiria: OST".to_string();
        record.label = Some("Death Waltz".to_string());
        record.release_date = "12.10.2026".to_string();
        record.image_urls = vec![
            "https://cdn.test/a.jpg".to_string(),
            "https://cdn.test/b.jpg".to_string(),
        ];
        record
    }

    #[test]
    fn test_render_record_layout() {
        let text = render_record(&record(), "BSR");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Source URL: https://blackscreenrecords.com/products/suspiria");
        assert_eq!(lines[1], "Site: BSR");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "artist: Goblin");
        assert_eq!(lines[4], "title: Suspiria: OST");
        assert_eq!(lines[5], "label: Death Waltz");
        assert_eq!(lines[6], "price:");
        assert!(text.contains("release_date: 12.10.2026"));
        assert!(text.ends_with("image_urls:\n  https://cdn.test/a.jpg\n  https://cdn.test/b.jpg"));
    }

    #[test]
    fn test_missing_description_and_tracklist_render_as_bare_keys() {
        let text = render_record(&record(), "BSR");
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines.contains(&"description:"));
        assert!(lines.contains(&"tracklist:"));
    }

    #[test]
    fn test_product_folder_strips_forbidden_chars() {
        let writer = RecordWriter::new("parsed", "BSR");
        let at = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();

        let folder = writer.product_folder_at(&record(), at);

        assert_eq!(
            folder,
            PathBuf::from("parsed").join("Goblin - Suspiria OST_2026-03-04_05-06-07")
        );
    }

    #[tokio::test]
    async fn test_write_then_append_images() {
        let dir = TempDir::new().unwrap();
        let writer = RecordWriter::new(dir.path(), "BSR");
        let folder = dir.path().join("nested").join("product");

        let path = writer.write(&record(), &folder).await.unwrap();
        writer
            .append_downloaded_images(&path, &["x_01.jpeg".to_string(), "x_03.jpeg".to_string()])
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(path, folder.join(INFO_FILE_NAME));
        assert!(text.ends_with("\n\ndownloaded_images:\n  x_01.jpeg\n  x_03.jpeg"));
    }

    #[tokio::test]
    async fn test_append_nothing_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let writer = RecordWriter::new(dir.path(), "BSR");
        let path = writer.write(&record(), dir.path()).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        writer.append_downloaded_images(&path, &[]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_unwritable_folder_is_record_write_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "occupied").unwrap();
        let writer = RecordWriter::new(dir.path(), "BSR");

        let err = writer.write(&record(), &blocker.join("sub")).await.unwrap_err();

        assert!(matches!(err, PipelineError::RecordWrite { .. }));
    }
}
