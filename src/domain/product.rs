use serde::{Deserialize, Serialize};

/// Stand-in artist name when the page carries no author line
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Stand-in title when the page carries no title heading
pub const UNTITLED: &str = "Untitled";

/// Release date shown for items that are not on pre-order
pub const ALREADY_AVAILABLE: &str = "Уже в продаже";

/// Structured data extracted from one product page.
///
/// Every field is always present; missing values are `None` (or the
/// sentinel strings above for `artist`/`title`/`release_date`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub source_url: String,
    pub artist: String,
    pub title: String,
    pub label: Option<String>,
    pub price: Option<String>,
    pub format: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub tracklist: Option<String>,
    pub release_date: String,
    /// Product imagery in resolution-priority order, without duplicates
    pub image_urls: Vec<String>,
    /// Saved image filenames, filled in after the fetch step
    pub downloaded_images: Vec<String>,
}

impl ProductRecord {
    /// Fresh record for `source_url` with every field at its default
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            artist: UNKNOWN_ARTIST.to_string(),
            title: UNTITLED.to_string(),
            label: None,
            price: None,
            format: None,
            genre: None,
            description: None,
            tracklist: None,
            release_date: ALREADY_AVAILABLE.to_string(),
            image_urls: Vec::new(),
            downloaded_images: Vec::new(),
        }
    }

    /// "Artist - Title", the human-readable stem used for folders and images
    pub fn display_stem(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Scalar fields in the fixed order used by `info.txt`
    pub fn scalar_fields(&self) -> [(&'static str, Option<&str>); 9] {
        [
            ("artist", Some(self.artist.as_str())),
            ("title", Some(self.title.as_str())),
            ("label", self.label.as_deref()),
            ("price", self.price.as_deref()),
            ("format", self.format.as_deref()),
            ("genre", self.genre.as_deref()),
            ("description", self.description.as_deref()),
            ("tracklist", self.tracklist.as_deref()),
            ("release_date", Some(self.release_date.as_str())),
        ]
    }
}

/// Ordered, duplicate-free list of product URLs, capped at `max_links`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    urls: Vec<String>,
    cap: usize,
}

impl LinkSet {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            urls: Vec::new(),
            cap,
        }
    }

    /// Appends `url` unless it is already present or the cap is reached.
    /// Returns `true` when the URL was added.
    pub fn push(&mut self, url: String) -> bool {
        if self.is_full() || self.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}
