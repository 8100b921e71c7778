//! Parsing context for HTML extraction
//!
//! Provides context objects describing where a document came from.

/// Context for catalog grid pages
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Catalog page number, starting at 1
    pub page: u32,

    /// Base URL for resolving relative links
    pub base_url: String,
}

impl ParseContext {
    pub fn new(page: u32, base_url: impl Into<String>) -> Self {
        Self {
            page,
            base_url: base_url.into(),
        }
    }
}

/// Context for product pages
#[derive(Debug, Clone)]
pub struct DetailParseContext {
    /// Product URL being parsed
    pub url: String,

    /// Base URL for resolving relative resources
    pub base_url: String,
}

impl DetailParseContext {
    pub fn new(url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_url: base_url.into(),
        }
    }
}
