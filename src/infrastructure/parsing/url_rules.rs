//! URL helpers shared by the storefront parsers
//!
//! Normalization of image sources, the product-image classifier, responsive
//! candidate sets and product link resolution.

use super::error::{ParsingError, ParsingResult};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Substrings marking decorative or UI imagery
pub const NON_PRODUCT_MARKERS: &[&str] = &[
    "bsr-logo",
    "logo",
    "header",
    "footer",
    "icon",
    "favicon",
    "pattern",
    "background",
    "bg-",
    "blank",
    "payment",
    "badge",
    "banner",
    "loading",
    ".svg",
    ".gif",
    "135x135",
    "32x32",
    "64x64",
    "100x100",
    "180x",
    "360x",
];

/// Asset paths under which the storefront serves product photos
pub const PRODUCT_ASSET_PATHS: &[&str] = &["/cdn/shop/products/", "/cdn/shop/files/"];

// `_<width>x<height>.` size suffix in CDN file names
static SIZE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d+)x(\d+)\.").expect("size marker pattern is valid"));

/// Make an image source absolute and secure.
///
/// Protocol-relative sources gain `https:`, `http://` is upgraded and
/// anything else not starting with `http` is joined onto `base_url`.
/// Returns `None` for a blank source.
pub fn normalize_url(url: &str, base_url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let normalized = if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{rest}")
    } else if !url.starts_with("http") {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    } else {
        url.to_string()
    };

    Some(normalized)
}

/// Blacklist first, then require a product asset path
pub fn is_product_image(url: &str) -> bool {
    let lower = url.to_lowercase();
    if NON_PRODUCT_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    PRODUCT_ASSET_PATHS.iter().any(|p| lower.contains(p))
}

/// One entry of a responsive candidate set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate {
    pub url: String,
    pub width: u32,
}

/// Parse a `srcset`-style attribute into `(url, width)` candidates.
///
/// The width comes from a `<N>w` descriptor, else from a `_<W>x<H>.` size
/// marker in the URL, else 0.
pub fn parse_srcset(srcset: &str) -> Vec<SrcsetCandidate> {
    srcset
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split_whitespace();
            let url = parts.next()?;
            let declared = parts
                .next()
                .and_then(|d| d.strip_suffix('w'))
                .and_then(|w| w.parse::<u32>().ok())
                .unwrap_or(0);
            let width = if declared > 0 {
                declared
            } else {
                SIZE_MARKER
                    .captures(url)
                    .and_then(|c| c[1].parse::<u32>().ok())
                    .unwrap_or(0)
            };
            Some(SrcsetCandidate {
                url: url.to_string(),
                width,
            })
        })
        .collect()
}

/// Widest candidate; the first one wins a tie
pub fn highest_resolution(candidates: &[SrcsetCandidate]) -> Option<&SrcsetCandidate> {
    candidates
        .iter()
        .fold(None, |best: Option<&SrcsetCandidate>, c| match best {
            Some(b) if b.width >= c.width => Some(b),
            _ => Some(c),
        })
}

/// Whether a grid link points at a product inside a collection
pub fn is_collection_product_href(href: &str) -> bool {
    href.contains("/collections/") && href.contains("/products/")
}

/// Append `variant=<id>` unless the href already selects a variant
pub fn append_variant(href: &str, variant_id: &str) -> String {
    let variant_id = variant_id.trim();
    if href.contains("variant=") || variant_id.is_empty() {
        return href.to_string();
    }
    let separator = if href.contains('?') { '&' } else { '?' };
    format!("{href}{separator}variant={variant_id}")
}

/// Absolute product URL for a grid link
pub fn resolve_product_href(href: &str, base_url: &str) -> ParsingResult<String> {
    let resolution_failed =
        |e: url::ParseError| ParsingError::url_resolution_failed(href, e, Some(base_url));
    let base = Url::parse(base_url).map_err(resolution_failed)?;
    base.join(href).map(String::from).map_err(resolution_failed)
}

/// Catalog URL for page `page`, derived from the page currently shown
pub fn next_page_url(current_url: &str, page: u32) -> String {
    match Url::parse(current_url) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.set_query(Some(&format!("page={page}")));
            url.into()
        }
        Err(_) => {
            let base = current_url.split('?').next().unwrap_or(current_url);
            format!("{base}?page={page}")
        }
    }
}
