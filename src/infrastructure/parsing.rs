//! Storefront HTML parsing
//!
//! Trait-based parsers for catalog grids and product pages. Parsers are
//! synchronous and work on an already rendered document; fetching and
//! waiting belong to the page session layer.

pub mod config;
pub mod context;
pub mod error;
pub mod image_resolver;
pub mod product_detail_parser;
pub mod product_list_parser;
pub mod release_date;
pub mod url_rules;

// Re-export public types
pub use config::StorefrontSelectors;
pub use context::{DetailParseContext, ParseContext};
pub use error::{ParsingError, ParsingResult};
pub use image_resolver::ImageResolver;
pub use product_detail_parser::ProductDetailParser;
pub use product_list_parser::ProductListParser;
pub use release_date::localize_release_date;

use scraper::{ElementRef, Html};

/// Parser trait with context support
pub trait ContextualParser {
    type Output;
    type Context;

    /// Parse HTML with contextual information
    fn parse_with_context(&self, html: &Html, context: &Self::Context)
    -> ParsingResult<Self::Output>;
}

/// Text of `element` with every text node trimmed and blank nodes dropped,
/// concatenated without a separator.
pub fn compact_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Trimmed, non-empty text nodes of `element`, one per line
pub fn text_lines(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
