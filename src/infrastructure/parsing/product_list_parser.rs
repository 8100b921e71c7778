//! Product list parser for catalog grid pages
//!
//! Turns the rendered product grid into absolute product URLs, skipping
//! sold-out tiles and anything that is not a collection product link.

use super::config::{GridSelectors, compile_selector};
use super::url_rules::{append_variant, is_collection_product_href, resolve_product_href};
use super::{ContextualParser, ParseContext, ParsingResult};
use crate::domain::LinkSet;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Parser for extracting product links from catalog grid pages
pub struct ProductListParser {
    grid_item: Selector,
    product_link: Selector,
    sold_out_badge: Selector,
    variant_input: Selector,
}

impl ProductListParser {
    /// Create a new product list parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&GridSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &GridSelectors) -> ParsingResult<Self> {
        Ok(Self {
            grid_item: compile_selector(&selectors.grid_item)?,
            product_link: compile_selector(&selectors.product_link)?,
            sold_out_badge: compile_selector(&selectors.sold_out_badge)?,
            variant_input: compile_selector(&selectors.variant_input)?,
        })
    }

    /// Add this page's product URLs to `links` in document order.
    ///
    /// Stops as soon as `links` is full. Returns how many URLs were new.
    pub fn scan_page(&self, html: &Html, context: &ParseContext, links: &mut LinkSet) -> usize {
        let mut added = 0;
        for item in html.select(&self.grid_item) {
            if links.is_full() {
                break;
            }
            if let Some(url) = self.product_url(&item, &context.base_url) {
                if links.push(url) {
                    added += 1;
                }
            }
        }
        debug!("Page {}: {} new product links", context.page, added);
        added
    }

    /// Product URL for one grid tile, or `None` when the tile is skipped
    fn product_url(&self, item: &ElementRef, base_url: &str) -> Option<String> {
        if item.select(&self.sold_out_badge).next().is_some() {
            debug!("Skipping sold-out grid item");
            return None;
        }

        let href = item
            .select(&self.product_link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())?;

        if !is_collection_product_href(href) {
            debug!("Skipping non-product link: {}", href);
            return None;
        }

        let href = match item
            .select(&self.variant_input)
            .next()
            .and_then(|input| input.value().attr("value"))
        {
            Some(variant_id) => append_variant(href, variant_id),
            None => href.to_string(),
        };

        match resolve_product_href(&href, base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

impl ContextualParser for ProductListParser {
    type Output = Vec<String>;
    type Context = ParseContext;

    /// Every product URL on the page, in document order, repeats included
    fn parse_with_context(
        &self,
        html: &Html,
        context: &Self::Context,
    ) -> ParsingResult<Self::Output> {
        Ok(html
            .select(&self.grid_item)
            .filter_map(|item| self.product_url(&item, &context.base_url))
            .collect())
    }
}
