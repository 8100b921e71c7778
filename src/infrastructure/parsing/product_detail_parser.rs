//! Product detail parser for rendered product pages
//!
//! Each field has an ordered chain of strategies; the first one producing
//! text wins and a field nobody fills stays `None`. Images are delegated to
//! `ImageResolver`.

use super::config::{StorefrontSelectors, accordion_toggle_for, compile_selector, compile_selectors};
use super::release_date::localize_release_date;
use super::{
    ContextualParser, DetailParseContext, ImageResolver, ParsingResult, compact_text, text_lines,
};
use crate::domain::ProductRecord;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Breadcrumb labels that describe site structure rather than genre
const STRUCTURAL_CRUMBS: &[&str] = &["home", "collections", "products", "all products"];

const PRE_ORDER_MARKER: &str = "pre-order";

/// Parser for extracting a `ProductRecord` from a product page
pub struct ProductDetailParser {
    title_block: Selector,
    title: Selector,
    artist: Selector,
    label: Selector,
    price: Selector,
    format_popout: Selector,
    format_radio: Selector,
    breadcrumbs: Selector,
    tags: Selector,
    description_toggle: Selector,
    tracklist_toggle: Selector,
    any_with_id: Selector,
    accordion_content_class: String,
    description_blocks: Selector,
    tracklist_blocks: Vec<Selector>,
    disclaimer_title: Selector,
    disclaimer_date: Selector,
    images: ImageResolver,
}

impl ProductDetailParser {
    /// Create a new product detail parser with default configuration
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&StorefrontSelectors::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(selectors: &StorefrontSelectors) -> ParsingResult<Self> {
        let d = &selectors.detail;
        Ok(Self {
            title_block: compile_selector(&d.title_block)?,
            title: compile_selector(&d.title)?,
            artist: compile_selector(&d.artist)?,
            label: compile_selector(&d.label)?,
            price: compile_selector(&d.price)?,
            format_popout: compile_selector(&d.format_popout)?,
            format_radio: compile_selector(&d.format_radio)?,
            breadcrumbs: compile_selector(&d.breadcrumbs)?,
            tags: compile_selector(&d.tags)?,
            description_toggle: accordion_toggle_for(&d.accordion_toggle, &d.description_section)?,
            tracklist_toggle: accordion_toggle_for(&d.accordion_toggle, &d.tracklist_section)?,
            any_with_id: compile_selector("[id]")?,
            accordion_content_class: d.accordion_content_class.clone(),
            description_blocks: compile_selector(&d.description_blocks)?,
            tracklist_blocks: compile_selectors(&d.tracklist_blocks)?,
            disclaimer_title: compile_selector(&d.disclaimer_title)?,
            disclaimer_date: compile_selector(&d.disclaimer_date)?,
            images: ImageResolver::with_config(&selectors.gallery)?,
        })
    }

    /// Build the full record for a rendered product page
    pub fn parse(&self, html: &Html, context: &DetailParseContext) -> ProductRecord {
        let mut record = ProductRecord::new(context.url.clone());

        let (title, artist) = self.extract_title_and_artist(html);
        if let Some(title) = title {
            record.title = title;
        }
        if let Some(artist) = artist {
            record.artist = artist;
        }

        record.label = self.extract_label(html);
        record.price = first_text(html, &self.price);
        record.format = first_text(html, &self.format_popout)
            .or_else(|| first_text(html, &self.format_radio));
        record.genre = self.extract_genre(html);
        record.description = non_empty(self.extract_description(html));
        record.tracklist = non_empty(self.extract_tracklist(html));
        if let Some(date) = self.extract_release_date(html) {
            record.release_date = date;
        }
        record.image_urls = self.images.resolve(html, &context.base_url);

        debug!(
            "Parsed '{}' with {} image(s) from {}",
            record.display_stem(),
            record.image_urls.len(),
            context.url
        );
        record
    }

    /// Title and artist, preferring the scoped title block
    fn extract_title_and_artist(&self, html: &Html) -> (Option<String>, Option<String>) {
        let mut title = None;
        let mut artist = None;

        if let Some(block) = html.select(&self.title_block).next() {
            title = first_text_in(&block, &self.title);
            artist = first_text_in(&block, &self.artist).map(strip_by_prefix);
        }

        if title.is_none() {
            title = first_text(html, &self.title);
        }
        if artist.is_none() {
            artist = first_text(html, &self.artist).map(strip_by_prefix);
        }

        (title, artist)
    }

    /// Labels separated by commas or slashes, rejoined with ", "
    fn extract_label(&self, html: &Html) -> Option<String> {
        let raw = first_text(html, &self.label)?;
        let parts: Vec<&str> = raw
            .split([',', '/'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    fn extract_genre(&self, html: &Html) -> Option<String> {
        let crumbs: Vec<String> = html
            .select(&self.breadcrumbs)
            .map(|a| compact_text(&a))
            .filter(|c| !c.is_empty() && !STRUCTURAL_CRUMBS.contains(&c.to_lowercase().as_str()))
            .collect();
        if let Some(genre) = join_unique(crumbs, ", ") {
            return Some(genre);
        }

        let tags: Vec<String> = html
            .select(&self.tags)
            .map(|a| compact_text(&a))
            .filter(|t| !t.is_empty())
            .collect();
        join_unique(tags, ", ")
    }

    /// Description text, or an empty string when the section is absent
    fn extract_description(&self, html: &Html) -> String {
        let Some(content) = self.accordion_content(html, &self.description_toggle) else {
            return String::new();
        };

        let blocks: Vec<String> = content
            .select(&self.description_blocks)
            .map(|node| text_lines(&node))
            .filter(|t| !t.is_empty())
            .collect();

        if blocks.is_empty() {
            text_lines(&content)
        } else {
            join_unique(blocks, "\n").unwrap_or_default()
        }
    }

    /// Tracklist lines, or an empty string when the section is absent
    fn extract_tracklist(&self, html: &Html) -> String {
        let Some(content) = self.accordion_content(html, &self.tracklist_toggle) else {
            return String::new();
        };

        let node = self
            .tracklist_blocks
            .iter()
            .find_map(|selector| content.select(selector).next())
            .unwrap_or(content);

        text_lines(&node)
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Localized date of a pre-order disclaimer, if the page carries one
    fn extract_release_date(&self, html: &Html) -> Option<String> {
        let title = first_text(html, &self.disclaimer_title)?;
        if !title.to_lowercase().contains(PRE_ORDER_MARKER) {
            return None;
        }
        let raw = html
            .select(&self.disclaimer_date)
            .next()
            .map(|e| compact_text(&e))?;
        Some(localize_release_date(&raw))
    }

    /// Container targeted by the first accordion toggle matching `toggle`
    fn accordion_content<'a>(&self, html: &'a Html, toggle: &Selector) -> Option<ElementRef<'a>> {
        let target = html
            .select(toggle)
            .next()?
            .value()
            .attr("aria-controls")?
            .trim();
        if target.is_empty() {
            return None;
        }

        let mut with_id = html
            .select(&self.any_with_id)
            .filter(|e| e.value().id() == Some(target));
        let first = with_id.next()?;
        if first
            .value()
            .classes()
            .any(|c| c == self.accordion_content_class)
        {
            return Some(first);
        }
        Some(
            with_id
                .find(|e| {
                    e.value()
                        .classes()
                        .any(|c| c == self.accordion_content_class)
                })
                .unwrap_or(first),
        )
    }
}

impl ContextualParser for ProductDetailParser {
    type Output = ProductRecord;
    type Context = DetailParseContext;

    fn parse_with_context(
        &self,
        html: &Html,
        context: &Self::Context,
    ) -> ParsingResult<Self::Output> {
        Ok(self.parse(html, context))
    }
}

fn first_text(html: &Html, selector: &Selector) -> Option<String> {
    html.select(selector)
        .next()
        .map(|e| compact_text(&e))
        .filter(|t| !t.is_empty())
}

fn first_text_in(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| compact_text(&e))
        .filter(|t| !t.is_empty())
}

fn strip_by_prefix(author: String) -> String {
    match author.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("by ") => author[3..].trim_start().to_string(),
        _ => author,
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Order-preserving dedup joined with `separator`; `None` when nothing is left
fn join_unique(items: Vec<String>, separator: &str) -> Option<String> {
    let mut unique: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    (!unique.is_empty()).then(|| unique.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ALREADY_AVAILABLE, UNKNOWN_ARTIST, UNTITLED};

    const URL: &str = "https://blackscreenrecords.com/collections/new/products/lp?variant=1";
    const BASE: &str = "https://blackscreenrecords.com";

    fn parse(body: &str) -> ProductRecord {
        let html = Html::parse_document(&format!("<html><body>{body}</body></html>"));
        ProductDetailParser::new()
            .unwrap()
            .parse(&html, &DetailParseContext::new(URL, BASE))
    }

    const FULL_PAGE: &str = r#"
        <nav class="breadcrumb"><a>Home</a><a>Soundtracks</a><a>Vinyl</a><a>Soundtracks</a></nav>
        <div class="product__title-and-price">
          <h1 class="product__title"> Halloween III </h1>
          <h3 class="product__author">By John Carpenter</h3>
          <span data-product-price>$32.00</span>
        </div>
        <div class="product__block"><div class="product__subheading"><p>Black Screen / Sacred Bones,, </p></div></div>
        <button class="select-popout__toggle"><span class="select-popout__value">Orange Vinyl</span></button>
        <button class="product__accordion__title" aria-controls="page-description-42">Description</button>
        <div id="page-description-42" class="product__accordion__content">
          <div class="product__accordion__inner"><p>First pressing.</p><p>Gatefold.</p></div>
          <div class="rte"><p>First pressing.</p><p>Gatefold.</p></div>
        </div>
        <button class="product__accordion__title" aria-controls="page-tracklist-42">Tracklist</button>
        <div id="page-tracklist-42" class="product__accordion__content">
          <div class="metafield-multi_line_text_field">A1 Main Title<br>A2 Chariots of Pumpkins<br>B1 Drive</div>
        </div>
        <div class="product-disclaimer">
          <div class="product-disclaimer__title">Pre-Order Item</div>
          <div class="product-disclaimer__text">Ships <strong>March 21, 2026</strong></div>
        </div>
        <div data-product-slide data-type="image"><img src="//blackscreenrecords.com/cdn/shop/files/h3.jpg"></div>
    "#;

    #[test]
    fn test_full_page_extraction() {
        let record = parse(FULL_PAGE);
        assert_eq!(record.title, "Halloween III");
        assert_eq!(record.artist, "John Carpenter");
        assert_eq!(record.label.as_deref(), Some("Black Screen, Sacred Bones"));
        assert_eq!(record.price.as_deref(), Some("$32.00"));
        assert_eq!(record.format.as_deref(), Some("Orange Vinyl"));
        assert_eq!(record.genre.as_deref(), Some("Soundtracks, Vinyl"));
        assert_eq!(record.description.as_deref(), Some("First pressing.\nGatefold."));
        assert_eq!(
            record.tracklist.as_deref(),
            Some("A1 Main Title\nA2 Chariots of Pumpkins\nB1 Drive")
        );
        assert_eq!(record.release_date, "21 Марта 2026");
        assert_eq!(
            record.image_urls,
            vec!["https://blackscreenrecords.com/cdn/shop/files/h3.jpg"]
        );
        assert!(record.downloaded_images.is_empty());
    }

    #[test]
    fn test_bare_page_defaults_every_field() {
        let record = parse("<p>nothing here</p>");
        assert_eq!(record.artist, UNKNOWN_ARTIST);
        assert_eq!(record.title, UNTITLED);
        assert_eq!(record.release_date, ALREADY_AVAILABLE);
        for (name, value) in record.scalar_fields() {
            if !matches!(name, "artist" | "title" | "release_date") {
                assert_eq!(value, None, "{name}");
            }
        }
        assert!(record.image_urls.is_empty());
    }

    #[test]
    fn test_unscoped_title_and_artist_fallback() {
        let record = parse(
            r#"<div class="product__title-and-price"><h1 class="product__title">Scoped</h1></div>
               <h3 class="product__author">by Goblin</h3>"#,
        );
        assert_eq!(record.title, "Scoped");
        assert_eq!(record.artist, "Goblin");
    }

    #[test]
    fn test_format_falls_back_to_checked_radio() {
        let record = parse(
            r#"<span class="radio__button"><input class="radio__input" type="radio"><label class="radio__label"><span>Black</span></label></span>
               <span class="radio__button"><input class="radio__input" type="radio" checked><label class="radio__label"><span>Splatter</span></label></span>"#,
        );
        assert_eq!(record.format.as_deref(), Some("Splatter"));
    }

    #[test]
    fn test_genre_falls_back_to_tags() {
        let record = parse(
            r#"<nav class="breadcrumb"><a>Home</a><a>All Products</a></nav>
               <div class="product__tags"><a>Horror</a><a>Synth</a><a>Horror</a></div>"#,
        );
        assert_eq!(record.genre.as_deref(), Some("Horror, Synth"));
    }

    #[test]
    fn test_description_without_blocks_uses_container_text() {
        let record = parse(
            r#"<button class="product__accordion__title" aria-controls="page-description-7">D</button>
               <div id="page-description-7"><p>Line one</p><p>Line two</p></div>"#,
        );
        assert_eq!(record.description.as_deref(), Some("Line one\nLine two"));
    }

    #[test]
    fn test_missing_accordion_target_yields_none() {
        let record = parse(
            r#"<button class="product__accordion__title" aria-controls="page-tracklist-9">T</button>"#,
        );
        assert_eq!(record.tracklist, None);
        assert_eq!(record.description, None);
    }

    #[test]
    fn test_release_date_requires_pre_order_title() {
        let record = parse(
            r#"<div class="product-disclaimer__title">Shipping info</div>
               <div class="product-disclaimer__text"><b>MARCH 2026</b></div>"#,
        );
        assert_eq!(record.release_date, ALREADY_AVAILABLE);

        let record = parse(
            r#"<div class="product-disclaimer__title">PRE-ORDER</div>
               <div class="product-disclaimer__text"><b>MARCH 2026</b></div>"#,
        );
        assert_eq!(record.release_date, "Март 2026");

        let record = parse(
            r#"<div class="product-disclaimer__title">pre-order</div>
               <div class="product-disclaimer__text"><b>Coming Soon</b></div>"#,
        );
        assert_eq!(record.release_date, "Coming Soon");
    }
}
