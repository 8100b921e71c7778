//! Storefront selector configuration
//!
//! Centralized CSS selectors for the catalog grid, product pages and the
//! product gallery. Stored as plain strings so they can live in the JSON
//! config file; each parser compiles its share once at construction.

use super::{ParsingError, ParsingResult};
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// Every selector the storefront parsers rely on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontSelectors {
    pub grid: GridSelectors,
    pub detail: DetailSelectors,
    pub gallery: GallerySelectors,
}

/// Catalog grid selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSelectors {
    /// One product tile; also the element link collection waits for
    pub grid_item: String,
    pub product_link: String,
    pub sold_out_badge: String,
    /// Hidden input carrying the default variant id
    pub variant_input: String,
}

/// Product page selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSelectors {
    /// Scoped block holding title and author
    pub title_block: String,
    /// Main heading; its presence marks a rendered product page
    pub title: String,
    pub artist: String,
    pub label: String,
    pub price: String,
    pub format_popout: String,
    pub format_radio: String,
    pub breadcrumbs: String,
    pub tags: String,
    /// Accordion toggles; the section is chosen by `aria-controls`
    pub accordion_toggle: String,
    pub accordion_content_class: String,
    pub description_section: String,
    pub description_blocks: String,
    pub tracklist_section: String,
    /// Tried in order; the accordion container itself is the last resort
    pub tracklist_blocks: Vec<String>,
    pub disclaimer_title: String,
    pub disclaimer_date: String,
}

/// Product imagery selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GallerySelectors {
    pub image_slide: String,
    pub slide_image: String,
    pub product_json: String,
}

impl Default for GridSelectors {
    fn default() -> Self {
        Self {
            grid_item: "div.product-grid-item".to_string(),
            product_link: "a.product-grid-item__title[data-grid-link]".to_string(),
            sold_out_badge: "div.product__badge div.product__badge__svg[aria-label='Sold out']"
                .to_string(),
            variant_input: "form[data-product-form] input[name='id']".to_string(),
        }
    }
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            title_block: ".product__title-and-price".to_string(),
            title: "h1.product__title".to_string(),
            artist: "h3.product__author".to_string(),
            label: "div.product__block div.product__subheading p".to_string(),
            price: "span[data-product-price]".to_string(),
            format_popout: "button.select-popout__toggle span.select-popout__value".to_string(),
            // Rendered markup carries the checked state as an attribute
            format_radio: "span.radio__button input.radio__input[checked] + label.radio__label span"
                .to_string(),
            breadcrumbs: "nav.breadcrumb a, ol.breadcrumb a".to_string(),
            tags: ".product__tags a".to_string(),
            accordion_toggle: "button.product__accordion__title".to_string(),
            accordion_content_class: "product__accordion__content".to_string(),
            description_section: "page-description-".to_string(),
            description_blocks: ".product__accordion__inner, .metafield-rich_text_field, .rte"
                .to_string(),
            tracklist_section: "page-tracklist-".to_string(),
            tracklist_blocks: vec![
                ".metafield-multi_line_text_field".to_string(),
                ".product__accordion__inner".to_string(),
            ],
            disclaimer_title: ".product-disclaimer__title".to_string(),
            disclaimer_date: ".product-disclaimer__text strong, .product-disclaimer__text b"
                .to_string(),
        }
    }
}

impl Default for GallerySelectors {
    fn default() -> Self {
        Self {
            image_slide: r#"div[data-product-slide][data-type="image"]"#.to_string(),
            slide_image: "img".to_string(),
            product_json: r#"script[type="application/json"][id*="ProductJson"]"#.to_string(),
        }
    }
}

/// Compile one selector string
pub fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))
}

/// Compile an ordered list of fallback selectors; every entry must be valid
pub fn compile_selectors(selectors: &[String]) -> ParsingResult<Vec<Selector>> {
    selectors.iter().map(|s| compile_selector(s)).collect()
}

/// Accordion section selector for toggles whose target id contains `section`
pub fn accordion_toggle_for(toggle: &str, section: &str) -> ParsingResult<Selector> {
    compile_selector(&format!(r#"{toggle}[aria-controls*="{section}"]"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        let s = StorefrontSelectors::default();
        for selector in [
            &s.grid.grid_item,
            &s.grid.product_link,
            &s.grid.sold_out_badge,
            &s.grid.variant_input,
            &s.detail.title_block,
            &s.detail.format_radio,
            &s.detail.breadcrumbs,
            &s.detail.description_blocks,
            &s.detail.disclaimer_date,
            &s.gallery.image_slide,
            &s.gallery.product_json,
        ] {
            assert!(compile_selector(selector).is_ok(), "{selector}");
        }
        assert_eq!(compile_selectors(&s.detail.tracklist_blocks).unwrap().len(), 2);
        assert!(accordion_toggle_for(&s.detail.accordion_toggle, "page-tracklist-").is_ok());
    }

    #[test]
    fn test_invalid_selector_is_reported() {
        let err = compile_selector("div[").unwrap_err();
        assert!(matches!(err, ParsingError::InvalidSelector { .. }));
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let s: StorefrontSelectors =
            serde_json::from_str(r#"{"grid": {"grid_item": "li.card"}}"#).unwrap();
        assert_eq!(s.grid.grid_item, "li.card");
        assert_eq!(s.grid.product_link, GridSelectors::default().product_link);
        assert_eq!(s.detail, DetailSelectors::default());
    }
}
