//! Product image resolution
//!
//! Gallery slides are the primary source. Each slide contributes at most one
//! image: its last `<img>` source when that is a product photo, else the
//! widest entry of a responsive candidate set. Only when the gallery yields
//! nothing is the embedded product JSON consulted, and its images are taken
//! as they are.

use super::config::{GallerySelectors, compile_selector};
use super::url_rules::{highest_resolution, is_product_image, normalize_url, parse_srcset};
use super::{ContextualParser, DetailParseContext, ParsingError, ParsingResult};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

/// Marker of lazy-loading placeholder images
const PLACEHOLDER_MARKER: &str = "/blank_";

#[derive(Debug, Deserialize)]
struct ProductJson {
    #[serde(default)]
    media: Vec<ProductMedia>,
}

#[derive(Debug, Deserialize)]
struct ProductMedia {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    src: Option<String>,
}

/// Resolves the ordered, duplicate-free list of product image URLs
pub struct ImageResolver {
    image_slide: Selector,
    slide_image: Selector,
    product_json: Selector,
}

impl ImageResolver {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&GallerySelectors::default())
    }

    pub fn with_config(selectors: &GallerySelectors) -> ParsingResult<Self> {
        Ok(Self {
            image_slide: compile_selector(&selectors.image_slide)?,
            slide_image: compile_selector(&selectors.slide_image)?,
            product_json: compile_selector(&selectors.product_json)?,
        })
    }

    /// Product image URLs in resolution-priority order
    pub fn resolve(&self, html: &Html, base_url: &str) -> Vec<String> {
        let mut urls = Vec::new();

        for slide in html.select(&self.image_slide) {
            let images: Vec<ElementRef> = slide.select(&self.slide_image).collect();

            if let Some(url) = last_image_source(&images, base_url) {
                if push_unique(&mut urls, url) {
                    continue;
                }
            }

            for image in &images {
                if let Some(url) = widest_candidate(image, base_url) {
                    if push_unique(&mut urls, url) {
                        break;
                    }
                }
            }
        }
        debug!("Gallery slides yielded {} product images", urls.len());

        if urls.is_empty() {
            for script in html.select(&self.product_json) {
                let id = script.value().attr("id");
                let body: String = script.text().collect();
                match json_media_images(&body, id, base_url) {
                    Ok(found) => {
                        for url in found {
                            push_unique(&mut urls, url);
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            debug!("Product JSON fallback yielded {} images", urls.len());
        }

        urls
    }
}

impl ContextualParser for ImageResolver {
    type Output = Vec<String>;
    type Context = DetailParseContext;

    fn parse_with_context(
        &self,
        html: &Html,
        context: &Self::Context,
    ) -> ParsingResult<Self::Output> {
        Ok(self.resolve(html, &context.base_url))
    }
}

fn push_unique(urls: &mut Vec<String>, url: String) -> bool {
    if urls.contains(&url) {
        return false;
    }
    urls.push(url);
    true
}

/// Direct source of the slide's last image, when it is a product photo
fn last_image_source(images: &[ElementRef], base_url: &str) -> Option<String> {
    let src = images.last()?.value().attr("src")?.trim();
    if src.is_empty() || src.contains(PLACEHOLDER_MARKER) {
        return None;
    }
    normalize_url(src, base_url).filter(|url| is_product_image(url))
}

/// Widest entry of the image's candidate set, when it is a product photo
fn widest_candidate(image: &ElementRef, base_url: &str) -> Option<String> {
    let element = image.value();
    let srcset = element
        .attr("data-srcset")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| element.attr("srcset"))?;
    let candidates = parse_srcset(srcset);
    let best = highest_resolution(&candidates)?;
    normalize_url(&best.url, base_url).filter(|url| is_product_image(url))
}

/// Image sources listed in an embedded product JSON payload
fn json_media_images(body: &str, script_id: Option<&str>, base_url: &str) -> ParsingResult<Vec<String>> {
    let product: ProductJson =
        serde_json::from_str(body).map_err(|e| ParsingError::product_json(e, script_id))?;
    Ok(product
        .media
        .into_iter()
        .filter(|m| m.media_type.as_deref() == Some("image"))
        .filter_map(|m| m.src)
        .filter_map(|src| normalize_url(&src, base_url))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://blackscreenrecords.com";

    fn resolve(body: &str) -> Vec<String> {
        let html = Html::parse_document(&format!("<html><body>{body}</body></html>"));
        ImageResolver::new().unwrap().resolve(&html, BASE)
    }

    fn slide(inner: &str) -> String {
        format!(r#"<div data-product-slide data-type="image">{inner}</div>"#)
    }

    #[test]
    fn test_last_image_source_wins() {
        let urls = resolve(&slide(
            r#"<img src="//x.com/cdn/shop/files/a_180x.jpg"><img src="//x.com/cdn/shop/files/a.jpg">"#,
        ));
        assert_eq!(urls, vec!["https://x.com/cdn/shop/files/a.jpg"]);
    }

    #[test]
    fn test_placeholder_falls_back_to_widest_candidate() {
        let urls = resolve(&slide(
            r#"<img data-srcset="//x.com/cdn/shop/products/b_540x.jpg 540w, //x.com/cdn/shop/products/b_1080x.jpg 1080w" src="//x.com/cdn/shop/files/blank_1x1.gif">"#,
        ));
        assert_eq!(urls, vec!["https://x.com/cdn/shop/products/b_1080x.jpg"]);
    }

    #[test]
    fn test_video_slides_and_decoration_are_ignored() {
        let body = [
            r#"<div data-product-slide data-type="video"><img src="//x.com/cdn/shop/files/v.jpg"></div>"#.to_string(),
            slide(r#"<img src="//x.com/cdn/shop/files/bsr-logo.png">"#),
            slide(r#"<img src="//x.com/assets/cover.jpg">"#),
        ]
        .concat();
        assert!(resolve(&body).is_empty());
    }

    #[test]
    fn test_duplicate_slides_are_deduplicated() {
        let body = [
            slide(r#"<img src="//x.com/cdn/shop/files/a.jpg">"#),
            slide(r#"<img src="http://x.com/cdn/shop/files/a.jpg">"#),
            slide(r#"<img src="//x.com/cdn/shop/files/c.jpg">"#),
        ]
        .concat();
        assert_eq!(
            resolve(&body),
            vec![
                "https://x.com/cdn/shop/files/a.jpg",
                "https://x.com/cdn/shop/files/c.jpg"
            ]
        );
    }

    #[test]
    fn test_product_json_fallback_skips_classifier() {
        let body = r#"
            <script type="application/json" id="ProductJson-123">
              {"media": [
                {"media_type": "image", "src": "//x.com/assets/banner.jpg"},
                {"media_type": "video", "src": "//x.com/assets/clip.mp4"},
                {"media_type": "image", "src": "//x.com/assets/banner.jpg"},
                {"media_type": "image"}
              ]}
            </script>"#;
        assert_eq!(resolve(body), vec!["https://x.com/assets/banner.jpg"]);
    }

    #[test]
    fn test_null_media_type_only_drops_that_entry() {
        let body = r#"
            <script type="application/json" id="ProductJson-7">
              {"media": [
                {"media_type": null, "src": "//x.com/assets/a.jpg"},
                {"media_type": "image", "src": "//x.com/assets/b.jpg"},
                {"src": "//x.com/assets/c.jpg"},
                {"media_type": "image", "src": null}
              ]}
            </script>"#;
        assert_eq!(resolve(body), vec!["https://x.com/assets/b.jpg"]);
    }

    #[test]
    fn test_product_json_ignored_when_gallery_has_images() {
        let body = format!(
            r#"{}<script type="application/json" id="ProductJson-1">{{"media":[{{"media_type":"image","src":"//x.com/j.jpg"}}]}}</script>"#,
            slide(r#"<img src="//x.com/cdn/shop/files/a.jpg">"#)
        );
        assert_eq!(resolve(&body), vec!["https://x.com/cdn/shop/files/a.jpg"]);
    }

    #[test]
    fn test_malformed_product_json_is_reported() {
        let err = json_media_images("{oops", Some("ProductJson-1"), BASE).unwrap_err();
        assert!(matches!(err, ParsingError::ProductJson { .. }));
        assert!(resolve(r#"<script type="application/json" id="ProductJson-1">{oops</script>"#).is_empty());
    }
}
