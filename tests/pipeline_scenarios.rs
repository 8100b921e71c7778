//! End-to-end runs of the catalog pipeline against replayed pages
use bsr_catalog_lib::application::{CatalogPipeline, read_link_file};
use bsr_catalog_lib::domain::{EventSink, LinkSet, PipelineEvent};
use bsr_catalog_lib::infrastructure::config::AppConfig;
use bsr_catalog_lib::infrastructure::replay_session::ReplaySession;
use proptest::prelude::*;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::mpsc::unbounded_channel;

const CATALOG: &str = "https://blackscreenrecords.com/collections/all";
const PRODUCT: &str = "https://blackscreenrecords.com/collections/all/products/halloween-iii?variant=41";

fn config_in(dir: &Path) -> AppConfig {
    let mut config = AppConfig::without_delays();
    config.output.output_root = dir.join("parsed");
    config
}

fn grid_tile(href: &str, variant: &str, sold_out: bool) -> String {
    let badge = if sold_out {
        r#"<div class="product__badge"><div class="product__badge__svg" aria-label="Sold out"></div></div>"#
    } else {
        ""
    };
    format!(
        r#"<div class="product-grid-item">{badge}
             <a class="product-grid-item__title" data-grid-link href="{href}">Item</a>
             <form data-product-form><input type="hidden" name="id" value="{variant}"></form>
           </div>"#
    )
}

fn product_page(images: &[&str]) -> String {
    let slides: String = images
        .iter()
        .map(|src| format!(r#"<div data-product-slide data-type="image"><img src="{src}"></div>"#))
        .collect();
    format!(
        r#"<html><body>
             <div class="product__title-and-price">
               <h1 class="product__title">Halloween III</h1>
               <h3 class="product__author">by John Carpenter</h3>
             </div>
             {slides}
           </body></html>"#
    )
}

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(4, 4);
    let mut buf = Vec::new();
    img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

#[tokio::test]
async fn collect_skips_sold_out_and_appends_variants() {
    let dir = TempDir::new().unwrap();
    let links_file = dir.path().join("links.txt");
    let catalog = format!(
        "<html><body>{}{}{}</body></html>",
        grid_tile("/collections/all/products/suspiria", "11", false),
        grid_tile("/collections/all/products/phenomena", "22", true),
        grid_tile("/collections/all/products/tenebre?variant=33", "99", false),
    );
    let mut session = ReplaySession::new()
        .with_page(CATALOG, catalog)
        .with_redirect(format!("{CATALOG}?page=2"), CATALOG);
    let pipeline = CatalogPipeline::new(&config_in(dir.path())).unwrap();

    let links = pipeline
        .collect_links_to_file(&mut session, CATALOG, 50, &links_file)
        .await
        .unwrap();

    assert_eq!(
        links,
        vec![
            "https://blackscreenrecords.com/collections/all/products/suspiria?variant=11",
            "https://blackscreenrecords.com/collections/all/products/tenebre?variant=33",
        ]
    );
    assert_eq!(read_link_file(&links_file).await.unwrap(), links);
}

#[tokio::test]
async fn product_without_title_is_skipped_without_record() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let (tx, mut rx) = unbounded_channel();
    let pipeline = CatalogPipeline::with_events(&config, EventSink::new(tx)).unwrap();
    let mut session =
        ReplaySession::new().with_page(PRODUCT, "<html><body><p>Temporarily unavailable</p></body></html>");

    let summary = pipeline
        .parse_links(&mut session, &[PRODUCT.to_string()])
        .await;

    assert_eq!((summary.processed_ok, summary.total), (0, 1));
    assert!(!config.output.output_root.exists());
    let events: Vec<PipelineEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::ProductSkipped { url, .. } if url == PRODUCT)));
}

#[tokio::test]
async fn failed_image_leaves_sequence_gap() {
    let dir = TempDir::new().unwrap();
    let images = [
        "https://blackscreenrecords.com/cdn/shop/files/front.jpg",
        "https://blackscreenrecords.com/cdn/shop/files/back.jpg",
        "https://blackscreenrecords.com/cdn/shop/files/vinyl.jpg",
    ];
    let mut session = ReplaySession::new()
        .with_page(PRODUCT, product_page(&images))
        .with_binary(images[0], png_bytes())
        .with_failing_fetches(images[1], 3)
        .with_binary(images[2], png_bytes());
    let (tx, mut rx) = unbounded_channel();
    let pipeline =
        CatalogPipeline::with_events(&config_in(dir.path()), EventSink::new(tx)).unwrap();

    let summary = pipeline
        .parse_links(&mut session, &[PRODUCT.to_string()])
        .await;

    assert_eq!(summary.processed_ok, 1);
    assert_eq!(session.fetch_attempts(images[1]), 3);

    let folder = std::iter::from_fn(|| rx.try_recv().ok())
        .find_map(|e| match e {
            PipelineEvent::ProductSaved { folder, .. } => Some(folder),
            _ => None,
        })
        .expect("product folder reported");
    let info = std::fs::read_to_string(folder.join("info.txt")).unwrap();
    let downloaded: Vec<&str> = info
        .split("downloaded_images:\n")
        .nth(1)
        .unwrap()
        .lines()
        .map(str::trim)
        .collect();

    assert_eq!(downloaded.len(), 2);
    assert!(downloaded[0].ends_with("_01.jpeg"));
    assert!(downloaded[1].ends_with("_03.jpeg"));
    assert!(downloaded[0].starts_with("John-Carpenter-Halloween-III_"));
    for name in &downloaded {
        assert!(folder.join(name).exists());
    }
}

proptest! {
    #[test]
    fn link_set_never_exceeds_cap_or_repeats(
        cap in 0usize..20,
        urls in prop::collection::vec("[a-e]{1,2}", 0..60),
    ) {
        let mut set = LinkSet::with_cap(cap);
        for url in &urls {
            set.push(url.clone());
        }
        let collected = set.into_vec();
        prop_assert!(collected.len() <= cap);
        let mut unique = collected.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), collected.len());
    }
}
