mod common;

use brochure_forge::{
    config::{Config, SlotPlacement},
    engine::{Engine, ExtractedImage, native::NativeEngine},
    render::render_brochure,
    selection::select_images,
    structure::structure_data,
};
use common::scratch_dir;
use lopdf::Document;
use std::path::Path;

fn png(dir: &Path, page: u32, index: u32, w: u32, h: u32) -> ExtractedImage {
    let path = dir.join(format!("image_{page}_{index}.png"));
    image::RgbImage::from_pixel(w, h, image::Rgb([10, 120, 200]))
        .save(&path)
        .expect("write png");
    ExtractedImage {
        path,
        page,
        index,
        width: w,
        height: h,
        filter: None,
    }
}

fn brochure_text(path: &Path) -> String {
    let doc = Document::load(path).expect("load brochure");
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).expect("brochure text")
}

#[test]
fn renders_sections_without_images() {
    let dir = scratch_dir();
    let cfg = Config::default();
    let record = structure_data(&cfg.content, "An LTE module for IoT.".into());
    let slots = select_images(&[], &cfg.layout.slots);
    let out = dir.path().join("brochure.pdf");

    let summary =
        render_brochure(&record, &cfg.content, &cfg.layout, &slots, &out).expect("render");
    assert!(summary.placed_images.is_empty());
    assert!(summary.page_count >= 1);

    let text = brochure_text(&out);
    for needle in [
        "C42GM Product Overview",
        "An LTE module for IoT.",
        "Key Features",
        "Integrated Hubble eSIM",
        "Technical Specifications",
        "Network Speed:",
        "Up to 100 Mbps",
        "www.cavliwireless.com",
    ] {
        assert!(text.contains(needle), "missing {needle:?} in brochure text");
    }
    assert!(!text.contains("Product Name:"));

    let probe = NativeEngine::new().probe_pdf(&out).expect("probe brochure");
    assert_eq!(probe.page_count as usize, summary.page_count);
    assert_eq!(probe.image_count(), 0);
}

#[test]
fn single_image_only_fills_product_slot() {
    let dir = scratch_dir();
    let cfg = Config::default();
    let images = vec![png(dir.path(), 1, 1, 40, 10)];
    let record = structure_data(&cfg.content, "Overview.".into());
    let slots = select_images(&images, &cfg.layout.slots);
    let out = dir.path().join("brochure.pdf");

    let summary =
        render_brochure(&record, &cfg.content, &cfg.layout, &slots, &out).expect("render");
    assert_eq!(summary.placed_images, vec![SlotPlacement::Product]);
    assert!(brochure_text(&out).contains("Product Name:"));

    let probe = NativeEngine::new().probe_pdf(&out).expect("probe brochure");
    assert_eq!(probe.image_count(), 1);
}

#[test]
fn four_images_place_three() {
    let dir = scratch_dir();
    let cfg = Config::default();
    let images = vec![
        png(dir.path(), 1, 1, 40, 10),
        png(dir.path(), 1, 2, 20, 20),
        png(dir.path(), 2, 1, 60, 30),
        png(dir.path(), 3, 1, 30, 20),
    ];
    let record = structure_data(&cfg.content, "Overview.".into());
    let slots = select_images(&images, &cfg.layout.slots);
    let out = dir.path().join("nested").join("brochure.pdf");

    let summary =
        render_brochure(&record, &cfg.content, &cfg.layout, &slots, &out).expect("render");
    assert_eq!(
        summary.placed_images,
        vec![
            SlotPlacement::Product,
            SlotPlacement::Overview,
            SlotPlacement::Specs
        ]
    );

    let extracted = NativeEngine::new()
        .extract_images(&out, &dir.path().join("roundtrip"))
        .expect("extract from brochure");
    // Pixel sizes of images 0, 2 and 3, in story order.
    let dims: Vec<(u32, u32)> = extracted.iter().map(|i| (i.width, i.height)).collect();
    assert_eq!(dims, vec![(40, 10), (60, 30), (30, 20)]);
    for img in &extracted {
        let decoded = image::open(&img.path)
            .unwrap_or_else(|e| panic!("{} does not decode: {e}", img.path.display()))
            .to_rgb8();
        assert_eq!((decoded.width(), decoded.height()), (img.width, img.height));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 120, 200]);
    }
}

#[test]
fn rerender_replaces_existing_output() {
    let dir = scratch_dir();
    let cfg = Config::default();
    let out = dir.path().join("brochure.pdf");
    std::fs::write(&out, b"stale").expect("write stale");

    let record = structure_data(&cfg.content, "Fresh overview.".into());
    let slots = select_images(&[], &cfg.layout.slots);
    render_brochure(&record, &cfg.content, &cfg.layout, &slots, &out).expect("render");

    assert!(brochure_text(&out).contains("Fresh overview."));
}

#[test]
fn unreadable_selected_image_is_an_error() {
    let dir = scratch_dir();
    let cfg = Config::default();
    let images = vec![ExtractedImage {
        path: dir.path().join("image_1_1.png"),
        page: 1,
        index: 1,
        width: 4,
        height: 4,
        filter: None,
    }];
    let record = structure_data(&cfg.content, "Overview.".into());
    let slots = select_images(&images, &cfg.layout.slots);

    let err = render_brochure(&record, &cfg.content, &cfg.layout, &slots, &dir.path().join("b.pdf"))
        .expect_err("missing image must fail");
    assert!(format!("{err:#}").contains("image_1_1.png"));
}
