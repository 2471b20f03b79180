use brochure_forge::config::{Config, Content, ImageSelector, SlotPlacement};

#[test]
fn parse_example_config() {
    let raw = include_str!("../brochure-forge.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.paths.images_dir.is_empty());
    assert_eq!(cfg.markers.start, "C42GM is an LTE");
    assert_eq!(cfg.markers.end, "Copyright © 2024 Cavli Inc.");
    assert_eq!(cfg.content.specs, Content::default().specs);
    assert_eq!(cfg.content.key_highlights.len(), 6);
    assert_eq!(cfg.layout.slots.len(), 3);
    assert_eq!(cfg.layout.slots[1].select, ImageSelector::Index { index: 2 });
}

#[test]
fn empty_config_uses_defaults() {
    let cfg: Config = toml::from_str("").expect("parse TOML");
    assert_eq!(cfg.content.specs.len(), 9);
    assert_eq!(cfg.paths.brochure_filename, "C42GM_Brochure.pdf");
    assert!(!cfg.entities.enabled);
}

#[test]
fn partial_sections_fill_in_defaults() {
    let raw = r#"
[content]
product_name = "X1000"

[[layout.slots]]
placement = "specs"
width = 120.0
height = 80.0
select = { by = "page", page = 2 }

[[layout.slots]]
placement = "product"
width = 90.0
height = 30.0
select = { by = "largest" }
"#;
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.content.product_name, "X1000");
    assert_eq!(cfg.content.key_highlights.len(), 6);
    assert_eq!(cfg.layout.features_heading, "Key Features");
    assert_eq!(cfg.layout.slots.len(), 2);
    assert_eq!(cfg.layout.slots[0].placement, SlotPlacement::Specs);
    assert_eq!(cfg.layout.slots[0].select, ImageSelector::Page { page: 2, nth: 0 });
    assert_eq!(cfg.layout.slots[1].select, ImageSelector::Largest { rank: 0 });
}

#[test]
fn partial_markers_keep_remaining_defaults() {
    let raw = r#"
[markers]
start = "X1000 is a"

[logging]
json = true
"#;
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.markers.start, "X1000 is a");
    assert_eq!(cfg.markers.end, "Copyright © 2024 Cavli Inc.");
    assert_eq!(
        cfg.markers.placeholder,
        "Product overview could not be extracted correctly."
    );
    assert!(cfg.logging.json);
    assert_eq!(cfg.logging.level, "info");
}
