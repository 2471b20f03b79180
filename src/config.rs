use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub markers: Markers,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub postprocess: Postprocess,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub input_pdf: String,
    pub out_dir: String,
    pub images_dir: String,
    pub brochure_filename: String,
    pub text_dump_path: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            input_pdf: "C42GM_1725347073674.pdf".into(),
            out_dir: ".".into(),
            images_dir: "extracted_images".into(),
            brochure_filename: "C42GM_Brochure.pdf".into(),
            text_dump_path: "extracted_text.txt".into(),
        }
    }
}

/// Literal phrases bounding the product overview inside the datasheet text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub start: String,
    pub end: String,
    pub placeholder: String,
}
impl Default for Markers {
    fn default() -> Self {
        Self {
            start: "C42GM is an LTE".into(),
            end: "Copyright © 2024 Cavli Inc.".into(),
            placeholder: "Product overview could not be extracted correctly.".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub product_name: String,
    pub tagline: String,
    pub overview_title: String,
    pub key_highlights: Vec<String>,
    pub specs: Vec<SpecEntry>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecEntry {
    pub label: String,
    pub value: String,
}

impl SpecEntry {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self {
            product_name: "C42GM".into(),
            tagline: "Advanced LTE Cat M1/NB1/NB2 Module".into(),
            overview_title: "C42GM Product Overview".into(),
            key_highlights: vec![
                "Integrated Hubble eSIM".into(),
                "Modem Intelligence Cloud".into(),
                "Global GNSS Support".into(),
                "Sigfox Certified NB-IoT Module".into(),
                "Classic CAN Interface".into(),
                "DRX & eDRX modes".into(),
            ],
            specs: vec![
                SpecEntry::new("Application Processor Specification", "1.5GHz, ROM: 16 MB/32 MB"),
                SpecEntry::new("Supported Brands", "LTE"),
                SpecEntry::new("Communication Protocols", "HTTP(S), MQTT(S), Sigfox, CAN"),
                SpecEntry::new("Temperature Range", "-30°C to +75°C"),
                SpecEntry::new("Interfaces", "3xUART, 1xANT, 1xGNSS_ANT, 1xSDIO."),
                SpecEntry::new("Packaging", "Dimensions 26.5 x 22.5 x 2.3 mm, LGA Package"),
                SpecEntry::new("Network Speed", "Up to 100 Mbps"),
                SpecEntry::new("Constellation Coverage", "GPS/ BeiDou & QZSS"),
                SpecEntry::new("Power Characteristics", "Voltage Range: 3.1V to 4.2V"),
            ],
            footer: "Copyright © 2024.V1.0 Cavli Inc., All Rights Reserved\n\
                     www.cavliwireless.com\n\
                     HQ address: Cavli Inc.,99 South Almaden Blvd., Suite 600, San Jose, California, 95113\n\
                     Email: solutions@cavliwireless.com"
                .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub product_label: String,
    pub features_heading: String,
    pub specs_heading: String,
    pub bullet: String,
    pub slots: Vec<ImageSlot>,
}
impl Default for Layout {
    fn default() -> Self {
        Self {
            page_width: 612.0,
            page_height: 792.0,
            margin: 72.0,
            product_label: "Product Name:".into(),
            features_heading: "Key Features".into(),
            specs_heading: "Technical Specifications".into(),
            bullet: "•".into(),
            slots: default_slots(),
        }
    }
}

/// Where a selected image lands in the brochure story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPlacement {
    /// Beside the product name label, after the overview.
    Product,
    /// Directly under the overview.
    Overview,
    /// After the technical specifications.
    Specs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSlot {
    pub placement: SlotPlacement,
    pub width: f32,
    pub height: f32,
    pub select: ImageSelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum ImageSelector {
    /// Position in the extraction list.
    Index { index: usize },
    /// The n-th (0-based) image on a 1-based page.
    Page {
        page: u32,
        #[serde(default)]
        nth: usize,
    },
    /// Rank by pixel area, largest first.
    Largest {
        #[serde(default)]
        rank: usize,
    },
}

fn default_slots() -> Vec<ImageSlot> {
    vec![
        ImageSlot {
            placement: SlotPlacement::Product,
            width: 100.0,
            height: 24.0,
            select: ImageSelector::Index { index: 0 },
        },
        ImageSlot {
            placement: SlotPlacement::Overview,
            width: 200.0,
            height: 100.0,
            select: ImageSelector::Index { index: 2 },
        },
        ImageSlot {
            placement: SlotPlacement::Specs,
            width: 150.0,
            height: 100.0,
            select: ImageSelector::Index { index: 3 },
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Postprocess {
    pub normalize_newlines: bool,
    pub normalize_unicode: bool,
    pub trim_trailing_whitespace: bool,
    pub strip_control_chars: bool,
}
impl Default for Postprocess {
    fn default() -> Self {
        Self {
            normalize_newlines: true,
            normalize_unicode: false,
            trim_trailing_whitespace: false,
            strip_control_chars: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Entities {
    pub enabled: bool,
    pub product_patterns: Vec<String>,
    pub organization_suffixes: Vec<String>,
    pub locations: Vec<String>,
    pub sentence_keywords: Vec<String>,
}
impl Default for Entities {
    fn default() -> Self {
        Self {
            enabled: false,
            product_patterns: vec![r"\b[A-Z]{1,4}[0-9]{2,}[A-Z0-9]*\b".into()],
            organization_suffixes: vec![
                "Inc.".into(),
                "Inc".into(),
                "Ltd.".into(),
                "Ltd".into(),
                "LLC".into(),
                "Corp.".into(),
                "Corporation".into(),
                "GmbH".into(),
            ],
            locations: vec![
                "San Jose".into(),
                "California".into(),
                "USA".into(),
                "United States".into(),
                "India".into(),
                "Europe".into(),
                "China".into(),
                "Japan".into(),
            ],
            sentence_keywords: vec!["feature".into(), "spec".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_report_json: bool,
    pub write_text: bool,
    pub write_index_json: bool,
    pub report_filename: String,
    pub text_filename: String,
    pub entities_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report_json: true,
            write_text: false,
            write_index_json: false,
            report_filename: "report.json".into(),
            text_filename: "extracted_text.txt".into(),
            entities_filename: "entities.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: false,
        }
    }
}
