use crate::config::{Content, SpecEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewSection {
    pub title: String,
    pub content: String,
}

/// Everything the renderer needs besides images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrochureRecord {
    pub overview: OverviewSection,
    pub key_highlights: Vec<String>,
    /// Label/value pairs in declaration order.
    pub basic_module_info: Vec<SpecEntry>,
    pub footer: String,
}

pub fn structure_data(content: &Content, overview: String) -> BrochureRecord {
    BrochureRecord {
        overview: OverviewSection {
            title: content.overview_title.clone(),
            content: overview,
        },
        key_highlights: content.key_highlights.clone(),
        basic_module_info: content.specs.clone(),
        footer: content.footer.clone(),
    }
}
