use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOut {
    pub path: String,
    pub file_bytes: u64,
    pub page_count: u32,
    pub images_per_page: Vec<u32>,
    pub text_chars: usize,
}

impl ProbeOut {
    pub fn image_count(&self) -> u32 {
        self.images_per_page.iter().sum()
    }
}

/// One embedded raster image written out by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedImage {
    pub path: PathBuf,
    /// 1-based page number.
    pub page: u32,
    /// 1-based position among the page's images.
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub filter: Option<String>,
}

impl ExtractedImage {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

pub fn image_paths(images: &[ExtractedImage]) -> Vec<PathBuf> {
    images.iter().map(|i| i.path.clone()).collect()
}
