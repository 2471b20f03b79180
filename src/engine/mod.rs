pub mod decode;
pub mod native;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{ExtractedImage, ProbeOut, image_paths};

pub trait Engine {
    fn probe_pdf(&self, input: &Path) -> Result<ProbeOut>;
    fn extract_text(&self, input: &Path) -> Result<String>;
    fn extract_images(&self, input: &Path, out_dir: &Path) -> Result<Vec<ExtractedImage>>;
}
