use crate::{
    config::{ImageSelector, ImageSlot, SlotPlacement},
    engine::ExtractedImage,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotStatus {
    Placed { path: PathBuf },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotResolution {
    pub slot: ImageSlot,
    pub image: Option<ExtractedImage>,
    pub status: SlotStatus,
}

impl SlotResolution {
    pub fn placement(&self) -> SlotPlacement {
        self.slot.placement
    }
}

pub fn select_images(images: &[ExtractedImage], slots: &[ImageSlot]) -> Vec<SlotResolution> {
    slots
        .iter()
        .map(|slot| {
            let picked = pick(images, &slot.select);
            let status = match &picked {
                Some(img) => SlotStatus::Placed {
                    path: img.path.clone(),
                },
                None => SlotStatus::Skipped {
                    reason: miss_reason(images, &slot.select),
                },
            };
            SlotResolution {
                slot: slot.clone(),
                image: picked,
                status,
            }
        })
        .collect()
}

fn pick(images: &[ExtractedImage], selector: &ImageSelector) -> Option<ExtractedImage> {
    match *selector {
        ImageSelector::Index { index } => images.get(index).cloned(),
        ImageSelector::Page { page, nth } => {
            images.iter().filter(|i| i.page == page).nth(nth).cloned()
        }
        ImageSelector::Largest { rank } => {
            let mut ranked: Vec<&ExtractedImage> = images.iter().collect();
            // Stable sort keeps extraction order among equal areas.
            ranked.sort_by(|a, b| b.area().cmp(&a.area()));
            ranked.get(rank).map(|i| (*i).clone())
        }
    }
}

fn miss_reason(images: &[ExtractedImage], selector: &ImageSelector) -> String {
    match *selector {
        ImageSelector::Index { index } => {
            format!("index {index} out of range ({} images)", images.len())
        }
        ImageSelector::Page { page, nth } => format!("no image #{nth} on page {page}"),
        ImageSelector::Largest { rank } => {
            format!("rank {rank} out of range ({} images)", images.len())
        }
    }
}
