use crate::{
    config::SlotPlacement,
    overview::OverviewStatus,
    selection::{SlotResolution, SlotStatus},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrochureReport {
    pub input: String,
    pub input_sha256: String,
    pub text_chars: usize,
    pub image_count: usize,
    pub page_count: usize,
    pub overview_status: OverviewStatus,
    pub image_slots: Vec<SlotReport>,
    pub degraded: Vec<DegradedSection>,
    pub started: String,
    pub finished: String,
}

impl BrochureReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotReport {
    pub placement: SlotPlacement,
    #[serde(flatten)]
    pub status: SlotStatus,
}

/// A brochure section that was rendered from fallback content or left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum DegradedSection {
    Overview { status: OverviewStatus },
    Image { placement: SlotPlacement, reason: String },
}

pub fn degraded_sections(
    overview: OverviewStatus,
    slots: &[SlotResolution],
) -> Vec<DegradedSection> {
    let mut out = Vec::new();
    if overview.is_degraded() {
        out.push(DegradedSection::Overview { status: overview });
    }
    for res in slots {
        if let SlotStatus::Skipped { reason } = &res.status {
            out.push(DegradedSection::Image {
                placement: res.placement(),
                reason: reason.clone(),
            });
        }
    }
    out
}

pub fn slot_reports(slots: &[SlotResolution]) -> Vec<SlotReport> {
    slots
        .iter()
        .map(|r| SlotReport {
            placement: r.placement(),
            status: r.status.clone(),
        })
        .collect()
}
