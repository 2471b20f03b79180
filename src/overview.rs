use crate::config::Markers;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverviewStatus {
    Extracted,
    MissingStart,
    MissingEnd,
    MissingBoth,
    /// Both markers present but the end marker comes first; content is empty.
    EndBeforeStart,
}

impl OverviewStatus {
    pub fn is_degraded(self) -> bool {
        !matches!(self, OverviewStatus::Extracted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedOverview {
    pub content: String,
    pub status: OverviewStatus,
}

/// Slices the text from the first start marker up to (not including) the first end marker.
///
/// The two markers are searched independently. A missing marker yields the
/// configured placeholder; an end marker that precedes the start marker
/// yields an empty slice.
pub fn refine_overview(text: &str, markers: &Markers) -> RefinedOverview {
    let start = text.find(&markers.start);
    let end = text.find(&markers.end);

    let status = match (start, end) {
        (Some(s), Some(e)) if s <= e => {
            return RefinedOverview {
                content: text[s..e].trim().to_string(),
                status: OverviewStatus::Extracted,
            };
        }
        (Some(_), Some(_)) => {
            return RefinedOverview {
                content: String::new(),
                status: OverviewStatus::EndBeforeStart,
            };
        }
        (None, Some(_)) => OverviewStatus::MissingStart,
        (Some(_), None) => OverviewStatus::MissingEnd,
        (None, None) => OverviewStatus::MissingBoth,
    };

    RefinedOverview {
        content: markers.placeholder.clone(),
        status,
    }
}

pub fn refine_overview_text(text: &str, markers: &Markers) -> String {
    refine_overview(text, markers).content
}
