//! Step category classification.
//!
//! A step's category decides which typed metadata form applies to it.
//! Classification is keyword matching on the step name; anything
//! unrecognized falls back to [`StepCategory::Generic`].

use serde::{Deserialize, Serialize};

/// Booking category of a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Flight,
    Hotel,
    Visa,
    Activity,
    #[default]
    Generic,
}

impl StepCategory {
    /// Display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            StepCategory::Flight => "Flight",
            StepCategory::Hotel => "Hotel",
            StepCategory::Visa => "Visa",
            StepCategory::Activity => "Activity",
            StepCategory::Generic => "Generic",
        }
    }
}

/// Classify a step by its name.
///
/// First matching category wins, checked in flight, hotel, visa,
/// activity order.
pub fn classify(name: &str) -> StepCategory {
    let name = name.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if matches_any(&["flight", "fly"]) {
        StepCategory::Flight
    } else if matches_any(&["hotel", "stay", "accommodation"]) {
        StepCategory::Hotel
    } else if matches_any(&["visa", "passport", "immigration"]) {
        StepCategory::Visa
    } else if matches_any(&["activity", "tour", "visit", "sightseeing"]) {
        StepCategory::Activity
    } else {
        StepCategory::Generic
    }
}
