//! Heat tiers for per-page note density

use serde::{Deserialize, Serialize};

/// Density tier of a page, ordered from coldest to hottest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Empty,
    Low,
    Medium,
    High,
}

impl Tier {
    /// Overlay colour drawn on the page thumbnail
    pub fn overlay(self) -> HeatColor {
        match self {
            Tier::Empty => HeatColor::new(59, 130, 246, 0.0),
            Tier::Low => HeatColor::new(59, 130, 246, 0.3),
            Tier::Medium => HeatColor::new(234, 179, 8, 0.5),
            Tier::High => HeatColor::new(239, 68, 68, 0.7),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tier::Empty => "empty",
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
        };
        f.write_str(name)
    }
}

/// RGBA overlay colour; displays as a CSS `rgba()` value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl HeatColor {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl std::fmt::Display for HeatColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Upper bounds (inclusive) of the Low and Medium tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapThresholds {
    pub low_max: usize,
    pub medium_max: usize,
}

impl Default for HeatmapThresholds {
    fn default() -> Self {
        Self {
            low_max: 3,
            medium_max: 10,
        }
    }
}

impl HeatmapThresholds {
    pub fn classify(&self, count: usize) -> Tier {
        if count == 0 {
            Tier::Empty
        } else if count <= self.low_max {
            Tier::Low
        } else if count <= self.medium_max {
            Tier::Medium
        } else {
            Tier::High
        }
    }
}

/// Classify a note count with the default thresholds
pub fn classify(count: usize) -> Tier {
    HeatmapThresholds::default().classify(count)
}
