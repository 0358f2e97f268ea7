//! Quality rating tiers

use serde::{Deserialize, Serialize};

/// Ordered quality tier derived from the registry's numeric rating
///
/// Ratings 3 through 5 are all reported as high quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Unrated,
    Licensed,
    GoodStanding,
    HighQuality,
}

impl QualityTier {
    pub fn from_rating(rating: &str) -> Self {
        match rating.trim() {
            "1" => QualityTier::Licensed,
            "2" => QualityTier::GoodStanding,
            "3" | "4" | "5" => QualityTier::HighQuality,
            _ => QualityTier::Unrated,
        }
    }
}
