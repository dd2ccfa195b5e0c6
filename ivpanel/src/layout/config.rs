//! Column layout configuration.
//!
//! The vendor sheet places target columns (realized vol, next-period implied
//! vol and its change) at fixed offsets to the right of each surface column.
//! These offsets are data about the vendor layout, so they live here as an
//! explicit, serializable table rather than as literals in the reshaper.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::DurationTier;

use super::resolver::{LayoutError, LayoutResult};

/// Level-2 labels of the leading columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadingLabels {
    pub date: String,
    pub spot_now: String,
    /// Spot one period back, used by daily sheets.
    pub spot_lag_daily: String,
    /// Spot five periods back, used by weekly sheets.
    pub spot_lag_weekly: String,
}

impl Default for LeadingLabels {
    fn default() -> Self {
        Self {
            date: "Dates".to_string(),
            spot_now: "Spot t".to_string(),
            spot_lag_daily: "Spot t-1".to_string(),
            spot_lag_weekly: "Spot t-5".to_string(),
        }
    }
}

/// Dual-target offsets for one duration tier, relative to the surface column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierOffsets {
    pub duration: DurationTier,
    pub implied_vol_next: usize,
    pub change_in_implied_vol: usize,
}

impl TierOffsets {
    pub fn new(duration: DurationTier, implied_vol_next: usize, change_in_implied_vol: usize) -> Self {
        Self {
            duration,
            implied_vol_next,
            change_in_implied_vol,
        }
    }
}

/// Complete description of the vendor sheet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub leading: LeadingLabels,

    /// First surface column.
    pub surface_start: usize,

    /// Number of contiguous surface columns.
    pub surface_len: usize,

    /// Single-target mode: realized vol sits this many columns to the right.
    pub realized_vol_offset: usize,

    /// Dual-target mode: per-tier offsets, in tier order.
    pub tier_offsets: Vec<TierOffsets>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        // Surface block: columns 3..47. The dual-target blocks carry one
        // separator column per tier, hence the +1 step between tiers.
        Self {
            leading: LeadingLabels::default(),
            surface_start: 3,
            surface_len: 44,
            realized_vol_offset: 51,
            tier_offsets: vec![
                TierOffsets::new(DurationTier::SixMonths, 45, 94),
                TierOffsets::new(DurationTier::OneYear, 46, 95),
                TierOffsets::new(DurationTier::EighteenMonths, 47, 96),
                TierOffsets::new(DurationTier::TwoYears, 48, 97),
                TierOffsets::new(DurationTier::ThreeYears, 49, 98),
            ],
        }
    }
}

impl LayoutConfig {
    /// Parse a layout from JSON. Missing fields take their default.
    pub fn from_json_str(json: &str) -> LayoutResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> LayoutResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// End (exclusive) of the surface block, `None` if it overflows.
    pub fn surface_end(&self) -> Option<usize> {
        self.surface_start.checked_add(self.surface_len)
    }

    /// Offsets configured for a tier, if any.
    pub fn offsets_for(&self, duration: DurationTier) -> Option<&TierOffsets> {
        self.tier_offsets.iter().find(|o| o.duration == duration)
    }

    /// Check internal consistency of the layout.
    ///
    /// Target offsets must point right of the surface column, each tier may
    /// appear once, and dual-target offsets must strictly increase with tier
    /// so that longer tiers map further right.
    pub fn validate(&self) -> LayoutResult<()> {
        if self.surface_len == 0 {
            return Err(LayoutError::Configuration(
                "surface block must contain at least one column".to_string(),
            ));
        }
        if self.realized_vol_offset == 0 {
            return Err(LayoutError::Configuration(
                "realized vol offset must be positive".to_string(),
            ));
        }

        // Every target column index must be representable.
        let surface_end = self.surface_end().ok_or_else(|| {
            LayoutError::Configuration("surface block end overflows".to_string())
        })?;
        let max_offset = self
            .tier_offsets
            .iter()
            .flat_map(|o| [o.implied_vol_next, o.change_in_implied_vol])
            .fold(self.realized_vol_offset, usize::max);
        if surface_end.checked_add(max_offset).is_none() {
            return Err(LayoutError::Configuration(format!(
                "target offset {} overflows the column index",
                max_offset
            )));
        }

        let mut seen = HashSet::new();
        for offsets in &self.tier_offsets {
            if !seen.insert(offsets.duration) {
                return Err(LayoutError::Configuration(format!(
                    "duplicate offsets for duration {}",
                    offsets.duration
                )));
            }
            if offsets.implied_vol_next == 0 || offsets.change_in_implied_vol == 0 {
                return Err(LayoutError::Configuration(format!(
                    "offsets for duration {} must be positive",
                    offsets.duration
                )));
            }
            if offsets.implied_vol_next == offsets.change_in_implied_vol {
                return Err(LayoutError::Configuration(format!(
                    "duration {} maps both targets to the same column",
                    offsets.duration
                )));
            }
        }

        let mut ordered: Vec<&TierOffsets> = self.tier_offsets.iter().collect();
        ordered.sort_by_key(|o| o.duration);
        for pair in ordered.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            if higher.implied_vol_next <= lower.implied_vol_next
                || higher.change_in_implied_vol <= lower.change_in_implied_vol
            {
                return Err(LayoutError::Configuration(format!(
                    "offsets must increase with tier: {} is not right of {}",
                    higher.duration, lower.duration
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.surface_end(), Some(47));
        assert_eq!(config.tier_offsets.len(), DurationTier::ALL.len());
    }

    #[test]
    fn test_default_offsets_increase_with_tier() {
        let config = LayoutConfig::default();
        let next: Vec<usize> = DurationTier::ALL
            .iter()
            .map(|d| config.offsets_for(*d).unwrap().implied_vol_next)
            .collect();
        assert!(next.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rejects_non_monotonic_offsets() {
        let mut config = LayoutConfig::default();
        config.tier_offsets[1].implied_vol_next = 40;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
    }

    #[test]
    fn test_rejects_duplicate_tier() {
        let mut config = LayoutConfig::default();
        config.tier_offsets.push(TierOffsets::new(DurationTier::SixMonths, 60, 120));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_overflowing_layout() {
        let config = LayoutConfig {
            surface_len: usize::MAX,
            ..LayoutConfig::default()
        };
        assert_eq!(config.surface_end(), None);
        assert!(matches!(config.validate(), Err(LayoutError::Configuration(_))));

        let config = LayoutConfig {
            realized_vol_offset: usize::MAX,
            ..LayoutConfig::default()
        };
        assert!(matches!(config.validate(), Err(LayoutError::Configuration(_))));

        let mut config = LayoutConfig::default();
        config.tier_offsets[4].change_in_implied_vol = usize::MAX - 10;
        assert!(matches!(config.validate(), Err(LayoutError::Configuration(_))));
    }

    #[test]
    fn test_json_huge_offset_is_an_error() {
        let json = format!(r#"{{ "realized_vol_offset": {} }}"#, usize::MAX);
        let err = LayoutConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
    }

    #[test]
    fn test_json_partial_override() {
        let json = r#"{
            "realized_vol_offset": 50,
            "tier_offsets": [
                { "duration": "6M", "implied_vol_next": 45, "change_in_implied_vol": 90 },
                { "duration": "1Y", "implied_vol_next": 47, "change_in_implied_vol": 92 }
            ]
        }"#;
        let config = LayoutConfig::from_json_str(json).unwrap();
        assert_eq!(config.realized_vol_offset, 50);
        assert_eq!(config.surface_start, 3);
        assert_eq!(config.leading.spot_lag_weekly, "Spot t-5");
        assert!(config.offsets_for(DurationTier::ThreeYears).is_none());
    }

    #[test]
    fn test_json_round_trip_of_default() {
        let config = LayoutConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(LayoutConfig::from_json_str(&json).unwrap(), config);
    }
}
