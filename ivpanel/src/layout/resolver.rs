//! Column layout resolution.
//!
//! Translates raw column positions into semantic roles:
//! - leading columns: date, current spot, lagged spot (lag depends on periodicity)
//! - surface columns: decoded `(duration, strike)` header
//! - target columns: realized vol (single-target) or next implied vol and its
//!   change (dual-target, offsets per duration tier)

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{ColumnHeader, DurationTier, Periodicity, Sheet};

use super::config::LayoutConfig;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Column {column} is out of range: sheet has {num_cols} columns")]
    OutOfRange { column: usize, num_cols: usize },

    #[error("Missing leading column '{0}'")]
    MissingColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LayoutResult<T> = Result<T, LayoutError>;

/// Which target values accompany each surface cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReshapeMode {
    /// One realized-vol column per surface column, at a fixed offset.
    #[default]
    Single,
    /// Next-period implied vol and its change, at tier-dependent offsets.
    Dual,
}

impl ReshapeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Dual => "dual",
        }
    }
}

impl fmt::Display for ReshapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReshapeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "dual" => Ok(Self::Dual),
            other => Err(format!("unknown reshape mode '{}'", other)),
        }
    }
}

/// Positions of the leading columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingColumns {
    pub date: usize,
    pub spot_now: usize,
    pub spot_lag: usize,
}

/// Positions of the target value(s) for one surface column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetColumns {
    Realized {
        real_implied_vol: usize,
    },
    NextPeriod {
        implied_vol_next: usize,
        change_in_implied_vol: usize,
    },
}

impl TargetColumns {
    /// Rightmost column this target reads.
    pub fn max_column(&self) -> usize {
        match self {
            Self::Realized { real_implied_vol } => *real_implied_vol,
            Self::NextPeriod {
                implied_vol_next,
                change_in_implied_vol,
            } => (*implied_vol_next).max(*change_in_implied_vol),
        }
    }
}

/// A fully resolved surface column.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceColumn {
    pub column: usize,
    pub duration: DurationTier,
    pub strike: Decimal,
    pub targets: TargetColumns,
}

/// Resolves column roles for one layout and reshaping mode.
#[derive(Debug, Clone)]
pub struct ColumnLayoutResolver {
    config: LayoutConfig,
    mode: ReshapeMode,
}

impl ColumnLayoutResolver {
    /// Create a resolver. The layout is validated up front.
    pub fn new(config: LayoutConfig, mode: ReshapeMode) -> LayoutResult<Self> {
        config.validate()?;
        Ok(Self { config, mode })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn mode(&self) -> ReshapeMode {
        self.mode
    }

    /// Label of the lagged spot column for a periodicity.
    pub fn lag_label(&self, periodicity: Periodicity) -> &str {
        match periodicity {
            Periodicity::Daily => &self.config.leading.spot_lag_daily,
            Periodicity::Weekly => &self.config.leading.spot_lag_weekly,
        }
    }

    /// Locate date, spot and lagged-spot columns by their level-2 labels
    /// among the columns preceding the surface block.
    pub fn leading_columns<S: Sheet + ?Sized>(
        &self,
        sheet: &S,
        periodicity: Periodicity,
    ) -> LayoutResult<LeadingColumns> {
        let limit = self.config.surface_start.min(sheet.num_cols());
        let find = |label: &str| -> LayoutResult<usize> {
            (0..limit)
                .find(|&col| {
                    sheet
                        .header(col)
                        .map_or(false, |h| h.level2.trim().eq_ignore_ascii_case(label.trim()))
                })
                .ok_or_else(|| LayoutError::MissingColumn(label.to_string()))
        };

        Ok(LeadingColumns {
            date: find(&self.config.leading.date)?,
            spot_now: find(&self.config.leading.spot_now)?,
            spot_lag: find(self.lag_label(periodicity))?,
        })
    }

    /// Column range of the surface block, checked against the sheet width.
    pub fn surface_range<S: Sheet + ?Sized>(&self, sheet: &S) -> LayoutResult<Range<usize>> {
        let end = self.config.surface_end().ok_or_else(|| {
            LayoutError::Configuration("surface block end overflows".to_string())
        })?;
        if end > sheet.num_cols() {
            return Err(LayoutError::OutOfRange {
                column: end - 1,
                num_cols: sheet.num_cols(),
            });
        }
        Ok(self.config.surface_start..end)
    }

    /// Decode a surface header into `(duration, strike)`.
    pub fn decode_header(&self, column: usize, header: &ColumnHeader) -> LayoutResult<(DurationTier, Decimal)> {
        let duration = DurationTier::from_label(&header.level1).ok_or_else(|| {
            LayoutError::Configuration(format!(
                "unknown duration label '{}' in column {}",
                header.level1, column
            ))
        })?;

        let strike_label = header.level2.trim().trim_end_matches('%').trim();
        let strike = Decimal::from_str(strike_label)
            .map(|s| s.normalize())
            .map_err(|_| {
                LayoutError::Configuration(format!(
                    "strike label '{}' in column {} is not numeric",
                    header.level2, column
                ))
            })?;

        Ok((duration, strike))
    }

    /// Target column(s) for a surface column of the given duration.
    pub fn target_columns(&self, column: usize, duration: DurationTier) -> LayoutResult<TargetColumns> {
        let shift = |offset: usize| {
            column.checked_add(offset).ok_or_else(|| {
                LayoutError::Configuration(format!(
                    "offset {} from column {} overflows the column index",
                    offset, column
                ))
            })
        };

        match self.mode {
            ReshapeMode::Single => Ok(TargetColumns::Realized {
                real_implied_vol: shift(self.config.realized_vol_offset)?,
            }),
            ReshapeMode::Dual => {
                let offsets = self.config.offsets_for(duration).ok_or_else(|| {
                    LayoutError::Configuration(format!(
                        "no target offsets configured for duration {}",
                        duration
                    ))
                })?;
                Ok(TargetColumns::NextPeriod {
                    implied_vol_next: shift(offsets.implied_vol_next)?,
                    change_in_implied_vol: shift(offsets.change_in_implied_vol)?,
                })
            }
        }
    }

    /// Resolve every surface column of the sheet.
    ///
    /// Fails on the first column with an unknown duration or a target past
    /// the sheet's last column, so callers never see a partial layout.
    pub fn resolve_surface<S: Sheet>(&self, sheet: &S) -> LayoutResult<Vec<SurfaceColumn>> {
        let range = self.surface_range(sheet)?;
        let slice = sheet.column_range(range.clone()).ok_or(LayoutError::OutOfRange {
            column: range.end.saturating_sub(1),
            num_cols: sheet.num_cols(),
        })?;

        let mut columns = Vec::with_capacity(range.len());
        for (column, header) in slice.headers() {
            let (duration, strike) = self.decode_header(column, header)?;
            let targets = self.target_columns(column, duration)?;
            if targets.max_column() >= sheet.num_cols() {
                return Err(LayoutError::OutOfRange {
                    column: targets.max_column(),
                    num_cols: sheet.num_cols(),
                });
            }
            columns.push(SurfaceColumn {
                column,
                duration,
                strike,
                targets,
            });
        }

        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Cell, RawSheet};
    use crate::layout::TierOffsets;

    /// Layout with one surface column at 3 and targets one/two columns right.
    fn compact_config() -> LayoutConfig {
        LayoutConfig {
            surface_start: 3,
            surface_len: 2,
            realized_vol_offset: 2,
            tier_offsets: vec![
                TierOffsets::new(DurationTier::SixMonths, 2, 4),
                TierOffsets::new(DurationTier::OneYear, 3, 5),
            ],
            ..LayoutConfig::default()
        }
    }

    fn sheet(lag_label: &str, headers: &[(&str, &str)]) -> RawSheet {
        let mut all = vec![
            ColumnHeader::leading("Dates"),
            ColumnHeader::leading("Spot t"),
            ColumnHeader::leading(lag_label),
        ];
        all.extend(headers.iter().map(|(d, s)| ColumnHeader::new(*d, *s)));
        let width = all.len();
        RawSheet::from_rows(all, vec![vec![Cell::Empty; width]])
    }

    #[test]
    fn test_daily_selects_one_period_lag() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Single).unwrap();
        let sheet = sheet("Spot t-1", &[("6M", "40")]);
        let leading = resolver.leading_columns(&sheet, Periodicity::Daily).unwrap();
        assert_eq!(leading, LeadingColumns { date: 0, spot_now: 1, spot_lag: 2 });
    }

    #[test]
    fn test_weekly_selects_five_period_lag() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Single).unwrap();
        let weekly = sheet("Spot t-5", &[("6M", "40")]);
        assert_eq!(resolver.lag_label(Periodicity::Weekly), "Spot t-5");
        assert_eq!(
            resolver.leading_columns(&weekly, Periodicity::Weekly).unwrap().spot_lag,
            2
        );

        // A weekly sheet read as daily has no "Spot t-1" column.
        let err = resolver.leading_columns(&weekly, Periodicity::Daily).unwrap_err();
        assert!(matches!(err, LayoutError::MissingColumn(ref l) if l == "Spot t-1"));
    }

    #[test]
    fn test_decode_header() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Single).unwrap();
        let (duration, strike) = resolver
            .decode_header(3, &ColumnHeader::new("18M", "110.0"))
            .unwrap();
        assert_eq!(duration, DurationTier::EighteenMonths);
        assert_eq!(strike, Decimal::from(110));
        assert_eq!(strike.to_string(), "110");

        let err = resolver.decode_header(3, &ColumnHeader::new("5Y", "40")).unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
        assert!(resolver.decode_header(3, &ColumnHeader::new("6M", "ATM")).is_err());
    }

    #[test]
    fn test_single_target_uniform_offset() {
        let resolver = ColumnLayoutResolver::new(LayoutConfig::default(), ReshapeMode::Single).unwrap();
        for duration in DurationTier::ALL {
            assert_eq!(
                resolver.target_columns(10, duration).unwrap(),
                TargetColumns::Realized { real_implied_vol: 61 }
            );
        }
    }

    #[test]
    fn test_dual_target_tiered_offsets() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Dual).unwrap();
        assert_eq!(
            resolver.target_columns(3, DurationTier::SixMonths).unwrap(),
            TargetColumns::NextPeriod { implied_vol_next: 5, change_in_implied_vol: 7 }
        );
        assert_eq!(
            resolver.target_columns(4, DurationTier::OneYear).unwrap(),
            TargetColumns::NextPeriod { implied_vol_next: 7, change_in_implied_vol: 9 }
        );

        let err = resolver.target_columns(3, DurationTier::TwoYears).unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));
    }

    #[test]
    fn test_resolve_surface_out_of_range() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Single).unwrap();
        // Two surface columns, realized vol expected at 5 and 6, sheet is 6 wide.
        let narrow = sheet("Spot t-1", &[("6M", "40"), ("6M", "60"), ("", "rv")]);
        let err = resolver.resolve_surface(&narrow).unwrap_err();
        assert!(matches!(err, LayoutError::OutOfRange { column: 6, num_cols: 6 }));

        // Surface block itself wider than the sheet.
        let tiny = sheet("Spot t-1", &[("6M", "40")]);
        let err = resolver.resolve_surface(&tiny).unwrap_err();
        assert!(matches!(err, LayoutError::OutOfRange { column: 4, num_cols: 4 }));
    }

    #[test]
    fn test_target_column_overflow_is_an_error() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Single).unwrap();
        let err = resolver.target_columns(usize::MAX, DurationTier::SixMonths).unwrap_err();
        assert!(matches!(err, LayoutError::Configuration(_)));

        let dual = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Dual).unwrap();
        assert!(dual.target_columns(usize::MAX - 3, DurationTier::OneYear).is_err());
    }

    #[test]
    fn test_resolve_surface_in_header_order() {
        let resolver = ColumnLayoutResolver::new(compact_config(), ReshapeMode::Single).unwrap();
        let wide = sheet(
            "Spot t-1",
            &[("6M", "40"), ("1Y", "60"), ("", "rv"), ("", "rv")],
        );
        let columns = resolver.resolve_surface(&wide).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].duration, DurationTier::SixMonths);
        assert_eq!(columns[1].strike, Decimal::from(60));
        assert_eq!(columns[1].targets, TargetColumns::Realized { real_implied_vol: 6 });
    }
}
