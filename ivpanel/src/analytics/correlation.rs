//! Pairwise correlation of strike/duration volatility series.
//!
//! The panel is grouped by (duration, strike) into date-indexed series. Pairs
//! of groups are enumerated in tier order x strike order, filtered by a
//! pairing policy, aligned on common dates and correlated with Pearson's r.
//! Pairs without enough overlap are left out of the table rather than
//! failing the build.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::DurationTier;
use crate::layout::ReshapeMode;
use crate::panel::{Panel, PanelRecord, Target};

/// Minimum number of aligned dates for a correlation.
pub const MIN_OBSERVATIONS: usize = 2;

/// Exported columns of the correlation table.
pub const CORRELATION_COLUMNS: &[&str] = &[
    "Duration1",
    "Strike1",
    "Duration2",
    "Strike2",
    "Pearson correlation",
    "Observations",
    "P-value",
];

/// A (duration, strike) group of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub duration: DurationTier,
    pub strike: Decimal,
}

impl GroupKey {
    pub fn new(duration: DurationTier, strike: Decimal) -> Self {
        Self { duration, strike }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.duration, self.strike)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("Insufficient data for {first} vs {second}: {observations} overlapping dates")]
    InsufficientData {
        first: GroupKey,
        second: GroupKey,
        observations: usize,
    },

    #[error("Zero variance for {first} vs {second} over {observations} dates")]
    ZeroVariance {
        first: GroupKey,
        second: GroupKey,
        observations: usize,
    },

    #[error("Field {field} is not available in {mode}-target panels")]
    FieldUnavailable { field: SeriesField, mode: ReshapeMode },
}

impl CorrelationError {
    /// Overlapping dates of the omitted pair, if the error is per pair.
    pub fn observations(&self) -> Option<usize> {
        match self {
            Self::InsufficientData { observations, .. } | Self::ZeroVariance { observations, .. } => {
                Some(*observations)
            }
            Self::FieldUnavailable { .. } => None,
        }
    }
}

/// Which pairs of groups enter the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingPolicy {
    /// `(d1, s1) < (d2, s2)` in (tier, strike) order: every unordered pair
    /// once, no self-pairs.
    #[default]
    StrictUpper,
    /// `d1 <= d2` in tier order: same-tier pairs in both strike orders and
    /// every self-pair (r = 1).
    UpperOrEqual,
    /// `d1 < d2` in tier order: only pairs across different tiers.
    CrossTier,
}

impl PairingPolicy {
    pub fn includes(&self, first: GroupKey, second: GroupKey) -> bool {
        match self {
            Self::StrictUpper => first < second,
            Self::UpperOrEqual => first.duration <= second.duration,
            Self::CrossTier => first.duration < second.duration,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrictUpper => "strict-upper",
            Self::UpperOrEqual => "upper-or-equal",
            Self::CrossTier => "cross-tier",
        }
    }
}

impl fmt::Display for PairingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PairingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict-upper" => Ok(Self::StrictUpper),
            "upper-or-equal" => Ok(Self::UpperOrEqual),
            "cross-tier" => Ok(Self::CrossTier),
            other => Err(format!("unknown pairing policy '{}'", other)),
        }
    }
}

/// Panel value correlated between groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeriesField {
    /// The surface cell (`Implied_vol`, or `Volatility` in dual mode).
    #[default]
    ImpliedVol,
    /// Realized vol (single-target mode).
    RealImpliedVol,
    /// Next-period implied vol (dual-target mode).
    ImpliedVolNext,
    /// Change in implied vol (dual-target mode).
    ChangeInImpliedVol,
}

impl SeriesField {
    pub fn value(&self, record: &PanelRecord) -> Option<f64> {
        match (self, record.target) {
            (Self::ImpliedVol, _) => Some(record.implied_vol),
            (Self::RealImpliedVol, Target::Realized { real_implied_vol }) => Some(real_implied_vol),
            (Self::ImpliedVolNext, Target::NextPeriod { implied_vol_next, .. }) => {
                Some(implied_vol_next)
            }
            (
                Self::ChangeInImpliedVol,
                Target::NextPeriod {
                    change_in_implied_vol,
                    ..
                },
            ) => Some(change_in_implied_vol),
            _ => None,
        }
    }

    pub fn available_in(&self, mode: ReshapeMode) -> bool {
        match self {
            Self::ImpliedVol => true,
            Self::RealImpliedVol => mode == ReshapeMode::Single,
            Self::ImpliedVolNext | Self::ChangeInImpliedVol => mode == ReshapeMode::Dual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImpliedVol => "implied-vol",
            Self::RealImpliedVol => "real-implied-vol",
            Self::ImpliedVolNext => "implied-vol-next",
            Self::ChangeInImpliedVol => "change-in-implied-vol",
        }
    }
}

impl fmt::Display for SeriesField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "implied-vol" => Ok(Self::ImpliedVol),
            "real-implied-vol" => Ok(Self::RealImpliedVol),
            "implied-vol-next" => Ok(Self::ImpliedVolNext),
            "change-in-implied-vol" => Ok(Self::ChangeInImpliedVol),
            other => Err(format!("unknown series field '{}'", other)),
        }
    }
}

/// One row of the correlation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub duration1: DurationTier,
    pub strike1: Decimal,
    pub duration2: DurationTier,
    pub strike2: Decimal,
    pub pearson_corr: f64,
    /// Number of dates both series carry.
    pub observations: usize,
    /// Two-sided p-value of `r = 0`; `None` below three observations.
    pub p_value: Option<f64>,
}

impl CorrelationRecord {
    pub fn first(&self) -> GroupKey {
        GroupKey::new(self.duration1, self.strike1)
    }

    pub fn second(&self) -> GroupKey {
        GroupKey::new(self.duration2, self.strike2)
    }

    pub fn is_self_pair(&self) -> bool {
        self.first() == self.second()
    }
}

/// Result of a correlation build. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTable {
    policy: PairingPolicy,
    field: SeriesField,
    records: Vec<CorrelationRecord>,
    omitted: Vec<CorrelationError>,
}

impl CorrelationTable {
    pub fn policy(&self) -> PairingPolicy {
        self.policy
    }

    pub fn field(&self) -> SeriesField {
        self.field
    }

    /// Rows in enumeration order.
    pub fn records(&self) -> &[CorrelationRecord] {
        &self.records
    }

    /// Pairs left out, with the reason, in enumeration order.
    pub fn omitted(&self) -> &[CorrelationError] {
        &self.omitted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row for an ordered pair, if the policy emitted it.
    pub fn get(&self, first: GroupKey, second: GroupKey) -> Option<&CorrelationRecord> {
        self.records
            .iter()
            .find(|r| r.first() == first && r.second() == second)
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let n = self.records.len();
        let mut duration1: Vec<&str> = Vec::with_capacity(n);
        let mut strike1: Vec<f64> = Vec::with_capacity(n);
        let mut duration2: Vec<&str> = Vec::with_capacity(n);
        let mut strike2: Vec<f64> = Vec::with_capacity(n);
        let mut corr: Vec<f64> = Vec::with_capacity(n);
        let mut observations: Vec<u32> = Vec::with_capacity(n);
        let mut p_value: Vec<Option<f64>> = Vec::with_capacity(n);

        for record in &self.records {
            duration1.push(record.duration1.as_str());
            strike1.push(record.strike1.try_into().unwrap_or(f64::NAN));
            duration2.push(record.duration2.as_str());
            strike2.push(record.strike2.try_into().unwrap_or(f64::NAN));
            corr.push(record.pearson_corr);
            observations.push(record.observations as u32);
            p_value.push(record.p_value);
        }

        DataFrame::new(vec![
            Series::new(CORRELATION_COLUMNS[0].into(), duration1).into(),
            Series::new(CORRELATION_COLUMNS[1].into(), strike1).into(),
            Series::new(CORRELATION_COLUMNS[2].into(), duration2).into(),
            Series::new(CORRELATION_COLUMNS[3].into(), strike2).into(),
            Series::new(CORRELATION_COLUMNS[4].into(), corr).into(),
            Series::new(CORRELATION_COLUMNS[5].into(), observations).into(),
            Series::new(CORRELATION_COLUMNS[6].into(), p_value).into(),
        ])
    }
}

type DatedSeries = BTreeMap<NaiveDate, f64>;

/// Builds correlation tables from panels.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationTableBuilder {
    policy: PairingPolicy,
    field: SeriesField,
}

impl CorrelationTableBuilder {
    pub fn new(policy: PairingPolicy) -> Self {
        Self {
            policy,
            field: SeriesField::default(),
        }
    }

    pub fn with_field(mut self, field: SeriesField) -> Self {
        self.field = field;
        self
    }

    /// Build the table for `panel`.
    ///
    /// Only a field the panel does not carry is an error; pairs with too
    /// little overlap are recorded in `omitted` and skipped.
    pub fn build(&self, panel: &Panel) -> Result<CorrelationTable, CorrelationError> {
        if !self.field.available_in(panel.mode()) {
            return Err(CorrelationError::FieldUnavailable {
                field: self.field,
                mode: panel.mode(),
            });
        }

        let series = group_series(panel, self.field);
        let pairs = self.enumerate_pairs(&panel.strikes());

        // Indexed collect keeps enumeration order.
        let results: Vec<Result<CorrelationRecord, CorrelationError>> = pairs
            .par_iter()
            .map(|&(first, second)| correlate_pair(&series, first, second))
            .collect();

        let mut records = Vec::with_capacity(results.len());
        let mut omitted = Vec::new();
        for result in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    // Grid pairs where a group is absent from the panel.
                    if e.observations() == Some(0) {
                        debug!("omitting pair: {}", e);
                    } else {
                        warn!("omitting pair: {}", e);
                    }
                    omitted.push(e);
                }
            }
        }

        info!(
            policy = %self.policy,
            field = %self.field,
            pairs = pairs.len(),
            emitted = records.len(),
            omitted = omitted.len(),
            "correlation table built"
        );

        Ok(CorrelationTable {
            policy: self.policy,
            field: self.field,
            records,
            omitted,
        })
    }

    /// Ordered pairs admitted by the policy, tier order x strike order.
    pub fn enumerate_pairs(&self, strikes: &[Decimal]) -> Vec<(GroupKey, GroupKey)> {
        let groups: Vec<GroupKey> = DurationTier::ALL
            .iter()
            .flat_map(|&d| strikes.iter().map(move |&s| GroupKey::new(d, s)))
            .collect();

        let mut pairs = Vec::new();
        for &first in &groups {
            for &second in &groups {
                if self.policy.includes(first, second) {
                    pairs.push((first, second));
                }
            }
        }
        pairs
    }
}

/// Date-indexed series of `field` per group.
fn group_series(panel: &Panel, field: SeriesField) -> HashMap<GroupKey, DatedSeries> {
    let mut series: HashMap<GroupKey, DatedSeries> = HashMap::new();
    for record in panel {
        if let Some(value) = field.value(record) {
            series
                .entry(GroupKey::new(record.duration, record.strike))
                .or_default()
                .insert(record.date, value);
        }
    }
    series
}

/// Correlate two groups over their common dates.
fn correlate_pair(
    series: &HashMap<GroupKey, DatedSeries>,
    first: GroupKey,
    second: GroupKey,
) -> Result<CorrelationRecord, CorrelationError> {
    let empty = DatedSeries::new();
    let a = series.get(&first).unwrap_or(&empty);
    let b = series.get(&second).unwrap_or(&empty);

    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .filter_map(|(date, x)| b.get(date).map(|y| (*x, *y)))
        .unzip();

    let observations = xs.len();
    if observations < MIN_OBSERVATIONS {
        return Err(CorrelationError::InsufficientData {
            first,
            second,
            observations,
        });
    }

    // A self-pair is 1 even for a flat series.
    let r = if first == second {
        1.0
    } else {
        pearson(&xs, &ys).ok_or(CorrelationError::ZeroVariance {
            first,
            second,
            observations,
        })?
    };

    Ok(CorrelationRecord {
        duration1: first.duration,
        strike1: first.strike,
        duration2: second.duration,
        strike2: second.strike,
        pearson_corr: r,
        observations,
        p_value: correlation_p_value(r, observations),
    })
}

/// Pearson correlation coefficient. `None` for mismatched lengths, fewer
/// than two points or a constant series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < MIN_OBSERVATIONS {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    // Identical inputs give sxy == sxx == syy and sqrt(sxx * sxx) == sxx,
    // so a series against itself is exactly 1.
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Two-sided p-value for `r` over `n` observations (t-test, n - 2 dof).
pub fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }
    if r.abs() >= 1.0 {
        return Some(0.0);
    }

    let dof = (n - 2) as f64;
    let t = r * (dof / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, dof).ok()?;
    Some((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Periodicity;

    fn key(duration: DurationTier, strike: i64) -> GroupKey {
        GroupKey::new(duration, Decimal::from(strike))
    }

    fn record(day: i64, duration: DurationTier, strike: i64, vol: f64) -> PanelRecord {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        PanelRecord {
            date: start + chrono::Duration::days(day),
            spot_now: 100.0,
            spot_lag: 100.0,
            duration,
            strike: Decimal::from(strike),
            implied_vol: vol,
            target: Target::Realized {
                real_implied_vol: vol,
            },
        }
    }

    fn series(duration: DurationTier, strike: i64, days: std::ops::Range<i64>, f: impl Fn(i64) -> f64) -> Vec<PanelRecord> {
        days.map(|d| record(d, duration, strike, f(d))).collect()
    }

    fn panel(records: Vec<PanelRecord>) -> Panel {
        Panel::new(ReshapeMode::Single, Periodicity::Daily, records)
    }

    /// Three strikes in two tiers, ten overlapping dates, varied shapes.
    fn sample_panel() -> Panel {
        let mut records = Vec::new();
        records.extend(series(DurationTier::SixMonths, 40, 0..10, |d| 0.20 + 0.01 * d as f64));
        records.extend(series(DurationTier::SixMonths, 60, 0..10, |d| 0.30 - 0.005 * (d * d % 7) as f64));
        records.extend(series(DurationTier::OneYear, 40, 0..10, |d| 0.25 + 0.002 * ((d * 3) % 5) as f64));
        panel(records)
    }

    #[test]
    fn test_identical_same_tier_series_strict_upper() {
        let mut records = series(DurationTier::SixMonths, 40, 0..10, |d| 0.2 + 0.01 * (d % 4) as f64);
        records.extend(series(DurationTier::SixMonths, 60, 0..10, |d| 0.2 + 0.01 * (d % 4) as f64));
        let table = CorrelationTableBuilder::new(PairingPolicy::StrictUpper)
            .build(&panel(records))
            .unwrap();

        assert_eq!(table.len(), 1);
        let row = &table.records()[0];
        assert_eq!(row.first(), key(DurationTier::SixMonths, 40));
        assert_eq!(row.second(), key(DurationTier::SixMonths, 60));
        assert_eq!(row.pearson_corr, 1.0);
        assert_eq!(row.observations, 10);
    }

    #[test]
    fn test_strict_upper_has_no_self_or_duplicate_pairs() {
        let table = CorrelationTableBuilder::new(PairingPolicy::StrictUpper)
            .build(&sample_panel())
            .unwrap();

        assert!(table.records().iter().all(|r| !r.is_self_pair()));
        // Tier x strike grid has 5 x 2 groups; only 3 carry data, so 3 pairs.
        assert_eq!(table.len(), 3);
        for r in table.records() {
            assert!(table.get(r.second(), r.first()).is_none());
        }
    }

    #[test]
    fn test_upper_or_equal_includes_self_pairs() {
        let table = CorrelationTableBuilder::new(PairingPolicy::UpperOrEqual)
            .build(&sample_panel())
            .unwrap();

        for group in [
            key(DurationTier::SixMonths, 40),
            key(DurationTier::SixMonths, 60),
            key(DurationTier::OneYear, 40),
        ] {
            let row = table.get(group, group).expect("self pair present");
            assert_eq!(row.pearson_corr, 1.0);
        }
        // Same-tier pairs appear in both strike orders.
        assert!(table
            .get(key(DurationTier::SixMonths, 40), key(DurationTier::SixMonths, 60))
            .is_some());
        assert!(table
            .get(key(DurationTier::SixMonths, 60), key(DurationTier::SixMonths, 40))
            .is_some());
        // Never a longer tier first.
        assert!(table.records().iter().all(|r| r.duration1 <= r.duration2));
    }

    #[test]
    fn test_cross_tier_excludes_same_tier() {
        let table = CorrelationTableBuilder::new(PairingPolicy::CrossTier)
            .build(&sample_panel())
            .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.records().iter().all(|r| r.duration1 < r.duration2));
    }

    #[test]
    fn test_correlation_is_symmetric() {
        let panel = sample_panel();
        let series = group_series(&panel, SeriesField::ImpliedVol);
        let a = key(DurationTier::SixMonths, 60);
        let b = key(DurationTier::OneYear, 40);

        let ab = correlate_pair(&series, a, b).unwrap();
        let ba = correlate_pair(&series, b, a).unwrap();
        assert!((ab.pearson_corr - ba.pearson_corr).abs() < 1e-12);
        assert_eq!(ab.observations, ba.observations);
    }

    #[test]
    fn test_single_point_overlap_is_omitted() {
        let mut records = series(DurationTier::SixMonths, 40, 0..5, |d| 0.2 + 0.01 * d as f64);
        records.extend(series(DurationTier::OneYear, 40, 4..9, |d| 0.3 - 0.01 * d as f64));
        let table = CorrelationTableBuilder::new(PairingPolicy::StrictUpper)
            .build(&panel(records))
            .unwrap();

        assert!(table.is_empty());
        assert!(table.omitted().contains(&CorrelationError::InsufficientData {
            first: key(DurationTier::SixMonths, 40),
            second: key(DurationTier::OneYear, 40),
            observations: 1,
        }));
    }

    #[test]
    fn test_aligns_on_dates() {
        // Second series shifted by two days; only days 2..6 overlap.
        let mut records = series(DurationTier::SixMonths, 40, 0..6, |d| (d as f64).sin());
        records.extend(series(DurationTier::TwoYears, 40, 2..10, |d| (d as f64).sin()));
        let table = CorrelationTableBuilder::new(PairingPolicy::StrictUpper)
            .build(&panel(records))
            .unwrap();

        let row = table
            .get(key(DurationTier::SixMonths, 40), key(DurationTier::TwoYears, 40))
            .unwrap();
        assert_eq!(row.observations, 4);
        assert!((row.pearson_corr - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_output_follows_enumeration_order() {
        let builder = CorrelationTableBuilder::new(PairingPolicy::StrictUpper);
        let panel = sample_panel();
        let table = builder.build(&panel).unwrap();

        let expected: Vec<(GroupKey, GroupKey)> = builder
            .enumerate_pairs(&panel.strikes())
            .into_iter()
            .filter(|(a, b)| table.get(*a, *b).is_some())
            .collect();
        let actual: Vec<(GroupKey, GroupKey)> =
            table.records().iter().map(|r| (r.first(), r.second())).collect();
        assert_eq!(actual, expected);
        assert_eq!(actual[0], (key(DurationTier::SixMonths, 40), key(DurationTier::SixMonths, 60)));
    }

    #[test]
    fn test_field_unavailable() {
        let err = CorrelationTableBuilder::new(PairingPolicy::StrictUpper)
            .with_field(SeriesField::ChangeInImpliedVol)
            .build(&sample_panel())
            .unwrap_err();
        assert!(matches!(err, CorrelationError::FieldUnavailable { .. }));
    }

    #[test]
    fn test_zero_variance_is_omitted() {
        let mut records = series(DurationTier::SixMonths, 40, 0..5, |_| 0.2);
        records.extend(series(DurationTier::OneYear, 40, 0..5, |d| 0.2 + 0.01 * d as f64));
        let table = CorrelationTableBuilder::default().build(&panel(records)).unwrap();
        assert!(table.is_empty());
        assert!(matches!(table.omitted()[0], CorrelationError::ZeroVariance { .. }));
    }

    #[test]
    fn test_upper_or_equal_self_pair_constant_series() {
        let flat = key(DurationTier::SixMonths, 40);
        let records = series(DurationTier::SixMonths, 40, 0..5, |_| 0.2);
        let table = CorrelationTableBuilder::new(PairingPolicy::UpperOrEqual)
            .build(&panel(records))
            .unwrap();

        let row = table.get(flat, flat).expect("self pair present");
        assert_eq!(row.pearson_corr, 1.0);
        assert_eq!(row.observations, 5);
        assert!(!table
            .omitted()
            .iter()
            .any(|e| matches!(e, CorrelationError::ZeroVariance { .. })));
    }

    #[test]
    fn test_absent_groups_are_omitted_with_zero_observations() {
        let records = series(DurationTier::SixMonths, 40, 0..5, |d| 0.2 + 0.01 * d as f64);
        let table = CorrelationTableBuilder::new(PairingPolicy::UpperOrEqual)
            .build(&panel(records))
            .unwrap();

        // One strike: self-pair of 6M/40 plus four pairs against empty tiers,
        // and every pair among the empty tiers.
        assert_eq!(table.len(), 1);
        assert_eq!(table.omitted().len(), 14);
        assert!(table.omitted().iter().all(|e| e.observations() == Some(0)));
    }

    #[test]
    fn test_error_observations() {
        let a = key(DurationTier::SixMonths, 40);
        let b = key(DurationTier::OneYear, 40);
        let sparse = CorrelationError::InsufficientData {
            first: a,
            second: b,
            observations: 1,
        };
        assert_eq!(sparse.observations(), Some(1));
        let unavailable = CorrelationError::FieldUnavailable {
            field: SeriesField::ImpliedVolNext,
            mode: ReshapeMode::Single,
        };
        assert_eq!(unavailable.observations(), None);
    }

    #[test]
    fn test_pearson_known_values() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);

        let neg = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((pearson(&xs, &neg).unwrap() + 1.0).abs() < 1e-12);

        assert!(pearson(&xs, &ys[..3]).is_none());
        assert!(pearson(&[1.0], &[1.0]).is_none());
    }

    #[test]
    fn test_p_value() {
        assert_eq!(correlation_p_value(0.5, 2), None);
        assert_eq!(correlation_p_value(1.0, 10), Some(0.0));
        let p = correlation_p_value(0.0, 10).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
        let strong = correlation_p_value(0.9, 30).unwrap();
        assert!(strong < 0.001);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("strict-upper".parse(), Ok(PairingPolicy::StrictUpper));
        assert_eq!("Upper-Or-Equal".parse(), Ok(PairingPolicy::UpperOrEqual));
        assert!("lower".parse::<PairingPolicy>().is_err());
        assert_eq!("change-in-implied-vol".parse(), Ok(SeriesField::ChangeInImpliedVol));
    }

    #[test]
    fn test_to_dataframe() {
        let table = CorrelationTableBuilder::new(PairingPolicy::StrictUpper)
            .build(&sample_panel())
            .unwrap();
        let df = table.to_dataframe().unwrap();
        assert_eq!(df.height(), table.len());
        assert_eq!(df.width(), CORRELATION_COLUMNS.len());
    }
}
