//! Long-format panel types.
//!
//! One `PanelRecord` per (date, duration, strike). Downstream consumers read
//! the panel by column name, so the exported column names are fixed here.

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{DurationTier, Periodicity};
use crate::layout::ReshapeMode;

use super::enrich::enrich;

/// Exported columns in single-target mode.
pub const SINGLE_TARGET_COLUMNS: &[&str] = &[
    "Dates",
    "Spot_t",
    "Spot_lag",
    "Duration",
    "Strike",
    "Implied_vol",
    "Real_implied_vol",
];

/// Exported columns in dual-target mode. The surface cell is `Volatility`.
pub const DUAL_TARGET_COLUMNS: &[&str] = &[
    "Dates",
    "Spot_t",
    "Spot_lag",
    "Duration",
    "Strike",
    "Volatility",
    "Implied_vol",
    "Change_in_implied_vol",
];

/// Columns appended by the enrichment step.
pub const ENRICHED_COLUMNS: &[&str] = &["Duration_days", "Year", "Month", "Day", "Weekday"];

/// Target value(s) attached to a surface cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Realized {
        real_implied_vol: f64,
    },
    NextPeriod {
        implied_vol_next: f64,
        change_in_implied_vol: f64,
    },
}

impl Target {
    pub fn mode(&self) -> ReshapeMode {
        match self {
            Self::Realized { .. } => ReshapeMode::Single,
            Self::NextPeriod { .. } => ReshapeMode::Dual,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Self::Realized { real_implied_vol } => real_implied_vol.is_finite(),
            Self::NextPeriod {
                implied_vol_next,
                change_in_implied_vol,
            } => implied_vol_next.is_finite() && change_in_implied_vol.is_finite(),
        }
    }
}

/// One row of the long panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRecord {
    pub date: NaiveDate,
    pub spot_now: f64,
    pub spot_lag: f64,
    pub duration: DurationTier,
    pub strike: Decimal,
    /// Surface cell value.
    pub implied_vol: f64,
    pub target: Target,
}

impl PanelRecord {
    /// Whether every numeric field holds a finite value.
    pub fn is_dense(&self) -> bool {
        self.spot_now.is_finite()
            && self.spot_lag.is_finite()
            && self.implied_vol.is_finite()
            && self.target.is_finite()
    }

    pub fn group(&self) -> (DurationTier, Decimal) {
        (self.duration, self.strike)
    }

    pub fn key(&self) -> (NaiveDate, DurationTier, Decimal) {
        (self.date, self.duration, self.strike)
    }
}

/// Dense long-format panel. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    mode: ReshapeMode,
    periodicity: Periodicity,
    records: Vec<PanelRecord>,
}

impl Panel {
    /// Build a panel, keeping only dense records whose target matches `mode`.
    pub fn new(mode: ReshapeMode, periodicity: Periodicity, records: Vec<PanelRecord>) -> Self {
        let records = records
            .into_iter()
            .filter(|r| r.is_dense() && r.target.mode() == mode)
            .collect();
        Self {
            mode,
            periodicity,
            records,
        }
    }

    pub fn mode(&self) -> ReshapeMode {
        self.mode
    }

    pub fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    pub fn records(&self) -> &[PanelRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PanelRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct durations present, in tier order.
    pub fn durations(&self) -> Vec<DurationTier> {
        let mut durations: Vec<_> = self.records.iter().map(|r| r.duration).collect();
        durations.sort();
        durations.dedup();
        durations
    }

    /// Distinct strikes present, ascending.
    pub fn strikes(&self) -> Vec<Decimal> {
        let mut strikes: Vec<_> = self.records.iter().map(|r| r.strike).collect();
        strikes.sort();
        strikes.dedup();
        strikes
    }

    /// Distinct dates present, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<_> = self.records.iter().map(|r| r.date).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Records of one (duration, strike) group, in panel order.
    pub fn group(&self, duration: DurationTier, strike: Decimal) -> Vec<&PanelRecord> {
        self.records
            .iter()
            .filter(|r| r.duration == duration && r.strike == strike)
            .collect()
    }

    /// Exported column names for this panel's mode.
    pub fn column_names(&self) -> &'static [&'static str] {
        match self.mode {
            ReshapeMode::Single => SINGLE_TARGET_COLUMNS,
            ReshapeMode::Dual => DUAL_TARGET_COLUMNS,
        }
    }

    /// Export the panel as a DataFrame with the downstream column names.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let names = self.column_names();
        let n = self.records.len();

        let mut dates: Vec<NaiveDate> = Vec::with_capacity(n);
        let mut spot_now: Vec<f64> = Vec::with_capacity(n);
        let mut spot_lag: Vec<f64> = Vec::with_capacity(n);
        let mut duration: Vec<&str> = Vec::with_capacity(n);
        let mut strike: Vec<f64> = Vec::with_capacity(n);
        let mut surface: Vec<f64> = Vec::with_capacity(n);
        let mut first_target: Vec<f64> = Vec::with_capacity(n);
        let mut second_target: Vec<f64> = Vec::with_capacity(n);

        for record in &self.records {
            dates.push(record.date);
            spot_now.push(record.spot_now);
            spot_lag.push(record.spot_lag);
            duration.push(record.duration.as_str());
            strike.push(record.strike.try_into().unwrap_or(f64::NAN));
            surface.push(record.implied_vol);
            match record.target {
                Target::Realized { real_implied_vol } => first_target.push(real_implied_vol),
                Target::NextPeriod {
                    implied_vol_next,
                    change_in_implied_vol,
                } => {
                    first_target.push(implied_vol_next);
                    second_target.push(change_in_implied_vol);
                }
            }
        }

        let mut columns: Vec<Column> = vec![
            Series::new(names[0].into(), dates).into(),
            Series::new(names[1].into(), spot_now).into(),
            Series::new(names[2].into(), spot_lag).into(),
            Series::new(names[3].into(), duration).into(),
            Series::new(names[4].into(), strike).into(),
            Series::new(names[5].into(), surface).into(),
            Series::new(names[6].into(), first_target).into(),
        ];
        if self.mode == ReshapeMode::Dual {
            columns.push(Series::new(names[7].into(), second_target).into());
        }

        DataFrame::new(columns)
    }

    /// Export with the derived calendar and duration columns appended.
    pub fn to_enriched_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut df = self.to_dataframe()?;
        let enriched = enrich(self);

        let duration_days: Vec<f64> = enriched.iter().map(|e| e.duration_years).collect();
        let year: Vec<i32> = enriched.iter().map(|e| e.year).collect();
        let month: Vec<u32> = enriched.iter().map(|e| e.month).collect();
        let day: Vec<u32> = enriched.iter().map(|e| e.day).collect();
        let weekday: Vec<u32> = enriched.iter().map(|e| e.weekday).collect();

        df.hstack_mut(&[
            Series::new(ENRICHED_COLUMNS[0].into(), duration_days).into(),
            Series::new(ENRICHED_COLUMNS[1].into(), year).into(),
            Series::new(ENRICHED_COLUMNS[2].into(), month).into(),
            Series::new(ENRICHED_COLUMNS[3].into(), day).into(),
            Series::new(ENRICHED_COLUMNS[4].into(), weekday).into(),
        ])?;

        Ok(df)
    }
}

impl<'a> IntoIterator for &'a Panel {
    type Item = &'a PanelRecord;
    type IntoIter = std::slice::Iter<'a, PanelRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, duration: DurationTier, strike: i64, vol: f64) -> PanelRecord {
        PanelRecord {
            date: NaiveDate::from_ymd_opt(2019, 1, day).unwrap(),
            spot_now: 100.0,
            spot_lag: 99.0,
            duration,
            strike: Decimal::from(strike),
            implied_vol: vol,
            target: Target::Realized {
                real_implied_vol: vol * 0.9,
            },
        }
    }

    #[test]
    fn test_new_drops_non_dense_records() {
        let mut bad = record(3, DurationTier::SixMonths, 40, 0.2);
        bad.spot_lag = f64::NAN;
        let panel = Panel::new(
            ReshapeMode::Single,
            Periodicity::Daily,
            vec![record(2, DurationTier::SixMonths, 40, 0.2), bad],
        );
        assert_eq!(panel.len(), 1);
        assert!(panel.iter().all(PanelRecord::is_dense));
    }

    #[test]
    fn test_new_drops_mismatched_targets() {
        let panel = Panel::new(
            ReshapeMode::Dual,
            Periodicity::Daily,
            vec![record(2, DurationTier::SixMonths, 40, 0.2)],
        );
        assert!(panel.is_empty());
    }

    #[test]
    fn test_distinct_keys() {
        let panel = Panel::new(
            ReshapeMode::Single,
            Periodicity::Daily,
            vec![
                record(2, DurationTier::OneYear, 60, 0.2),
                record(2, DurationTier::SixMonths, 40, 0.2),
                record(3, DurationTier::SixMonths, 60, 0.2),
            ],
        );
        assert_eq!(
            panel.durations(),
            vec![DurationTier::SixMonths, DurationTier::OneYear]
        );
        assert_eq!(panel.strikes(), vec![Decimal::from(40), Decimal::from(60)]);
        assert_eq!(panel.dates().len(), 2);
        assert_eq!(panel.group(DurationTier::SixMonths, Decimal::from(60)).len(), 1);
    }

    #[test]
    fn test_to_dataframe_single_columns() {
        let panel = Panel::new(
            ReshapeMode::Single,
            Periodicity::Daily,
            vec![record(2, DurationTier::SixMonths, 40, 0.2)],
        );
        let df = panel.to_dataframe().unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, SINGLE_TARGET_COLUMNS);
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("Duration").unwrap().str().unwrap().get(0), Some("6M"));
    }

    #[test]
    fn test_to_enriched_dataframe_dual() {
        let mut dual = record(2, DurationTier::EighteenMonths, 40, 0.2);
        dual.target = Target::NextPeriod {
            implied_vol_next: 0.21,
            change_in_implied_vol: 0.01,
        };
        let panel = Panel::new(ReshapeMode::Dual, Periodicity::Daily, vec![dual]);
        let df = panel.to_enriched_dataframe().unwrap();

        assert_eq!(df.width(), DUAL_TARGET_COLUMNS.len() + ENRICHED_COLUMNS.len());
        let days = df.column("Duration_days").unwrap().f64().unwrap().get(0);
        assert_eq!(days, Some(1.5));
        let change = df
            .column("Change_in_implied_vol")
            .unwrap()
            .f64()
            .unwrap()
            .get(0);
        assert_eq!(change, Some(0.01));
    }
}
