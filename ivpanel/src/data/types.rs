//! Core data types for volatility-surface sheets.
//!
//! These types describe the vendor spreadsheet as it is read (cells and
//! two-level column headers) together with the fixed duration tiers the
//! surface is quoted on.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Unambiguous date formats, accepted regardless of `DateOrder`.
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const DOTTED_DATE_FORMAT: &str = "%d.%m.%Y";

/// Datetime formats produced when a workbook date is exported with a time part.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Tokens the vendor export uses for an empty cell.
const MISSING_TOKENS: &[&str] = &["#N/A", "N/A", "NA", "#VALUE!", "-"];

/// Largest Excel serial day number (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Duration tier of a surface column.
///
/// Variants are declared in tier order, so the derived `Ord` is maturity
/// order (6M < 1Y < 18M < 2Y < 3Y), not label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DurationTier {
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "18M")]
    EighteenMonths,
    #[serde(rename = "2Y")]
    TwoYears,
    #[serde(rename = "3Y")]
    ThreeYears,
}

impl DurationTier {
    /// All tiers in tier order.
    pub const ALL: [DurationTier; 5] = [
        Self::SixMonths,
        Self::OneYear,
        Self::EighteenMonths,
        Self::TwoYears,
        Self::ThreeYears,
    ];

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "6M" => Some(Self::SixMonths),
            "1Y" => Some(Self::OneYear),
            "18M" => Some(Self::EighteenMonths),
            "2Y" => Some(Self::TwoYears),
            "3Y" => Some(Self::ThreeYears),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::EighteenMonths => "18M",
            Self::TwoYears => "2Y",
            Self::ThreeYears => "3Y",
        }
    }

    /// Maturity expressed in years (6M = 0.5).
    pub fn year_fraction(&self) -> f64 {
        match self {
            Self::SixMonths => 0.5,
            Self::OneYear => 1.0,
            Self::EighteenMonths => 1.5,
            Self::TwoYears => 2.0,
            Self::ThreeYears => 3.0,
        }
    }

    /// Zero-based position in tier order.
    pub fn tier_index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for DurationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling frequency of the sheet's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    #[default]
    Daily,
    Weekly,
}

impl Periodicity {
    /// Infer periodicity from a file or sheet name: anything mentioning
    /// `weekly` is weekly, everything else daily.
    pub fn from_source_name(name: &str) -> Self {
        if name.to_lowercase().contains("weekly") {
            Self::Weekly
        } else {
            Self::Daily
        }
    }

    /// Number of rows between the current spot and the lagged spot.
    pub fn lag_periods(&self) -> usize {
        match self {
            Self::Daily => 1,
            Self::Weekly => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Periodicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Self::Daily),
            "weekly" | "w" => Ok(Self::Weekly),
            other => Err(format!("unknown periodicity '{}'", other)),
        }
    }
}

/// Two-level column header.
///
/// Surface columns carry `(duration label, strike label)`; leading columns
/// have a blank first level and their name in the second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHeader {
    pub level1: String,
    pub level2: String,
}

impl ColumnHeader {
    pub fn new(level1: impl Into<String>, level2: impl Into<String>) -> Self {
        Self {
            level1: level1.into(),
            level2: level2.into(),
        }
    }

    /// Header of a leading (non-surface) column.
    pub fn leading(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    pub fn is_leading(&self) -> bool {
        self.level1.trim().is_empty()
    }
}

impl fmt::Display for ColumnHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.level1, self.level2)
    }
}

/// Field order of slash-separated dates (`01/02/2019`).
///
/// Slash dates are ambiguous for days up to 12, so one order applies to the
/// whole sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateOrder {
    /// `%m/%d/%Y`
    #[default]
    MonthFirst,
    /// `%d/%m/%Y`
    DayFirst,
}

impl DateOrder {
    pub fn slash_format(&self) -> &'static str {
        match self {
            Self::MonthFirst => "%m/%d/%Y",
            Self::DayFirst => "%d/%m/%Y",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthFirst => "month-first",
            Self::DayFirst => "day-first",
        }
    }
}

impl fmt::Display for DateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month-first" | "mdy" => Ok(Self::MonthFirst),
            "day-first" | "dmy" => Ok(Self::DayFirst),
            other => Err(format!("unknown date order '{}'", other)),
        }
    }
}

/// A single sheet cell as read from the vendor export.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    /// Classify a raw exported string with the default `DateOrder`.
    pub fn parse(raw: &str) -> Self {
        Self::parse_with(raw, DateOrder::default())
    }

    /// Classify a raw exported string: numbers first, then dates, then text.
    pub fn parse_with(raw: &str, order: DateOrder) -> Self {
        let s = raw.trim();
        if s.is_empty() || MISSING_TOKENS.contains(&s) {
            return Self::Empty;
        }
        if let Ok(value) = s.parse::<f64>() {
            return Self::Number(value);
        }
        if let Some(date) = parse_date_with(s, order) {
            return Self::Date(date);
        }
        Self::Text(s.to_string())
    }

    /// Whether the cell holds no usable value (blank or NaN).
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(v) => !v.is_finite(),
            Self::Text(t) => t.trim().is_empty(),
            Self::Date(_) => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(*v),
            Self::Text(t) => t.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Read the cell as a date. Numbers are taken as Excel serial days and
    /// text with the default `DateOrder`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Number(v) => excel_serial_to_date(*v),
            Self::Text(t) => parse_date(t),
            Self::Empty => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

/// Parse a date with the default `DateOrder`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_date_with(s, DateOrder::default())
}

/// Parse an ISO, dotted (`%d.%m.%Y`) or slash date. Slash dates are read in
/// `order` only.
pub fn parse_date_with(s: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = s.trim();
    [ISO_DATE_FORMAT, order.slash_format(), DOTTED_DATE_FORMAT]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Convert an Excel serial day number (1900 date system) to a date.
///
/// Only serials from 1900-03-01 (61) onward are accepted, which sidesteps
/// Excel's phantom 1900-02-29.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(61.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
