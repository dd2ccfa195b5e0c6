//! Derived calendar and duration fields for panel consumers.

use chrono::Datelike;

use super::record::{Panel, PanelRecord};

/// A panel record with its derived fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichedRecord<'a> {
    pub record: &'a PanelRecord,
    /// Duration in years (exported as `Duration_days`).
    pub duration_years: f64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Monday = 0.
    pub weekday: u32,
}

impl<'a> From<&'a PanelRecord> for EnrichedRecord<'a> {
    fn from(record: &'a PanelRecord) -> Self {
        Self {
            record,
            duration_years: record.duration.year_fraction(),
            year: record.date.year(),
            month: record.date.month(),
            day: record.date.day(),
            weekday: record.date.weekday().num_days_from_monday(),
        }
    }
}

/// Derive calendar and duration fields for every record, in panel order.
pub fn enrich(panel: &Panel) -> Vec<EnrichedRecord<'_>> {
    panel.iter().map(EnrichedRecord::from).collect()
}
