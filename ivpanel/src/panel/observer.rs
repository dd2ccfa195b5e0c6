//! Reshape progress observers.
//!
//! The reshaper reports what it is doing through a `ReshapeObserver` passed
//! in by the caller. `TracingObserver` is the default and emits `tracing`
//! events; front-ends can supply their own (the CLI drives a progress bar).

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::data::{DurationTier, Periodicity};
use crate::layout::ReshapeMode;

/// A surface column about to be reshaped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnEvent {
    /// Sheet column index.
    pub column: usize,
    pub duration: DurationTier,
    pub strike: Decimal,
    /// Position within the surface block.
    pub index: usize,
    /// Number of surface columns.
    pub total: usize,
}

/// Outcome of a finished reshape.
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapeSummary {
    pub source: Option<String>,
    pub mode: ReshapeMode,
    pub periodicity: Periodicity,
    pub surface_columns: usize,
    pub sheet_rows: usize,
    /// Records emitted before dropping missing values.
    pub emitted: usize,
    /// Records kept in the panel.
    pub kept: usize,
}

impl ReshapeSummary {
    pub fn dropped(&self) -> usize {
        self.emitted - self.kept
    }
}

pub trait ReshapeObserver {
    fn on_start(&self, _source: Option<&str>, _surface_columns: usize) {}

    fn on_column(&self, _event: &ColumnEvent) {}

    fn on_finish(&self, _summary: &ReshapeSummary) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReshapeObserver for NoopObserver {}

/// Observer emitting structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ReshapeObserver for TracingObserver {
    fn on_start(&self, source: Option<&str>, surface_columns: usize) {
        info!(
            source = source.unwrap_or("<memory>"),
            surface_columns, "reshaping sheet"
        );
    }

    fn on_column(&self, event: &ColumnEvent) {
        debug!(
            column = event.column,
            duration = %event.duration,
            strike = %event.strike,
            "processing column {}/{}",
            event.index + 1,
            event.total
        );
    }

    fn on_finish(&self, summary: &ReshapeSummary) {
        info!(
            mode = %summary.mode,
            periodicity = %summary.periodicity,
            emitted = summary.emitted,
            kept = summary.kept,
            dropped = summary.dropped(),
            "reshape complete"
        );
    }
}

impl<O: ReshapeObserver + ?Sized> ReshapeObserver for &O {
    fn on_start(&self, source: Option<&str>, surface_columns: usize) {
        (**self).on_start(source, surface_columns)
    }

    fn on_column(&self, event: &ColumnEvent) {
        (**self).on_column(event)
    }

    fn on_finish(&self, summary: &ReshapeSummary) {
        (**self).on_finish(summary)
    }
}
