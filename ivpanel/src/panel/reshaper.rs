//! Wide-to-long panel reshaping.
//!
//! Each surface column of the sheet becomes a block of panel records, one per
//! sheet row, carrying the leading columns (date, spots), the surface cell and
//! the target value(s) resolved for that column. Blocks are concatenated in
//! header order and records with any missing value are dropped.

use crate::data::{Periodicity, Sheet};
use crate::layout::{
    ColumnLayoutResolver, LayoutConfig, LayoutResult, LeadingColumns, ReshapeMode, SurfaceColumn,
    TargetColumns,
};

use super::observer::{ColumnEvent, ReshapeObserver, ReshapeSummary, TracingObserver};
use super::record::{Panel, PanelRecord, Target};

/// Reshapes vendor sheets into long panels.
pub struct PanelReshaper<O: ReshapeObserver = TracingObserver> {
    resolver: ColumnLayoutResolver,
    observer: O,
}

impl PanelReshaper<TracingObserver> {
    /// Reshaper for `mode` using `config`, reporting through `tracing`.
    pub fn new(config: LayoutConfig, mode: ReshapeMode) -> LayoutResult<Self> {
        Ok(Self {
            resolver: ColumnLayoutResolver::new(config, mode)?,
            observer: TracingObserver,
        })
    }
}

impl<O: ReshapeObserver> PanelReshaper<O> {
    /// Replace the observer.
    pub fn with_observer<P: ReshapeObserver>(self, observer: P) -> PanelReshaper<P> {
        PanelReshaper {
            resolver: self.resolver,
            observer,
        }
    }

    pub fn resolver(&self) -> &ColumnLayoutResolver {
        &self.resolver
    }

    pub fn mode(&self) -> ReshapeMode {
        self.resolver.mode()
    }

    /// Reshape a sheet into a dense panel.
    ///
    /// The whole layout is resolved before any record is read, so a bad
    /// header or an out-of-range target aborts without a partial panel.
    pub fn reshape<S: Sheet>(&self, sheet: &S, periodicity: Periodicity) -> LayoutResult<Panel> {
        let leading = self.resolver.leading_columns(sheet, periodicity)?;
        let surface = self.resolver.resolve_surface(sheet)?;

        self.observer.on_start(sheet.source_name(), surface.len());

        let total = surface.len();
        let mut records = Vec::with_capacity(total * sheet.num_rows());
        let mut emitted = 0;

        for (index, column) in surface.iter().enumerate() {
            self.observer.on_column(&ColumnEvent {
                column: column.column,
                duration: column.duration,
                strike: column.strike,
                index,
                total,
            });

            let block = reshape_column(sheet, &leading, column);
            emitted += sheet.num_rows();
            records.extend(block);
        }

        let panel = Panel::new(self.mode(), periodicity, records);

        self.observer.on_finish(&ReshapeSummary {
            source: sheet.source_name().map(str::to_string),
            mode: self.mode(),
            periodicity,
            surface_columns: total,
            sheet_rows: sheet.num_rows(),
            emitted,
            kept: panel.len(),
        });

        Ok(panel)
    }
}

/// Reshape with the default vendor layout and `tracing` diagnostics.
pub fn reshape<S: Sheet>(sheet: &S, periodicity: Periodicity, mode: ReshapeMode) -> LayoutResult<Panel> {
    PanelReshaper::new(LayoutConfig::default(), mode)?.reshape(sheet, periodicity)
}

/// Records of one surface column, in sheet row order. Rows with a missing
/// value are skipped.
fn reshape_column<S: Sheet>(
    sheet: &S,
    leading: &LeadingColumns,
    column: &SurfaceColumn,
) -> Vec<PanelRecord> {
    (0..sheet.num_rows())
        .filter_map(|row| read_record(sheet, row, leading, column))
        .collect()
}

fn read_record<S: Sheet>(
    sheet: &S,
    row: usize,
    leading: &LeadingColumns,
    column: &SurfaceColumn,
) -> Option<PanelRecord> {
    let number = |col: usize| sheet.cell(row, col).and_then(|c| c.as_f64());

    let target = match column.targets {
        TargetColumns::Realized { real_implied_vol } => Target::Realized {
            real_implied_vol: number(real_implied_vol)?,
        },
        TargetColumns::NextPeriod {
            implied_vol_next,
            change_in_implied_vol,
        } => Target::NextPeriod {
            implied_vol_next: number(implied_vol_next)?,
            change_in_implied_vol: number(change_in_implied_vol)?,
        },
    };

    Some(PanelRecord {
        date: sheet.cell(row, leading.date)?.as_date()?,
        spot_now: number(leading.spot_now)?,
        spot_lag: number(leading.spot_lag)?,
        duration: column.duration,
        strike: column.strike,
        implied_vol: number(column.column)?,
        target,
    })
}
