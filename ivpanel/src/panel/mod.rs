//! Long-format panel.
//!
//! Provides:
//! - `PanelReshaper`: wide vendor sheet -> dense long panel
//! - `Panel` / `PanelRecord`: the panel value and its polars export
//! - enrichment with calendar and duration fields
//! - reshape observers for progress reporting

pub mod enrich;
pub mod observer;
pub mod record;
pub mod reshaper;

pub use enrich::{enrich, EnrichedRecord};
pub use observer::{ColumnEvent, NoopObserver, ReshapeObserver, ReshapeSummary, TracingObserver};
pub use record::{
    Panel, PanelRecord, Target, DUAL_TARGET_COLUMNS, ENRICHED_COLUMNS, SINGLE_TARGET_COLUMNS,
};
pub use reshaper::{reshape, PanelReshaper};
