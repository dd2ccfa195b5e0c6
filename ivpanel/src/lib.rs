pub mod analytics;
pub mod data;
pub mod layout;
pub mod panel;
pub mod validation;

// Re-export commonly used types
pub use analytics::{CorrelationTable, CorrelationTableBuilder, PairingPolicy, SeriesField};
pub use data::{Cell, ColumnHeader, DurationTier, Periodicity, RawSheet, Sheet, SheetLoader};
pub use layout::{ColumnLayoutResolver, LayoutConfig, LayoutError, ReshapeMode};
pub use panel::{reshape, Panel, PanelRecord, PanelReshaper, ReshapeObserver};
pub use validation::{PanelIntegrityReport, PanelIntegrityValidator};
