//! Vendor sheet layout.
//!
//! Provides:
//! - `LayoutConfig`: leading labels, surface block and target offset tables
//! - `ColumnLayoutResolver`: maps column positions to semantic roles

pub mod config;
pub mod resolver;

pub use config::{LayoutConfig, LeadingLabels, TierOffsets};
pub use resolver::{
    ColumnLayoutResolver, LayoutError, LayoutResult, LeadingColumns, ReshapeMode, SurfaceColumn,
    TargetColumns,
};
