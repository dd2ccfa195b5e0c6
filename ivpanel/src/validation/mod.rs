//! Validation of reshaped panels.
//!
//! Checks density, key uniqueness, value ranges and date continuity of a
//! panel built from a surface sheet.

pub mod panel_integrity;

pub use panel_integrity::{
    max_gap_days, CheckResult, PanelIntegrityReport, PanelIntegrityValidator, ValidationError,
    ValidationResult,
};
