//! Panel analytics.
//!
//! Provides:
//! - Pairwise Pearson correlation between (duration, strike) series
//! - Pairing policies over the tier x strike grid

pub mod correlation;

pub use correlation::{
    correlation_p_value, pearson, CorrelationError, CorrelationRecord, CorrelationTable,
    CorrelationTableBuilder, GroupKey, PairingPolicy, SeriesField, CORRELATION_COLUMNS,
    MIN_OBSERVATIONS,
};
