//! Integrity validation for reshaped panels.
//!
//! Validates:
//! - Density (every numeric field finite)
//! - Unique (date, duration, strike) keys
//! - Volatility validity (surface and targets >= 0, change may be negative)
//! - Spot validity (spot_t and spot lag > 0)
//! - Date continuity (no gaps beyond the periodicity's threshold)

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::data::{LoaderError, Periodicity, SheetLoader};
use crate::layout::{LayoutConfig, LayoutError, ReshapeMode};
use crate::panel::{Panel, PanelReshaper, ReshapeObserver, Target, TracingObserver};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result of a single validation check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Integrity report for one panel.
#[derive(Debug)]
pub struct PanelIntegrityReport {
    pub source: Option<String>,
    pub mode: ReshapeMode,
    pub periodicity: Periodicity,
    pub record_count: usize,
    pub trading_days: usize,
    /// Distinct (duration, strike) groups.
    pub groups: usize,
    pub checks: Vec<CheckResult>,
}

impl PanelIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let total = self.checks.len();
        format!(
            "{} [{}, {}] ({} records, {} dates, {} groups): {}/{} checks passed",
            self.source.as_deref().unwrap_or("<memory>"),
            self.mode,
            self.periodicity,
            self.record_count,
            self.trading_days,
            self.groups,
            passed,
            total
        )
    }
}

/// Largest allowed gap between consecutive dates, in calendar days.
pub fn max_gap_days(periodicity: Periodicity) -> i64 {
    match periodicity {
        Periodicity::Daily => 7,
        Periodicity::Weekly => 14,
    }
}

/// Loads, reshapes and checks surface sheets.
pub struct PanelIntegrityValidator<O: ReshapeObserver = TracingObserver> {
    loader: SheetLoader,
    reshaper: PanelReshaper<O>,
}

impl PanelIntegrityValidator<TracingObserver> {
    pub fn new(config: LayoutConfig, mode: ReshapeMode) -> ValidationResult<Self> {
        Ok(Self {
            loader: SheetLoader::default(),
            reshaper: PanelReshaper::new(config, mode)?,
        })
    }
}

impl<O: ReshapeObserver> PanelIntegrityValidator<O> {
    pub fn from_parts(loader: SheetLoader, reshaper: PanelReshaper<O>) -> Self {
        Self { loader, reshaper }
    }

    /// Load and reshape `path`, then run every check on the panel.
    ///
    /// Periodicity is inferred from the file name unless given.
    pub fn validate_file(
        &self,
        path: &Path,
        periodicity: Option<Periodicity>,
    ) -> ValidationResult<PanelIntegrityReport> {
        let sheet = self.loader.load(path)?;
        let periodicity = periodicity.unwrap_or_else(|| self.loader.periodicity(path));
        let panel = self.reshaper.reshape(&sheet, periodicity)?;

        let mut report = self.validate_panel(&panel);
        report.source = Some(path.display().to_string());
        Ok(report)
    }

    /// Run every check on an already built panel.
    pub fn validate_panel(&self, panel: &Panel) -> PanelIntegrityReport {
        let checks = vec![
            check_density(panel),
            check_unique_keys(panel),
            check_vol_validity(panel),
            check_spot_validity(panel),
            check_date_continuity(panel),
        ];

        PanelIntegrityReport {
            source: None,
            mode: panel.mode(),
            periodicity: panel.periodicity(),
            record_count: panel.len(),
            trading_days: panel.dates().len(),
            groups: panel
                .iter()
                .map(|r| r.group())
                .collect::<HashSet<_>>()
                .len(),
            checks,
        }
    }
}

fn check_density(panel: &Panel) -> CheckResult {
    let sparse = panel.iter().filter(|r| !r.is_dense()).count();
    if sparse == 0 {
        CheckResult::pass(
            "density",
            &format!("All {} records fully populated", panel.len()),
        )
    } else {
        CheckResult::fail(
            "density",
            &format!("{} records with missing values", sparse),
            None,
        )
    }
}

fn check_unique_keys(panel: &Panel) -> CheckResult {
    let mut seen = HashSet::with_capacity(panel.len());
    let mut duplicates = Vec::new();
    for record in panel {
        if !seen.insert(record.key()) {
            duplicates.push(format!(
                "{} {}/{}",
                record.date, record.duration, record.strike
            ));
        }
    }

    if duplicates.is_empty() {
        CheckResult::pass("unique_keys", "No duplicate (date, duration, strike) keys")
    } else {
        CheckResult::fail(
            "unique_keys",
            &format!("{} duplicate keys", duplicates.len()),
            Some(duplicates.join(", ")),
        )
    }
}

fn check_vol_validity(panel: &Panel) -> CheckResult {
    let mut negative_surface = 0;
    let mut negative_target = 0;
    for record in panel {
        if record.implied_vol < 0.0 {
            negative_surface += 1;
        }
        let target = match record.target {
            Target::Realized { real_implied_vol } => real_implied_vol,
            Target::NextPeriod {
                implied_vol_next, ..
            } => implied_vol_next,
        };
        if target < 0.0 {
            negative_target += 1;
        }
    }

    if negative_surface == 0 && negative_target == 0 {
        CheckResult::pass("vol_validity", "All volatilities non-negative")
    } else {
        CheckResult::fail(
            "vol_validity",
            "Negative volatilities",
            Some(format!(
                "surface={}, target={}",
                negative_surface, negative_target
            )),
        )
    }
}

fn check_spot_validity(panel: &Panel) -> CheckResult {
    let invalid = panel
        .iter()
        .filter(|r| r.spot_now <= 0.0 || r.spot_lag <= 0.0)
        .count();

    if invalid == 0 {
        CheckResult::pass("spot_validity", "All spots positive")
    } else {
        CheckResult::fail(
            "spot_validity",
            &format!("{} records with non-positive spot", invalid),
            None,
        )
    }
}

fn check_date_continuity(panel: &Panel) -> CheckResult {
    let dates = panel.dates();
    if dates.is_empty() {
        return CheckResult::fail("date_continuity", "No dates found", None);
    }

    let threshold = max_gap_days(panel.periodicity());
    let gaps: Vec<String> = dates
        .windows(2)
        .filter_map(|w| {
            let gap_days = (w[1] - w[0]).num_days();
            (gap_days > threshold).then(|| format!("{} to {} ({} days)", w[0], w[1], gap_days))
        })
        .collect();

    if gaps.is_empty() {
        CheckResult::pass(
            "date_continuity",
            &format!("{} dates, no major gaps", dates.len()),
        )
    } else {
        CheckResult::fail(
            "date_continuity",
            &format!("{} major gaps found", gaps.len()),
            Some(gaps.join(", ")),
        )
    }
}
