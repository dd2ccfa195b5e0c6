//! Sheet loader for vendor volatility-surface exports.
//!
//! The vendor workbook is exported to CSV. The export starts with a few
//! preamble rows (title, as-of date), followed by a two-row header and the
//! dated body:
//!
//! ```text
//! <preamble rows>
//! ,,,6M,,,...,1Y,...          <- level 1: duration label, merged across its block
//! Dates,Spot t,Spot t-1,40,60,...,40,...   <- level 2: leading names / strikes
//! 2019-01-02,100.1,99.8,0.25,0.22,...
//! ```
//!
//! Every cell is read as a string by polars and classified into a `Cell`
//! afterwards, so mixed columns (a `#N/A` in a vol column) never fail the read.

use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sheet::{RawSheet, SheetError};
use super::types::{Cell, ColumnHeader, DateOrder, Periodicity};

/// Number of header rows following the preamble.
pub const HEADER_ROWS: usize = 2;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Rows to skip before the two header rows.
    pub preamble_rows: usize,
    /// Field order of slash dates, applied to every cell of the sheet.
    pub date_order: DateOrder,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            preamble_rows: 2,
            date_order: DateOrder::default(),
        }
    }
}

/// CSV loader producing `RawSheet`s.
pub struct SheetLoader {
    config: LoaderConfig,
}

impl Default for SheetLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl SheetLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Read the export into a string-typed DataFrame, header rows included.
    pub fn load_dataframe(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let df = CsvReadOptions::default()
            .with_has_header(false)
            .with_skip_rows(self.config.preamble_rows)
            .with_infer_schema_length(Some(0))
            .with_parse_options(CsvParseOptions::default().with_truncate_ragged_lines(true))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        Ok(df)
    }

    /// Load a sheet. The file name becomes the sheet's source name.
    pub fn load(&self, path: &Path) -> Result<RawSheet, LoaderError> {
        let df = self.load_dataframe(path)?;
        let sheet = dataframe_to_sheet(&df, self.config.date_order)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(sheet.with_source_name(name))
    }

    /// Periodicity implied by a file name.
    pub fn periodicity(&self, path: &Path) -> Periodicity {
        Periodicity::from_source_name(&path.to_string_lossy())
    }
}

/// Convert a string-typed frame whose first two rows are the header levels.
pub fn dataframe_to_sheet(df: &DataFrame, date_order: DateOrder) -> Result<RawSheet, LoaderError> {
    if df.height() < HEADER_ROWS {
        return Err(LoaderError::InvalidData(format!(
            "expected {} header rows, found {} rows",
            HEADER_ROWS,
            df.height()
        )));
    }

    let mut headers = Vec::with_capacity(df.width());
    let mut columns = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let values = column.str()?;
        let level1 = values.get(0).unwrap_or_default().trim().to_string();
        let level2 = values.get(1).unwrap_or_default().trim().to_string();
        headers.push(ColumnHeader::new(level1, level2));

        let cells: Vec<Cell> = values
            .into_iter()
            .skip(HEADER_ROWS)
            .map(|v| v.map(|raw| Cell::parse_with(raw, date_order)).unwrap_or_default())
            .collect();
        columns.push(cells);
    }

    forward_fill_level1(&mut headers);
    Ok(RawSheet::new(headers, columns)?)
}

/// Spread merged duration labels across their block.
///
/// The export writes a merged level-1 label only in the first column of the
/// block. Blanks before the first label belong to the leading columns and
/// stay blank.
fn forward_fill_level1(headers: &mut [ColumnHeader]) {
    let mut current: Option<String> = None;
    for header in headers.iter_mut() {
        if header.level1.is_empty() {
            if let Some(label) = &current {
                header.level1 = label.clone();
            }
        } else {
            current = Some(header.level1.clone());
        }
    }
}
