//! Sheet abstraction over the vendor spreadsheet.
//!
//! The reshaper only needs a handful of operations from a sheet: its shape,
//! positional cell access, the two-level header of a column and a view over a
//! contiguous column range. `RawSheet` is the in-memory implementation the
//! loader produces.

use std::ops::Range;

use thiserror::Error;

use super::types::{Cell, ColumnHeader};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("Header count {headers} does not match column count {columns}")]
    HeaderMismatch { headers: usize, columns: usize },

    #[error("Column {column} has {len} rows, expected {expected}")]
    RaggedColumn {
        column: usize,
        len: usize,
        expected: usize,
    },
}

/// Read-only positional access to a sheet with a two-level header.
pub trait Sheet {
    fn num_rows(&self) -> usize;

    fn num_cols(&self) -> usize;

    /// Cell at `(row, col)`, or `None` outside the sheet.
    fn cell(&self, row: usize, col: usize) -> Option<&Cell>;

    fn header(&self, col: usize) -> Option<&ColumnHeader>;

    /// Name of the file or buffer the sheet came from, if known.
    fn source_name(&self) -> Option<&str> {
        None
    }

    /// View over a contiguous column range. Returns `None` when the range
    /// extends past the last column.
    fn column_range(&self, range: Range<usize>) -> Option<ColumnSlice<'_, Self>>
    where
        Self: Sized,
    {
        if range.start > range.end || range.end > self.num_cols() {
            return None;
        }
        Some(ColumnSlice { sheet: self, range })
    }
}

/// Borrowed view over a contiguous column range of a sheet.
///
/// Column indices passed to the view are relative to the start of the range;
/// `absolute` maps them back to the parent sheet.
#[derive(Debug)]
pub struct ColumnSlice<'a, S> {
    sheet: &'a S,
    range: Range<usize>,
}

impl<'a, S: Sheet> ColumnSlice<'a, S> {
    /// Parent-sheet index of a slice-relative column.
    pub fn absolute(&self, col: usize) -> usize {
        self.range.start + col
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Headers of the slice in column order, paired with parent-sheet indices.
    pub fn headers(&self) -> impl Iterator<Item = (usize, &'a ColumnHeader)> + '_ {
        let sheet = self.sheet;
        self.range
            .clone()
            .filter_map(move |col| sheet.header(col).map(|h| (col, h)))
    }
}

impl<S: Sheet> Sheet for ColumnSlice<'_, S> {
    fn num_rows(&self) -> usize {
        self.sheet.num_rows()
    }

    fn num_cols(&self) -> usize {
        self.range.len()
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if col >= self.range.len() {
            return None;
        }
        self.sheet.cell(row, self.absolute(col))
    }

    fn header(&self, col: usize) -> Option<&ColumnHeader> {
        if col >= self.range.len() {
            return None;
        }
        self.sheet.header(self.absolute(col))
    }

    fn source_name(&self) -> Option<&str> {
        self.sheet.source_name()
    }
}

/// In-memory sheet stored column-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSheet {
    source_name: Option<String>,
    headers: Vec<ColumnHeader>,
    columns: Vec<Vec<Cell>>,
    num_rows: usize,
}

impl RawSheet {
    /// Build a sheet from headers and equally long columns.
    pub fn new(headers: Vec<ColumnHeader>, columns: Vec<Vec<Cell>>) -> Result<Self, SheetError> {
        if headers.len() != columns.len() {
            return Err(SheetError::HeaderMismatch {
                headers: headers.len(),
                columns: columns.len(),
            });
        }

        let num_rows = columns.first().map_or(0, Vec::len);
        if let Some((column, col)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != num_rows)
        {
            return Err(SheetError::RaggedColumn {
                column,
                len: col.len(),
                expected: num_rows,
            });
        }

        Ok(Self {
            source_name: None,
            headers,
            columns,
            num_rows,
        })
    }

    /// Build a sheet from row-major data. Short rows are padded with empty
    /// cells; cells beyond the header width are ignored.
    pub fn from_rows(headers: Vec<ColumnHeader>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let mut columns: Vec<Vec<Cell>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or_default());
            }
        }

        let num_rows = columns.first().map_or(0, Vec::len);
        Self {
            source_name: None,
            headers,
            columns,
            num_rows,
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn headers(&self) -> &[ColumnHeader] {
        &self.headers
    }

    /// All cells of one column.
    pub fn column(&self, col: usize) -> Option<&[Cell]> {
        self.columns.get(col).map(Vec::as_slice)
    }
}

impl Sheet for RawSheet {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.headers.len()
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.columns.get(col).and_then(|c| c.get(row))
    }

    fn header(&self, col: usize) -> Option<&ColumnHeader> {
        self.headers.get(col)
    }

    fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }
}
