pub mod loader;
pub mod sheet;
pub mod types;

pub use loader::{dataframe_to_sheet, LoaderConfig, LoaderError, SheetLoader, HEADER_ROWS};
pub use sheet::{ColumnSlice, RawSheet, Sheet, SheetError};
pub use types::{parse_date, parse_date_with, Cell, ColumnHeader, DateOrder, DurationTier, Periodicity};
