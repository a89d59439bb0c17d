//! Store abstraction
//!
//! [`SheetStore`] is the narrow contract the engine needs from a spreadsheet-like
//! backend. Implementations:
//! - [`MemoryStore`]: in-process grids, used for dry runs and tests
//! - [`WorkbookStore`]: a directory of CSV files with YAML layout sidecars
//!
//! Columns are addressed with A1 letters (`A`, `B`, ... `AA`), rows are 1-based.
//! All calls are synchronous and treated as all-or-nothing by the caller.

pub mod grid;
pub mod memory;
pub mod workbook;

pub use grid::{ColumnLayout, Grid};
pub use memory::MemoryStore;
pub use workbook::WorkbookStore;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("invalid cell reference: {0}")]
    InvalidReference(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("operation not supported: {0}")]
    Unsupported(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Identifies one resource (sheet/tab) inside one store (spreadsheet/workbook).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRef<'a> {
    pub store_id: &'a str,
    pub resource: &'a str,
}

impl<'a> SheetRef<'a> {
    pub fn new(store_id: &'a str, resource: &'a str) -> Self {
        Self { store_id, resource }
    }
}

/// Operations the planner and apply orchestrator issue against a backend.
pub trait SheetStore {
    /// Read the header row. Trailing empty cells inside the used range are kept so that
    /// appends never land on a column whose header was cleared.
    fn get_headers(
        &self,
        sheet: SheetRef<'_>,
        header_row: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Read one column from `start_row` to the end of the used range. Empty cells are `None`.
    fn get_column_samples(
        &self,
        sheet: SheetRef<'_>,
        column: &str,
        start_row: usize,
    ) -> Result<Vec<Option<String>>, StoreError>;

    /// Number-format pattern applied to a column, if the backend tracks one.
    fn column_format(
        &self,
        _sheet: SheetRef<'_>,
        _index: usize,
    ) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    /// Hidden flag per column, indexed from column A. Missing entries mean visible.
    fn hidden_columns(&self, _sheet: SheetRef<'_>) -> Result<Vec<bool>, StoreError> {
        Ok(Vec::new())
    }

    /// Insert a blank column so that the new column ends up at `index`, shifting the rest right.
    fn insert_column_before(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
    ) -> Result<(), StoreError>;

    fn write_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
        value: &str,
    ) -> Result<(), StoreError>;

    fn clear_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
    ) -> Result<(), StoreError>;

    fn set_column_hidden(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
        _hidden: bool,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unsupported(format!(
            "changing visibility of column {index} in '{}'",
            sheet.resource
        )))
    }

    /// Physically delete a column and its data. Never invoked by the apply orchestrator.
    fn delete_column(&mut self, sheet: SheetRef<'_>, index: usize) -> Result<(), StoreError>;

    fn resource_exists(&self, sheet: SheetRef<'_>) -> Result<bool, StoreError>;

    fn create_resource(&mut self, sheet: SheetRef<'_>) -> Result<(), StoreError>;
}
