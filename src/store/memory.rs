use std::collections::BTreeMap;

use super::{Grid, SheetRef, SheetStore, StoreError};
use crate::locator::column_index;

/// In-process store keyed by `(store_id, resource)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: BTreeMap<(String, String), Grid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource with the given grid, replacing any previous contents.
    pub fn insert_grid(&mut self, sheet: SheetRef<'_>, grid: Grid) {
        self.sheets.insert(key(sheet), grid);
    }

    pub fn grid(&self, sheet: SheetRef<'_>) -> Option<&Grid> {
        self.sheets.get(&key(sheet))
    }

    fn grid_or_missing(&self, sheet: SheetRef<'_>) -> Result<&Grid, StoreError> {
        self.sheets
            .get(&key(sheet))
            .ok_or_else(|| StoreError::NotFound(sheet.resource.to_string()))
    }

    fn grid_mut(&mut self, sheet: SheetRef<'_>) -> Result<&mut Grid, StoreError> {
        self.sheets
            .get_mut(&key(sheet))
            .ok_or_else(|| StoreError::NotFound(sheet.resource.to_string()))
    }
}

fn key(sheet: SheetRef<'_>) -> (String, String) {
    (sheet.store_id.to_string(), sheet.resource.to_string())
}

pub(crate) fn resolve_column(column: &str) -> Result<usize, StoreError> {
    column_index(column).ok_or_else(|| StoreError::InvalidReference(column.to_string()))
}

impl SheetStore for MemoryStore {
    fn get_headers(
        &self,
        sheet: SheetRef<'_>,
        header_row: usize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.grid_or_missing(sheet)?.row(header_row))
    }

    fn get_column_samples(
        &self,
        sheet: SheetRef<'_>,
        column: &str,
        start_row: usize,
    ) -> Result<Vec<Option<String>>, StoreError> {
        let index = resolve_column(column)?;
        Ok(self.grid_or_missing(sheet)?.column_values(index, start_row))
    }

    fn column_format(
        &self,
        sheet: SheetRef<'_>,
        index: usize,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .grid_or_missing(sheet)?
            .column_layout(index)
            .and_then(|layout| layout.format.clone()))
    }

    fn hidden_columns(&self, sheet: SheetRef<'_>) -> Result<Vec<bool>, StoreError> {
        Ok(self.grid_or_missing(sheet)?.hidden_flags())
    }

    fn insert_column_before(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
    ) -> Result<(), StoreError> {
        self.grid_mut(sheet)?.insert_column(index)
    }

    fn write_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        let index = resolve_column(column)?;
        self.grid_mut(sheet)?.set_cell(index, row, value)
    }

    fn clear_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
    ) -> Result<(), StoreError> {
        let index = resolve_column(column)?;
        self.grid_mut(sheet)?.set_cell(index, row, "")
    }

    fn set_column_hidden(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
        hidden: bool,
    ) -> Result<(), StoreError> {
        self.grid_mut(sheet)?.column_layout_mut(index).hidden = hidden;
        Ok(())
    }

    fn delete_column(&mut self, sheet: SheetRef<'_>, index: usize) -> Result<(), StoreError> {
        self.grid_mut(sheet)?.delete_column(index)
    }

    fn resource_exists(&self, sheet: SheetRef<'_>) -> Result<bool, StoreError> {
        Ok(self.sheets.contains_key(&key(sheet)))
    }

    fn create_resource(&mut self, sheet: SheetRef<'_>) -> Result<(), StoreError> {
        self.sheets.entry(key(sheet)).or_default();
        Ok(())
    }
}
