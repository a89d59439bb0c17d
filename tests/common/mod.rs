#![allow(dead_code)]

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_migrate::apply::CancelToken;
use sheet_migrate::store::{Grid, MemoryStore, SheetRef, SheetStore, StoreError};
use tempfile::{TempDir, tempdir};

pub const STORE_ID: &str = "book";
pub const LOCATOR: &str = "https://docs.google.com/spreadsheets/d/book/edit";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a sheet of the default test workbook.
    pub fn write_sheet(&self, resource: &str, contents: &str) -> PathBuf {
        self.write(&format!("{STORE_ID}/{resource}.csv"), contents)
    }

    pub fn read_sheet(&self, resource: &str) -> String {
        fs::read_to_string(self.path().join(STORE_ID).join(format!("{resource}.csv")))
            .expect("read sheet")
    }
}

pub fn sheet(resource: &str) -> SheetRef<'_> {
    SheetRef::new(STORE_ID, resource)
}

pub fn grid(rows: &[&[&str]]) -> Grid {
    Grid::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

/// One-resource schema document over the default test workbook.
pub fn schema_yaml(resource: &str, fields: &[(&str, &str)]) -> String {
    let mut yaml =
        format!("resources:\n  - name: {resource}\n    path: {LOCATOR}\n    fields:\n");
    for (name, field_type) in fields {
        yaml.push_str(&format!("      - name: {name}\n        type: {field_type}\n"));
    }
    yaml
}

/// Header row of a memory-backed resource.
pub fn headers(store: &impl SheetStore, resource: &str) -> Vec<String> {
    store.get_headers(sheet(resource), 1).expect("headers")
}

/// Memory store wrapper that fails selected writes and can trip a cancel token.
pub struct ScriptedStore {
    pub inner: MemoryStore,
    /// Header values whose `write_header_cell` call fails.
    pub failing_headers: HashSet<String>,
    /// Resources whose `resource_exists` check fails.
    pub unreachable_resources: HashSet<String>,
    /// Trip this token after the given number of successful header writes.
    pub cancel_after_writes: Option<(usize, CancelToken)>,
    writes: usize,
}

impl ScriptedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_headers: HashSet::new(),
            unreachable_resources: HashSet::new(),
            cancel_after_writes: None,
            writes: 0,
        }
    }

    pub fn fail_header(mut self, value: &str) -> Self {
        self.failing_headers.insert(value.to_string());
        self
    }

    pub fn unreachable(mut self, resource: &str) -> Self {
        self.unreachable_resources.insert(resource.to_string());
        self
    }

    pub fn cancel_after(mut self, writes: usize, token: CancelToken) -> Self {
        self.cancel_after_writes = Some((writes, token));
        self
    }
}

impl SheetStore for ScriptedStore {
    fn get_headers(
        &self,
        sheet: SheetRef<'_>,
        header_row: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.get_headers(sheet, header_row)
    }

    fn get_column_samples(
        &self,
        sheet: SheetRef<'_>,
        column: &str,
        start_row: usize,
    ) -> Result<Vec<Option<String>>, StoreError> {
        self.inner.get_column_samples(sheet, column, start_row)
    }

    fn hidden_columns(&self, sheet: SheetRef<'_>) -> Result<Vec<bool>, StoreError> {
        self.inner.hidden_columns(sheet)
    }

    fn insert_column_before(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
    ) -> Result<(), StoreError> {
        self.inner.insert_column_before(sheet, index)
    }

    fn write_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        if self.failing_headers.contains(value) {
            return Err(StoreError::Backend(format!("quota exceeded writing {column}{row}")));
        }
        self.inner.write_header_cell(sheet, column, row, value)?;
        self.writes += 1;
        if let Some((limit, token)) = &self.cancel_after_writes {
            if self.writes >= *limit {
                token.cancel();
            }
        }
        Ok(())
    }

    fn clear_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
    ) -> Result<(), StoreError> {
        self.inner.clear_header_cell(sheet, column, row)
    }

    fn set_column_hidden(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
        hidden: bool,
    ) -> Result<(), StoreError> {
        self.inner.set_column_hidden(sheet, index, hidden)
    }

    fn delete_column(&mut self, sheet: SheetRef<'_>, index: usize) -> Result<(), StoreError> {
        self.inner.delete_column(sheet, index)
    }

    fn resource_exists(&self, sheet: SheetRef<'_>) -> Result<bool, StoreError> {
        if self.unreachable_resources.contains(sheet.resource) {
            return Err(StoreError::Backend(format!("'{}' is unreachable", sheet.resource)));
        }
        self.inner.resource_exists(sheet)
    }

    fn create_resource(&mut self, sheet: SheetRef<'_>) -> Result<(), StoreError> {
        self.inner.create_resource(sheet)
    }
}
