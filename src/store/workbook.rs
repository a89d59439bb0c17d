//! CSV workbook store.
//!
//! A workbook is a directory under the store root named after the store id. Each
//! resource is a `<resource>.csv` file holding every row (header row included) and
//! an optional `<resource>.layout.yml` sidecar with per-column `hidden` and `format`
//! entries. Every mutation loads the sheet, edits it, and writes it back.
//!
//! The most recently read sheet stays parsed in memory and is reused while
//! neither of its files changes size or modification time, so inspecting a
//! resource column by column parses the CSV once.

use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{ColumnLayout, Grid, SheetRef, SheetStore, StoreError, memory::resolve_column};
use crate::io_utils;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LayoutFile {
    #[serde(default)]
    columns: Vec<ColumnLayout>,
}

/// Size and modification time of one file; `None` when it is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp(Option<(u64, Option<SystemTime>)>);

impl FileStamp {
    fn of(path: &Path) -> Self {
        Self(
            fs::metadata(path)
                .ok()
                .map(|meta| (meta.len(), meta.modified().ok())),
        )
    }
}

#[derive(Debug, Clone)]
struct CachedSheet {
    path: PathBuf,
    stamps: (FileStamp, FileStamp),
    grid: Grid,
}

#[derive(Debug, Clone)]
pub struct WorkbookStore {
    root: PathBuf,
    delimiter: u8,
    cache: RefCell<Option<CachedSheet>>,
    #[cfg(test)]
    parses: std::cell::Cell<usize>,
}

impl WorkbookStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            cache: RefCell::new(None),
            #[cfg(test)]
            parses: std::cell::Cell::new(0),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self.cache.get_mut().take();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sheet_path(&self, sheet: SheetRef<'_>) -> Result<PathBuf, StoreError> {
        Ok(self
            .workbook_dir(sheet)?
            .join(format!("{}.csv", checked_component(sheet.resource)?)))
    }

    fn layout_path(&self, sheet: SheetRef<'_>) -> Result<PathBuf, StoreError> {
        Ok(self
            .workbook_dir(sheet)?
            .join(format!("{}.layout.yml", checked_component(sheet.resource)?)))
    }

    fn workbook_dir(&self, sheet: SheetRef<'_>) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(checked_component(sheet.store_id)?))
    }

    fn stamps(&self, sheet: SheetRef<'_>) -> Result<(PathBuf, (FileStamp, FileStamp)), StoreError> {
        let path = self.sheet_path(sheet)?;
        let stamps = (FileStamp::of(&path), FileStamp::of(&self.layout_path(sheet)?));
        Ok((path, stamps))
    }

    /// Run `view` over the sheet, parsing it only when the cached copy is stale.
    fn read<T>(&self, sheet: SheetRef<'_>, view: impl FnOnce(&Grid) -> T) -> Result<T, StoreError> {
        let (path, stamps) = self.stamps(sheet)?;
        {
            let cache = self.cache.borrow();
            if let Some(cached) = cache
                .as_ref()
                .filter(|cached| cached.path == path && cached.stamps == stamps)
            {
                return Ok(view(&cached.grid));
            }
        }
        let grid = self.load(sheet)?;
        let result = view(&grid);
        *self.cache.borrow_mut() = Some(CachedSheet { path, stamps, grid });
        Ok(result)
    }

    fn load(&self, sheet: SheetRef<'_>) -> Result<Grid, StoreError> {
        let path = self.sheet_path(sheet)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(sheet.resource.to_string()));
        }
        let rows = io_utils::read_csv_rows(&path, self.delimiter).map_err(io_error)?;
        let layout_path = self.layout_path(sheet)?;
        let layout = if layout_path.is_file() {
            io_utils::load_yaml::<LayoutFile>(&layout_path)
                .map_err(io_error)?
                .columns
        } else {
            Vec::new()
        };
        #[cfg(test)]
        self.parses.set(self.parses.get() + 1);
        debug!("Loaded {} row(s) from {:?}", rows.len(), path);
        Ok(Grid::from_rows(rows).with_layout(layout))
    }

    fn save(&self, sheet: SheetRef<'_>, grid: &Grid) -> Result<(), StoreError> {
        let path = self.sheet_path(sheet)?;
        let rows: &[Vec<String>] = if grid.width() == 0 { &[] } else { grid.rows() };
        io_utils::write_csv_rows(&path, rows, self.delimiter).map_err(io_error)?;

        let layout_path = self.layout_path(sheet)?;
        if grid.layout().iter().all(|column| *column == ColumnLayout::default()) {
            if layout_path.is_file() {
                fs::remove_file(&layout_path).map_err(|err| StoreError::Io(err.to_string()))?;
            }
        } else {
            let layout = LayoutFile {
                columns: grid.layout().to_vec(),
            };
            io_utils::save_yaml(&layout_path, &layout).map_err(io_error)?;
        }
        Ok(())
    }

    fn update<F>(&self, sheet: SheetRef<'_>, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Grid) -> Result<(), StoreError>,
    {
        let mut grid = self.read(sheet, Grid::clone)?;
        edit(&mut grid)?;
        self.cache.borrow_mut().take();
        self.save(sheet, &grid)
    }
}

fn io_error(err: anyhow::Error) -> StoreError {
    StoreError::Io(format!("{err:#}"))
}

fn checked_component(name: &str) -> Result<&str, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(|c: char| c == '/' || c == '\\')
    {
        return Err(StoreError::Backend(format!(
            "'{name}' cannot be used as a workbook path component"
        )));
    }
    Ok(trimmed)
}

impl SheetStore for WorkbookStore {
    fn get_headers(
        &self,
        sheet: SheetRef<'_>,
        header_row: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.read(sheet, |grid| grid.row(header_row))
    }

    fn get_column_samples(
        &self,
        sheet: SheetRef<'_>,
        column: &str,
        start_row: usize,
    ) -> Result<Vec<Option<String>>, StoreError> {
        let index = resolve_column(column)?;
        self.read(sheet, |grid| grid.column_values(index, start_row))
    }

    fn column_format(
        &self,
        sheet: SheetRef<'_>,
        index: usize,
    ) -> Result<Option<String>, StoreError> {
        self.read(sheet, |grid| {
            grid.column_layout(index)
                .and_then(|layout| layout.format.clone())
        })
    }

    fn hidden_columns(&self, sheet: SheetRef<'_>) -> Result<Vec<bool>, StoreError> {
        self.read(sheet, Grid::hidden_flags)
    }

    fn insert_column_before(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
    ) -> Result<(), StoreError> {
        self.update(sheet, |grid| grid.insert_column(index))
    }

    fn write_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        let index = resolve_column(column)?;
        self.update(sheet, |grid| grid.set_cell(index, row, value))
    }

    fn clear_header_cell(
        &mut self,
        sheet: SheetRef<'_>,
        column: &str,
        row: usize,
    ) -> Result<(), StoreError> {
        let index = resolve_column(column)?;
        self.update(sheet, |grid| grid.set_cell(index, row, ""))
    }

    fn set_column_hidden(
        &mut self,
        sheet: SheetRef<'_>,
        index: usize,
        hidden: bool,
    ) -> Result<(), StoreError> {
        self.update(sheet, |grid| {
            grid.column_layout_mut(index).hidden = hidden;
            Ok(())
        })
    }

    fn delete_column(&mut self, sheet: SheetRef<'_>, index: usize) -> Result<(), StoreError> {
        self.update(sheet, |grid| grid.delete_column(index))
    }

    fn resource_exists(&self, sheet: SheetRef<'_>) -> Result<bool, StoreError> {
        Ok(self.sheet_path(sheet)?.is_file())
    }

    fn create_resource(&mut self, sheet: SheetRef<'_>) -> Result<(), StoreError> {
        let dir = self.workbook_dir(sheet)?;
        fs::create_dir_all(&dir).map_err(|err| StoreError::Io(format!("{dir:?}: {err}")))?;
        let path = self.sheet_path(sheet)?;
        if !path.exists() {
            fs::File::create(&path).map_err(|err| StoreError::Io(format!("{path:?}: {err}")))?;
        }
        Ok(())
    }
}
