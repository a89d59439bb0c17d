use serde::{Deserialize, Serialize};

use super::StoreError;

/// Presentation state kept per column alongside the cell values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Rectangular cell grid backing a single resource.
///
/// Every row is padded to the grid width, so column operations never have to
/// reason about ragged rows. Empty strings represent blank cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    layout: Vec<ColumnLayout>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let mut grid = Grid {
            rows,
            layout: Vec::new(),
        };
        grid.normalize();
        grid
    }

    pub fn with_layout(mut self, layout: Vec<ColumnLayout>) -> Self {
        self.layout = layout;
        self.normalize();
        self
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn layout(&self) -> &[ColumnLayout] {
        &self.layout
    }

    /// Cells of a 1-based row; empty when the row lies outside the grid.
    pub fn row(&self, row: usize) -> Vec<String> {
        row.checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
            .cloned()
            .unwrap_or_default()
    }

    pub fn column_values(&self, index: usize, start_row: usize) -> Vec<Option<String>> {
        let skip = start_row.saturating_sub(1);
        self.rows
            .iter()
            .skip(skip)
            .map(|row| {
                row.get(index)
                    .filter(|value| !value.is_empty())
                    .cloned()
            })
            .collect()
    }

    pub fn set_cell(&mut self, index: usize, row: usize, value: &str) -> Result<(), StoreError> {
        let row_idx = row
            .checked_sub(1)
            .ok_or_else(|| StoreError::InvalidReference(format!("row {row}")))?;
        while self.rows.len() <= row_idx {
            self.rows.push(Vec::new());
        }
        if self.rows[row_idx].len() <= index {
            self.rows[row_idx].resize(index + 1, String::new());
        }
        self.rows[row_idx][index] = value.to_string();
        self.normalize();
        Ok(())
    }

    pub fn insert_column(&mut self, index: usize) -> Result<(), StoreError> {
        let width = self.width();
        if index > width {
            return Err(StoreError::InvalidReference(format!(
                "cannot insert column at {index}; grid has {width} column(s)"
            )));
        }
        for row in &mut self.rows {
            row.insert(index, String::new());
        }
        if index <= self.layout.len() {
            self.layout.insert(index, ColumnLayout::default());
        }
        self.normalize();
        Ok(())
    }

    pub fn delete_column(&mut self, index: usize) -> Result<(), StoreError> {
        let width = self.width();
        if index >= width {
            return Err(StoreError::InvalidReference(format!(
                "cannot delete column {index}; grid has {width} column(s)"
            )));
        }
        for row in &mut self.rows {
            row.remove(index);
        }
        if index < self.layout.len() {
            self.layout.remove(index);
        }
        Ok(())
    }

    pub fn column_layout(&self, index: usize) -> Option<&ColumnLayout> {
        self.layout.get(index)
    }

    pub fn column_layout_mut(&mut self, index: usize) -> &mut ColumnLayout {
        if self.layout.len() <= index {
            self.layout.resize(index + 1, ColumnLayout::default());
        }
        &mut self.layout[index]
    }

    pub fn hidden_flags(&self) -> Vec<bool> {
        self.layout.iter().map(|column| column.hidden).collect()
    }

    fn normalize(&mut self) {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        while self.layout.last().is_some_and(|column| *column == ColumnLayout::default()) {
            self.layout.pop();
        }
    }
}
