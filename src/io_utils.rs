//! File I/O helpers for the CSV workbook store.
//!
//! Workbook sheets are plain CSV without a reserved header line: the header row
//! is whichever row the schema document points at, so rows are read and written
//! as raw records. Layout sidecars are YAML.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn read_csv_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let file = File::open(path).with_context(|| format!("Opening sheet file {path:?}"))?;
    let mut reader = open_csv_reader(BufReader::new(file), delimiter);
    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} in {:?}", row_idx + 1, path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

pub fn write_csv_rows(path: &Path, rows: &[Vec<String>], delimiter: u8) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating sheet file {path:?}"))?;
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true)
        .flexible(true);
    let mut writer = builder.from_writer(BufWriter::new(file));
    for (row_idx, row) in rows.iter().enumerate() {
        if row.is_empty() {
            // csv refuses zero-field records; keep the line so row numbers stay stable
            writer
                .write_record([""])
                .with_context(|| format!("Writing row {} to {:?}", row_idx + 1, path))?;
            continue;
        }
        writer
            .write_record(row)
            .with_context(|| format!("Writing row {} to {:?}", row_idx + 1, path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing sheet file {path:?}"))?;
    Ok(())
}

pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Opening YAML file {path:?}"))?;
    serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing YAML file {path:?}"))
}

pub fn save_yaml<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let serialized = serde_yaml::to_string(data).context("Serializing YAML")?;
    let mut file = File::create(path).with_context(|| format!("Creating YAML file {path:?}"))?;
    file.write_all(serialized.as_bytes())?;
    file.flush()?;
    Ok(())
}
