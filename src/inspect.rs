//! Reads a resource's current columns out of a store.

use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    classify,
    diff::ObservedField,
    locator::column_letter,
    schema::FieldType,
    store::{SheetRef, SheetStore, StoreError},
};

/// Observe the columns of one resource.
///
/// Headers left of `header_column` belong to something else and are ignored, as
/// are empty header cells. A column keeps the first occurrence of a duplicated
/// name. Failing to read samples or formats for a column degrades its type to
/// `string`; failing to read the header row is an error.
pub fn inspect_resource<S: SheetStore + ?Sized>(
    store: &S,
    sheet: SheetRef<'_>,
    header_row: usize,
    header_column: usize,
) -> Result<Vec<ObservedField>, StoreError> {
    let offset = header_column.saturating_sub(1);
    let headers = store.get_headers(sheet, header_row)?;
    let hidden = store.hidden_columns(sheet).unwrap_or_else(|err| {
        warn!("Cannot read column visibility for '{}': {err}", sheet.resource);
        Vec::new()
    });

    let mut seen = HashSet::new();
    let mut observed = Vec::new();
    for (index, header) in headers.iter().enumerate().skip(offset) {
        let name = header.trim();
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name.to_string()) {
            warn!(
                "Duplicate header '{name}' in column {} of '{}'; keeping the first occurrence",
                column_letter(index),
                sheet.resource
            );
            continue;
        }
        let (field_type, format) = observe_type(store, sheet, index, header_row);
        debug!(
            "Observed '{name}' in column {} as {field_type}",
            column_letter(index)
        );
        observed.push(ObservedField {
            name: name.to_string(),
            field_type,
            format,
            hidden: hidden.get(index).copied().unwrap_or(false),
            index,
        });
    }
    Ok(observed)
}

fn observe_type<S: SheetStore + ?Sized>(
    store: &S,
    sheet: SheetRef<'_>,
    index: usize,
    header_row: usize,
) -> (FieldType, String) {
    let pattern = store.column_format(sheet, index).unwrap_or_else(|err| {
        debug!("No number format for column {}: {err}", column_letter(index));
        None
    });
    if let Some(pattern) = pattern.as_deref() {
        if let Some(field_type) = classify::classify_format_pattern(pattern) {
            let format = match field_type {
                FieldType::DateTime => classify::datetime_format_for_pattern(pattern)
                    .filter(|format| *format != "default")
                    .unwrap_or_default()
                    .to_string(),
                _ => String::new(),
            };
            return (field_type, format);
        }
    }

    match store.get_column_samples(sheet, &column_letter(index), header_row + 1) {
        Ok(samples) => (classify::classify_samples(&samples), String::new()),
        Err(err) => {
            warn!(
                "Cannot read samples for column {} of '{}': {err}; assuming string",
                column_letter(index),
                sheet.resource
            );
            (FieldType::String, String::new())
        }
    }
}
