//! Field-set comparison between a resource's declared fields and its observed columns.
//!
//! [`compare`] is pure: the same inputs always produce a structurally identical
//! [`Diff`]. Name lookups use a `HashMap` for membership only; every output list
//! is produced by walking the ordered input slices, never the map.

use std::collections::HashMap;

use serde::Serialize;

use crate::schema::FieldType;

/// A declared column, taken from the schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    pub hidden: bool,
    /// Reserved; carried through but not enforced.
    #[serde(skip)]
    pub protect: bool,
    /// 0-based index in document order.
    pub position: usize,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType, position: usize) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: String::new(),
            hidden: false,
            protect: false,
            position,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// A column as found in the store at inspection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    pub hidden: bool,
    /// Absolute 0-based column index; only valid for the inspection that produced it.
    pub index: usize,
}

impl ObservedField {
    pub fn new(name: impl Into<String>, field_type: FieldType, index: usize) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: String::new(),
            hidden: false,
            index,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Old and new state of a field present on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldModification {
    pub name: String,
    pub old_type: FieldType,
    pub new_type: FieldType,
    pub old_format: String,
    pub new_format: String,
    pub old_hidden: bool,
    pub new_hidden: bool,
    pub description: String,
}

impl FieldModification {
    pub fn type_changed(&self) -> bool {
        !same_type_and_format(
            self.old_type,
            &self.old_format,
            self.new_type,
            &self.new_format,
        )
    }

    pub fn visibility_changed(&self) -> bool {
        self.old_hidden != self.new_hidden
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Schema order, full specs including positions.
    pub fields_to_add: Vec<FieldSpec>,
    /// Observed order.
    pub fields_to_remove: Vec<ObservedField>,
    /// Observed order.
    pub fields_to_modify: Vec<FieldModification>,
    pub reorder_needed: bool,
    /// Names present on both sides, in schema order.
    pub expected_order: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.fields_to_add.is_empty()
            && self.fields_to_remove.is_empty()
            && self.fields_to_modify.is_empty()
            && !self.reorder_needed
    }
}

/// Render a type with its format, e.g. `datetime(date)`.
pub fn describe_type(field_type: FieldType, format: &str) -> String {
    if format.is_empty() {
        field_type.to_string()
    } else {
        format!("{field_type}({format})")
    }
}

/// A datetime format of `default` means the same as no format at all.
fn normalized_format(field_type: FieldType, format: &str) -> &str {
    let trimmed = format.trim();
    if field_type == FieldType::DateTime && trimmed.eq_ignore_ascii_case("default") {
        ""
    } else {
        trimmed
    }
}

fn same_type_and_format(
    a_type: FieldType,
    a_format: &str,
    b_type: FieldType,
    b_format: &str,
) -> bool {
    a_type == b_type && normalized_format(a_type, a_format) == normalized_format(b_type, b_format)
}

pub fn compare(observed: &[ObservedField], schema: &[FieldSpec]) -> Diff {
    let mut observed_by_name: HashMap<&str, &ObservedField> =
        HashMap::with_capacity(observed.len());
    for field in observed {
        observed_by_name.entry(field.name.as_str()).or_insert(field);
    }
    let mut schema_by_name: HashMap<&str, &FieldSpec> = HashMap::with_capacity(schema.len());
    for field in schema {
        schema_by_name.entry(field.name.as_str()).or_insert(field);
    }

    let fields_to_add = schema
        .iter()
        .filter(|field| !observed_by_name.contains_key(field.name.as_str()))
        .cloned()
        .collect();

    let fields_to_remove = observed
        .iter()
        .filter(|field| !schema_by_name.contains_key(field.name.as_str()))
        .cloned()
        .collect();

    let fields_to_modify = observed
        .iter()
        .filter_map(|current| {
            schema_by_name
                .get(current.name.as_str())
                .and_then(|desired| modification(current, desired))
        })
        .collect();

    let expected_order: Vec<String> = schema
        .iter()
        .filter(|field| observed_by_name.contains_key(field.name.as_str()))
        .map(|field| field.name.clone())
        .collect();
    let current_order: Vec<&str> = observed
        .iter()
        .filter(|field| schema_by_name.contains_key(field.name.as_str()))
        .map(|field| field.name.as_str())
        .collect();
    let reorder_needed = !expected_order
        .iter()
        .map(String::as_str)
        .eq(current_order.iter().copied());

    Diff {
        fields_to_add,
        fields_to_remove,
        fields_to_modify,
        reorder_needed,
        expected_order,
    }
}

fn modification(current: &ObservedField, desired: &FieldSpec) -> Option<FieldModification> {
    let mut changes = Vec::new();
    if !same_type_and_format(
        current.field_type,
        &current.format,
        desired.field_type,
        &desired.format,
    ) {
        changes.push(format!(
            "type from {} to {}",
            describe_type(current.field_type, &current.format),
            describe_type(desired.field_type, &desired.format)
        ));
    }
    if current.hidden != desired.hidden {
        changes.push(if desired.hidden { "hide column" } else { "show column" }.to_string());
    }
    if changes.is_empty() {
        return None;
    }
    Some(FieldModification {
        name: desired.name.clone(),
        old_type: current.field_type,
        new_type: desired.field_type,
        old_format: current.format.clone(),
        new_format: desired.format.clone(),
        old_hidden: current.hidden,
        new_hidden: desired.hidden,
        description: changes.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(fields: &[(&str, FieldType)]) -> Vec<ObservedField> {
        fields
            .iter()
            .enumerate()
            .map(|(idx, (name, ty))| ObservedField::new(*name, *ty, idx))
            .collect()
    }

    fn schema(fields: &[(&str, FieldType)]) -> Vec<FieldSpec> {
        fields
            .iter()
            .enumerate()
            .map(|(idx, (name, ty))| FieldSpec::new(*name, *ty, idx))
            .collect()
    }

    #[test]
    fn identical_fields_produce_an_empty_diff() {
        let current = observed(&[("id", FieldType::Integer), ("name", FieldType::String)]);
        let desired = schema(&[("id", FieldType::Integer), ("name", FieldType::String)]);
        let diff = compare(&current, &desired);
        assert!(diff.is_empty());
        assert_eq!(diff.expected_order, vec!["id", "name"]);
    }

    #[test]
    fn type_and_visibility_changes_share_one_entry() {
        let current = vec![ObservedField::new("notes", FieldType::Integer, 0)];
        let desired = vec![FieldSpec::new("notes", FieldType::String, 0).with_hidden(true)];
        let diff = compare(&current, &desired);
        assert_eq!(diff.fields_to_modify.len(), 1);
        let modification = &diff.fields_to_modify[0];
        assert_eq!(
            modification.description,
            "type from integer to string, hide column"
        );
        assert!(modification.type_changed());
        assert!(modification.visibility_changed());
    }

    #[test]
    fn visibility_only_change_reads_show_column() {
        let current = vec![ObservedField::new("notes", FieldType::String, 0).with_hidden(true)];
        let desired = vec![FieldSpec::new("notes", FieldType::String, 0)];
        let diff = compare(&current, &desired);
        assert_eq!(diff.fields_to_modify[0].description, "show column");
        assert!(!diff.fields_to_modify[0].type_changed());
    }

    #[test]
    fn format_differences_are_type_changes() {
        let current = vec![ObservedField::new("at", FieldType::DateTime, 0).with_format("date")];
        let desired = vec![FieldSpec::new("at", FieldType::DateTime, 0).with_format("time")];
        let diff = compare(&current, &desired);
        assert_eq!(
            diff.fields_to_modify[0].description,
            "type from datetime(date) to datetime(time)"
        );
    }

    #[test]
    fn default_datetime_format_matches_unset() {
        let current = vec![ObservedField::new("at", FieldType::DateTime, 0)];
        let desired = vec![FieldSpec::new("at", FieldType::DateTime, 0).with_format("default")];
        assert!(compare(&current, &desired).is_empty());
    }

    #[test]
    fn pending_adds_and_removes_do_not_trigger_reorder() {
        let current = observed(&[
            ("legacy", FieldType::String),
            ("id", FieldType::Integer),
            ("name", FieldType::String),
        ]);
        let desired = schema(&[
            ("email", FieldType::String),
            ("id", FieldType::Integer),
            ("name", FieldType::String),
        ]);
        let diff = compare(&current, &desired);
        assert!(!diff.reorder_needed);
        assert_eq!(diff.fields_to_add[0].name, "email");
        assert_eq!(diff.fields_to_remove[0].name, "legacy");
    }
}
