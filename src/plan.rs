//! Turns a [`Diff`] into an ordered, serializable [`Plan`].

use std::{collections::HashMap, fmt};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    diff::{Diff, FieldModification, FieldSpec, ObservedField, describe_type},
    error::{MigrateError, Result},
    schema::Resource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Add,
    Remove,
    Modify,
    Reorder,
}

impl ChangeType {
    fn marker(self) -> &'static str {
        match self {
            ChangeType::Add => "+",
            ChangeType::Remove => "-",
            ChangeType::Modify => "~",
            ChangeType::Reorder => "↔",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::Add => "ADD",
            ChangeType::Remove => "REMOVE",
            ChangeType::Modify => "MODIFY",
            ChangeType::Reorder => "REORDER",
        };
        f.write_str(label)
    }
}

/// Per-variant payload. Each variant carries exactly what the orchestrator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Add { field: FieldSpec },
    Remove { field: ObservedField },
    Modify { modification: FieldModification },
    Reorder { order: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// `resource.field`, or the bare resource name for a reorder.
    pub path: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

impl Change {
    pub fn change_type(&self) -> ChangeType {
        match self.kind {
            ChangeKind::Add { .. } => ChangeType::Add,
            ChangeKind::Remove { .. } => ChangeType::Remove,
            ChangeKind::Modify { .. } => ChangeType::Modify,
            ChangeKind::Reorder { .. } => ChangeType::Reorder,
        }
    }

    /// Field the change targets; `None` for a reorder.
    pub fn field_name(&self) -> Option<&str> {
        match &self.kind {
            ChangeKind::Add { field } => Some(&field.name),
            ChangeKind::Remove { field } => Some(&field.name),
            ChangeKind::Modify { modification } => Some(&modification.name),
            ChangeKind::Reorder { .. } => None,
        }
    }

    /// Check that the path names this resource and, when present, this change's field.
    pub fn validate_path(&self, resource: &str) -> Result<()> {
        let expected = match self.field_name() {
            Some(field) => format!("{resource}.{field}"),
            None => resource.to_string(),
        };
        if self.path != expected {
            return Err(MigrateError::lookup(format!(
                "change path '{}' does not match resource '{resource}'",
                self.path
            )));
        }
        Ok(())
    }

    fn render(&self) -> String {
        format!(
            "  {} {}: {}",
            self.change_type().marker(),
            self.path,
            self.description
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub resource: String,
    pub changes: Vec<Change>,
    pub has_changes: bool,
    pub summary: String,
}

impl Plan {
    pub fn count(&self, change_type: ChangeType) -> usize {
        self.changes
            .iter()
            .filter(|change| change.change_type() == change_type)
            .count()
    }

    /// Human-readable listing used by the `plan` and `apply` commands.
    pub fn render(&self) -> String {
        if !self.has_changes {
            return format!("No changes detected. {}.", self.summary);
        }
        let mut out = String::from("=== Schema Migration Plan ===\n\n");
        out.push_str(&self.summary);
        out.push_str("\n\nChanges to be applied:\n");
        for change in &self.changes {
            out.push_str(&change.render());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

pub fn build_plan(diff: &Diff, resource: &str, canonical_order: Option<&[String]>) -> Plan {
    // Fallback order: adds by declared position, then removes, then modifies.
    let mut adds: Vec<&FieldSpec> = diff.fields_to_add.iter().collect();
    adds.sort_by_key(|field| field.position);

    let mut field_changes: Vec<Change> = Vec::with_capacity(
        diff.fields_to_add.len() + diff.fields_to_remove.len() + diff.fields_to_modify.len() + 1,
    );
    field_changes.extend(adds.into_iter().map(|field| add_change(resource, field)));
    field_changes.extend(
        diff.fields_to_remove
            .iter()
            .map(|field| remove_change(resource, field)),
    );
    field_changes.extend(
        diff.fields_to_modify
            .iter()
            .map(|modification| modify_change(resource, modification)),
    );

    let mut changes = match canonical_order {
        Some(order) => arrange_canonically(field_changes, order),
        None => field_changes,
    };

    if diff.reorder_needed {
        changes.push(Change {
            path: resource.to_string(),
            description: format!(
                "Reorder fields to match schema: {}",
                diff.expected_order.iter().join(", ")
            ),
            kind: ChangeKind::Reorder {
                order: diff.expected_order.clone(),
            },
        });
    }

    let summary = summarize(resource, diff);
    Plan {
        resource: resource.to_string(),
        has_changes: !changes.is_empty(),
        changes,
        summary,
    }
}

/// Plan a resource against its own schema order.
pub fn build_resource_plan(diff: &Diff, resource: &Resource) -> Plan {
    let order = resource.field_names();
    build_plan(diff, &resource.name, Some(&order))
}

/// Names in the canonical order come first in that order; the rest keep their fallback order.
fn arrange_canonically(changes: Vec<Change>, order: &[String]) -> Vec<Change> {
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();
    let (mut ranked, leftovers): (Vec<_>, Vec<_>) = changes.into_iter().partition(|change| {
        change
            .field_name()
            .is_some_and(|name| rank.contains_key(name))
    });
    ranked.sort_by_key(|change| change.field_name().and_then(|name| rank.get(name).copied()));
    ranked.extend(leftovers);
    ranked
}

fn add_change(resource: &str, field: &FieldSpec) -> Change {
    Change {
        path: format!("{resource}.{}", field.name),
        description: format!(
            "Add new field '{}' of type {} at position {}",
            field.name,
            describe_type(field.field_type, &field.format),
            field.position + 1
        ),
        kind: ChangeKind::Add {
            field: field.clone(),
        },
    }
}

fn remove_change(resource: &str, field: &ObservedField) -> Change {
    Change {
        path: format!("{resource}.{}", field.name),
        description: format!("Remove field '{}'", field.name),
        kind: ChangeKind::Remove {
            field: field.clone(),
        },
    }
}

fn modify_change(resource: &str, modification: &FieldModification) -> Change {
    Change {
        path: format!("{resource}.{}", modification.name),
        description: modification.description.clone(),
        kind: ChangeKind::Modify {
            modification: modification.clone(),
        },
    }
}

fn summarize(resource: &str, diff: &Diff) -> String {
    let mut parts = Vec::new();
    if !diff.fields_to_add.is_empty() {
        parts.push(format!("{} field(s) to add", diff.fields_to_add.len()));
    }
    if !diff.fields_to_remove.is_empty() {
        parts.push(format!("{} field(s) to remove", diff.fields_to_remove.len()));
    }
    if !diff.fields_to_modify.is_empty() {
        parts.push(format!("{} field(s) to modify", diff.fields_to_modify.len()));
    }
    if diff.reorder_needed {
        parts.push("fields need reordering".to_string());
    }
    if parts.is_empty() {
        format!("Resource '{resource}' is up to date")
    } else {
        format!("Resource '{resource}': {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diff::compare, schema::FieldType};

    #[test]
    fn empty_diff_is_up_to_date() {
        let plan = build_plan(&Diff::default(), "X", None);
        assert!(!plan.has_changes);
        assert!(plan.changes.is_empty());
        assert_eq!(plan.summary, "Resource 'X' is up to date");
        assert_eq!(
            plan.render(),
            "No changes detected. Resource 'X' is up to date."
        );
    }

    #[test]
    fn summary_omits_zero_counts() {
        let observed = vec![
            ObservedField::new("id", FieldType::String, 0),
            ObservedField::new("legacy", FieldType::String, 1),
        ];
        let schema = vec![FieldSpec::new("id", FieldType::Integer, 0)];
        let plan = build_plan(&compare(&observed, &schema), "users", None);
        assert_eq!(
            plan.summary,
            "Resource 'users': 1 field(s) to remove, 1 field(s) to modify"
        );
    }

    #[test]
    fn render_lists_changes_with_markers() {
        let observed = vec![ObservedField::new("legacy", FieldType::String, 0)];
        let schema = vec![FieldSpec::new("email", FieldType::String, 0)];
        let rendered = build_plan(&compare(&observed, &schema), "users", None).render();
        assert!(rendered.starts_with("=== Schema Migration Plan ===\n\n"));
        assert!(rendered.contains(
            "  + users.email: Add new field 'email' of type string at position 1\n"
        ));
        assert!(rendered.contains("  - users.legacy: Remove field 'legacy'\n"));
    }

    #[test]
    fn change_paths_are_checked_against_the_resource() {
        let change = add_change("users", &FieldSpec::new("email", FieldType::String, 0));
        assert!(change.validate_path("users").is_ok());
        assert!(matches!(
            change.validate_path("orders"),
            Err(MigrateError::Lookup(_))
        ));
    }

    #[test]
    fn changes_serialize_with_a_type_tag() {
        let change = remove_change("users", &ObservedField::new("legacy", FieldType::String, 3));
        let json = serde_json::to_value(&change).expect("serialize");
        assert_eq!(json["type"], "REMOVE");
        assert_eq!(json["path"], "users.legacy");
        assert_eq!(json["field"]["index"], 3);
    }
}
