//! Executes a [`Plan`] against a store.
//!
//! Changes are applied one at a time in plan order. A failing change is
//! recorded against its path and processing moves on to the next one; already
//! applied changes are never rolled back. Removing a field only clears its
//! header cell, so the column and its data stay in place. Type and format
//! modifications are reported but never applied, and reorders are advisory.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    diff::{FieldModification, FieldSpec, ObservedField},
    error::{ApplyError, MigrateError, Result},
    locator::column_letter,
    plan::{Change, ChangeKind, ChangeType, Plan},
    schema::{Resource, SchemaDocument},
    store::{SheetRef, SheetStore},
};

/// Cooperative cancellation shared between the caller and an [`Applier`].
///
/// Clones observe the same flag. The deadline, when set, trips the token once passed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MigrateError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    /// Dry run: the change was counted but not executed.
    WouldApply,
    Skipped(String),
    Failed(ApplyError),
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOutcome::Applied => f.write_str("applied"),
            ChangeOutcome::WouldApply => f.write_str("would apply"),
            ChangeOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            ChangeOutcome::Failed(err) => write!(f, "failed: {}", err.source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub path: String,
    pub change_type: ChangeType,
    pub outcome: ChangeOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    DryRun,
    Succeeded,
    PartiallyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub resource: String,
    pub status: ResourceStatus,
    /// The resource did not exist and was (or, in a dry run, would be) created.
    pub created_resource: bool,
    pub changes: Vec<ChangeReport>,
    pub message: String,
}

impl ApplyReport {
    pub fn applied(&self) -> usize {
        self.count(|outcome| matches!(outcome, ChangeOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ChangeOutcome::Skipped(_)))
    }

    pub fn would_apply(&self) -> usize {
        self.count(|outcome| matches!(outcome, ChangeOutcome::WouldApply))
    }

    pub fn errors(&self) -> impl Iterator<Item = &ApplyError> {
        self.changes.iter().filter_map(|change| match &change.outcome {
            ChangeOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status != ResourceStatus::PartiallyFailed
    }

    fn count(&self, predicate: impl Fn(&ChangeOutcome) -> bool) -> usize {
        self.changes
            .iter()
            .filter(|change| predicate(&change.outcome))
            .count()
    }

    fn finish(
        resource: &str,
        dry_run: bool,
        created_resource: bool,
        changes: Vec<ChangeReport>,
    ) -> Self {
        let mut report = ApplyReport {
            resource: resource.to_string(),
            status: ResourceStatus::Succeeded,
            created_resource,
            changes,
            message: String::new(),
        };
        let failed = report.errors().count();
        report.status = if failed > 0 {
            ResourceStatus::PartiallyFailed
        } else if dry_run {
            ResourceStatus::DryRun
        } else {
            ResourceStatus::Succeeded
        };
        report.message = if report.changes.is_empty() {
            "No changes to apply".to_string()
        } else if dry_run && failed > 0 {
            format!(
                "DRY RUN: Would apply {} changes with {failed} errors",
                report.would_apply()
            )
        } else if dry_run {
            format!("DRY RUN: Would apply {} changes", report.would_apply())
        } else if failed > 0 {
            format!("Applied {} changes with {failed} errors", report.applied())
        } else if report.skipped() > 0 {
            format!(
                "Successfully applied {} changes ({} skipped)",
                report.applied(),
                report.skipped()
            )
        } else {
            format!("Successfully applied {} changes", report.applied())
        };
        report
    }
}

/// Column index at which `field` should be inserted so that it lands before the
/// next schema field already present in `headers`, or at the end when none is.
///
/// `None` when `field` is not part of `schema_order`.
pub fn insertion_index(schema_order: &[String], headers: &[String], field: &str) -> Option<usize> {
    let position = schema_order.iter().position(|name| name == field)?;
    let anchor = schema_order[position + 1..].iter().find_map(|later| {
        headers
            .iter()
            .position(|header| header.trim() == later.as_str())
    });
    Some(anchor.unwrap_or(headers.len()))
}

pub struct Applier<'a, S: SheetStore + ?Sized> {
    store: &'a mut S,
    dry_run: bool,
    cancel: CancelToken,
}

impl<'a, S: SheetStore + ?Sized> Applier<'a, S> {
    pub fn new(store: &'a mut S, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply every plan to the resource of the same name.
    pub fn apply_all(
        &mut self,
        document: &SchemaDocument,
        plans: &[Plan],
    ) -> Result<Vec<ApplyReport>> {
        plans
            .iter()
            .map(|plan| {
                let resource = document.resource(&plan.resource).ok_or_else(|| {
                    MigrateError::lookup(format!(
                        "resource '{}' is not declared in the schema",
                        plan.resource
                    ))
                })?;
                self.apply(resource, plan)
            })
            .collect()
    }

    pub fn apply(&mut self, resource: &Resource, plan: &Plan) -> Result<ApplyReport> {
        if plan.resource != resource.name {
            return Err(MigrateError::lookup(format!(
                "plan for '{}' cannot be applied to resource '{}'",
                plan.resource, resource.name
            )));
        }
        let store_id = resource.store_id()?;
        let sheet = SheetRef::new(&store_id, &resource.name);

        if !plan.has_changes {
            info!("Resource '{}' has no changes to apply", resource.name);
            return Ok(ApplyReport::finish(&resource.name, self.dry_run, false, Vec::new()));
        }

        if self.dry_run {
            return Ok(self.preview(sheet, resource, plan));
        }

        let (created, setup_error) = match self.ensure_resource(sheet) {
            Ok(created) => (created, None),
            Err(err) => (false, Some(err)),
        };

        let mut changes = Vec::with_capacity(plan.changes.len());
        for change in &plan.changes {
            let result = match &setup_error {
                Some(err) => Err(err.clone()),
                None => change
                    .validate_path(&resource.name)
                    .and_then(|()| self.apply_change(sheet, resource, change)),
            };
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("Failed to apply {}: {err}", change.path);
                    ChangeOutcome::Failed(ApplyError::new(change.path.clone(), err))
                }
            };
            changes.push(report(change, outcome));
        }

        let report = ApplyReport::finish(&resource.name, false, created, changes);
        info!("{}: {}", resource.name, report.message);
        Ok(report)
    }

    /// Dry run: report what would happen without touching the store. A resource
    /// whose existence cannot be checked fails its own changes only.
    fn preview(&self, sheet: SheetRef<'_>, resource: &Resource, plan: &Plan) -> ApplyReport {
        let (missing, check_error) = match self.store.resource_exists(sheet) {
            Ok(exists) => (!exists, None),
            Err(err) => {
                let context = format!("checking resource '{}'", resource.name);
                let err = MigrateError::store(context)(err);
                warn!("DRY RUN: {err}");
                (false, Some(err))
            }
        };
        if missing {
            info!("DRY RUN: resource '{}' would be created", resource.name);
        }
        let changes = plan
            .changes
            .iter()
            .map(|change| match &check_error {
                Some(err) => report(
                    change,
                    ChangeOutcome::Failed(ApplyError::new(change.path.clone(), err.clone())),
                ),
                None => {
                    info!(
                        "DRY RUN: {} {}: {}",
                        change.change_type(),
                        change.path,
                        change.description
                    );
                    report(change, ChangeOutcome::WouldApply)
                }
            })
            .collect();
        ApplyReport::finish(&resource.name, true, missing, changes)
    }

    fn ensure_resource(&mut self, sheet: SheetRef<'_>) -> Result<bool> {
        self.cancel.check()?;
        let exists = self
            .store
            .resource_exists(sheet)
            .map_err(MigrateError::store(format!("checking resource '{}'", sheet.resource)))?;
        if exists {
            return Ok(false);
        }
        self.cancel.check()?;
        self.store
            .create_resource(sheet)
            .map_err(MigrateError::store(format!("creating resource '{}'", sheet.resource)))?;
        info!("Created resource '{}' in '{}'", sheet.resource, sheet.store_id);
        Ok(true)
    }

    fn apply_change(
        &mut self,
        sheet: SheetRef<'_>,
        resource: &Resource,
        change: &Change,
    ) -> Result<ChangeOutcome> {
        self.cancel.check()?;
        match &change.kind {
            ChangeKind::Add { field } => self.add_field(sheet, resource, field),
            ChangeKind::Remove { field } => self.remove_field(sheet, resource, field),
            ChangeKind::Modify { modification } => self.modify_field(sheet, resource, modification),
            ChangeKind::Reorder { order } => {
                warn!(
                    "Reordering '{}' to [{}] must be done by hand",
                    resource.name,
                    order.join(", ")
                );
                Ok(ChangeOutcome::Skipped("reordering is report-only".to_string()))
            }
        }
    }

    fn add_field(
        &mut self,
        sheet: SheetRef<'_>,
        resource: &Resource,
        field: &FieldSpec,
    ) -> Result<ChangeOutcome> {
        let offset = resource.column_offset();
        let headers = self.headers(sheet, resource)?;
        let table = headers.get(offset..).unwrap_or(&[]);
        if table.iter().any(|header| header.trim() == field.name) {
            return Err(MigrateError::lookup(format!(
                "field '{}' already exists",
                field.name
            )));
        }

        let schema_order = resource.field_names();
        let relative = insertion_index(&schema_order, table, &field.name).ok_or_else(|| {
            MigrateError::lookup(format!(
                "field '{}' is not declared for resource '{}'",
                field.name, resource.name
            ))
        })?;
        let index = offset + relative;
        let column = column_letter(index);

        if relative < table.len() {
            self.cancel.check()?;
            self.store
                .insert_column_before(sheet, index)
                .map_err(MigrateError::store(format!("inserting column {column}")))?;
            debug!("Inserted blank column {column} in '{}'", resource.name);
        }

        self.cancel.check()?;
        self.store
            .write_header_cell(sheet, &column, resource.header_row, &field.name)
            .map_err(MigrateError::store(format!(
                "writing header '{}' to column {column}",
                field.name
            )))?;

        if field.hidden {
            self.cancel.check()?;
            self.store
                .set_column_hidden(sheet, index, true)
                .map_err(MigrateError::store(format!("hiding column {column}")))?;
        }

        info!("Added field '{}' to column {column}", field.name);
        Ok(ChangeOutcome::Applied)
    }

    fn remove_field(
        &mut self,
        sheet: SheetRef<'_>,
        resource: &Resource,
        field: &ObservedField,
    ) -> Result<ChangeOutcome> {
        let index = self.locate(sheet, resource, &field.name)?;
        let column = column_letter(index);
        self.cancel.check()?;
        self.store
            .clear_header_cell(sheet, &column, resource.header_row)
            .map_err(MigrateError::store(format!("clearing header in column {column}")))?;
        info!(
            "Cleared header for field '{}' in column {column} (data preserved)",
            field.name
        );
        Ok(ChangeOutcome::Applied)
    }

    fn modify_field(
        &mut self,
        sheet: SheetRef<'_>,
        resource: &Resource,
        modification: &FieldModification,
    ) -> Result<ChangeOutcome> {
        if modification.type_changed() {
            warn!(
                "Field '{}' needs {}; existing data is left untouched",
                modification.name, modification.description
            );
        }
        if !modification.visibility_changed() {
            return Ok(ChangeOutcome::Skipped(
                "type and format changes are not applied automatically".to_string(),
            ));
        }

        let index = self.locate(sheet, resource, &modification.name)?;
        let column = column_letter(index);
        self.cancel.check()?;
        self.store
            .set_column_hidden(sheet, index, modification.new_hidden)
            .map_err(MigrateError::store(format!("changing visibility of column {column}")))?;
        info!(
            "{} column {column} for field '{}'",
            if modification.new_hidden { "Hid" } else { "Showed" },
            modification.name
        );
        Ok(ChangeOutcome::Applied)
    }

    fn headers(&mut self, sheet: SheetRef<'_>, resource: &Resource) -> Result<Vec<String>> {
        self.cancel.check()?;
        self.store
            .get_headers(sheet, resource.header_row)
            .map_err(MigrateError::store(format!("reading headers of '{}'", resource.name)))
    }

    /// Current absolute column of a named field, read fresh from the store.
    fn locate(&mut self, sheet: SheetRef<'_>, resource: &Resource, name: &str) -> Result<usize> {
        let offset = resource.column_offset();
        let headers = self.headers(sheet, resource)?;
        headers
            .iter()
            .enumerate()
            .skip(offset)
            .find(|(_, header)| header.trim() == name)
            .map(|(index, _)| index)
            .ok_or_else(|| MigrateError::lookup(format!("field '{name}' not found in headers")))
    }
}

fn report(change: &Change, outcome: ChangeOutcome) -> ChangeReport {
    ChangeReport {
        path: change.path.clone(),
        change_type: change.change_type(),
        outcome,
    }
}
