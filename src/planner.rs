use log::{info, warn};

use crate::{
    diff::compare,
    error::Result,
    inspect::inspect_resource,
    plan::{Plan, build_resource_plan},
    schema::{Resource, SchemaDocument},
    store::{SheetRef, SheetStore},
};

/// Inspects resources and turns their differences from the schema into plans.
pub struct Planner<'a, S: SheetStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SheetStore + ?Sized> Planner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Plan one resource. A resource that cannot be read is treated as having no
    /// columns, so its plan adds every declared field.
    pub fn plan_resource(&self, resource: &Resource) -> Result<Plan> {
        let store_id = resource.store_id()?;
        let sheet = SheetRef::new(&store_id, &resource.name);
        let observed = inspect_resource(
            self.store,
            sheet,
            resource.header_row,
            resource.header_column,
        )
        .unwrap_or_else(|err| {
            warn!(
                "Cannot inspect resource '{}' in '{store_id}': {err}; using an empty sheet",
                resource.name
            );
            Vec::new()
        });
        let diff = compare(&observed, &resource.field_specs());
        let plan = build_resource_plan(&diff, resource);
        info!("{}", plan.summary);
        Ok(plan)
    }

    /// Plans for every resource, in document order.
    pub fn plan_all(&self, document: &SchemaDocument) -> Result<Vec<Plan>> {
        document
            .resources
            .iter()
            .map(|resource| self.plan_resource(resource))
            .collect()
    }
}
