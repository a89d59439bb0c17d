use anyhow::{Context, Result};
use log::info;

use crate::{cli::PlanArgs, load_schema, open_workbook, planner::Planner};

pub fn execute(args: &PlanArgs) -> Result<()> {
    let document = load_schema(&args.schema)?;
    let store = open_workbook(&args.store);
    info!(
        "Planning {} resource(s) against workbook root {:?}",
        document.resources.len(),
        store.root()
    );
    let plans = Planner::new(&store)
        .plan_all(&document)
        .context("Generating migration plan")?;

    if args.json {
        let json = serde_json::to_string_pretty(&plans).context("Serializing plans to JSON")?;
        println!("{json}");
        return Ok(());
    }

    for plan in &plans {
        println!("{}", plan.render());
    }
    if plans.iter().any(|plan| plan.has_changes) {
        println!("\nRun 'sheet-migrate apply' to apply these changes.");
    } else {
        println!("\nAll resources are up to date with the schema.");
    }
    Ok(())
}
