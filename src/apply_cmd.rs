use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    apply::{Applier, ApplyReport, CancelToken, ResourceStatus},
    cli::ApplyArgs,
    load_schema, open_workbook,
    planner::Planner,
};

pub fn execute(args: &ApplyArgs) -> Result<()> {
    let document = load_schema(&args.schema)?;
    let mut store = open_workbook(&args.store);

    let plans = Planner::new(&store)
        .plan_all(&document)
        .context("Generating migration plan")?;
    if !plans.iter().any(|plan| plan.has_changes) {
        println!("All resources are already up to date with the schema.");
        return Ok(());
    }
    for plan in plans.iter().filter(|plan| plan.has_changes) {
        println!("{}", plan.render());
    }

    if args.dry_run {
        println!("=== DRY RUN MODE ===");
        println!("No changes will be written to the workbook.");
    } else if !args.yes {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        if !confirm(&mut stdin.lock(), &mut stdout)? {
            println!("Apply cancelled.");
            return Ok(());
        }
    }

    let mut cancel = CancelToken::new();
    if let Some(secs) = args.timeout_secs {
        cancel = cancel.with_timeout(Duration::from_secs(secs));
    }
    info!("Applying changes to workbook root {:?}", store.root());
    let reports = Applier::new(&mut store, args.dry_run)
        .with_cancel(cancel)
        .apply_all(&document, &plans)
        .context("Applying migration plan")?;

    print_reports(&reports, args.dry_run);
    if reports
        .iter()
        .any(|report| report.status == ResourceStatus::PartiallyFailed)
    {
        bail!("some changes failed to apply");
    }
    Ok(())
}

/// Ask for a yes/no answer; anything but `y` or `yes` declines.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "\nDo you want to apply these changes? [y/N]: ")?;
    output.flush()?;
    let mut response = String::new();
    input
        .read_line(&mut response)
        .context("Reading confirmation")?;
    let response = response.trim().to_ascii_lowercase();
    Ok(response == "y" || response == "yes")
}

fn print_reports(reports: &[ApplyReport], dry_run: bool) {
    let mut applied = 0;
    let mut would_apply = 0;
    let mut errors = 0;
    for report in reports {
        let marker = match report.status {
            ResourceStatus::PartiallyFailed => "✗",
            _ if report.changes.is_empty() => "-",
            _ => "✓",
        };
        println!("{marker} {}: {}", report.resource, report.message);
        if report.created_resource {
            let verb = if dry_run {
                "would be created"
            } else {
                "created"
            };
            println!("  Resource {verb}");
        }
        for err in report.errors() {
            println!("  Error: {err}");
        }
        applied += report.applied();
        would_apply += report.would_apply();
        errors += report.errors().count();
    }

    println!("\n=== Summary ===");
    if dry_run && errors > 0 {
        println!("DRY RUN completed. Would apply {would_apply} changes, {errors} errors.");
    } else if dry_run {
        println!("DRY RUN completed. Would apply {would_apply} changes.");
    } else if errors > 0 {
        println!("Applied {applied} changes with {errors} errors.");
    } else {
        println!("Successfully applied {applied} changes.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_accepts_only_yes() {
        let answers = [
            ("y\n", true),
            ("YES\n", true),
            ("n\n", false),
            ("\n", false),
            ("", false),
        ];
        for (answer, expected) in answers {
            let mut input = answer.as_bytes();
            let mut output = Vec::new();
            assert_eq!(confirm(&mut input, &mut output).unwrap(), expected, "{answer:?}");
            assert!(String::from_utf8(output).unwrap().contains("[y/N]"));
        }
    }
}
