use std::fs;

use anyhow::{Context, Result, bail};
use log::info;

use crate::{cli::InitArgs, schema::default_template};

pub fn execute(args: &InitArgs) -> Result<()> {
    if args.schema.exists() && !args.force {
        bail!(
            "{:?} already exists; pass --force to overwrite it",
            args.schema
        );
    }
    if let Some(parent) = args.schema.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Creating directory {parent:?}"))?;
    }
    fs::write(&args.schema, default_template())
        .with_context(|| format!("Writing schema template to {:?}", args.schema))?;
    info!("Schema template written to {:?}", args.schema);
    Ok(())
}
