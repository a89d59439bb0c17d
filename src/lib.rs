pub mod apply;
pub mod apply_cmd;
pub mod classify;
pub mod cli;
pub mod diff;
pub mod error;
pub mod init;
pub mod inspect;
pub mod io_utils;
pub mod locator;
pub mod plan;
pub mod plan_cmd;
pub mod planner;
pub mod schema;
pub mod store;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug};

use crate::{
    cli::{Cli, Commands, WorkbookArgs},
    schema::SchemaDocument,
    store::WorkbookStore,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_migrate", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => init::execute(&args),
        Commands::Plan(args) => plan_cmd::execute(&args),
        Commands::Apply(args) => apply_cmd::execute(&args),
    }
}

pub(crate) fn load_schema(path: &Path) -> Result<SchemaDocument> {
    let document =
        SchemaDocument::load(path).with_context(|| format!("Loading schema from {path:?}"))?;
    debug!(
        "Loaded {} resource(s) from {:?}",
        document.resources.len(),
        path
    );
    Ok(document)
}

pub(crate) fn open_workbook(args: &WorkbookArgs) -> WorkbookStore {
    let store = WorkbookStore::new(&args.workbook);
    match args.delimiter {
        Some(delimiter) => store.with_delimiter(delimiter),
        None => store,
    }
}
