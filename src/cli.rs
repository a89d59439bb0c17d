use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile spreadsheet columns with a declarative schema",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a commented schema template
    Init(InitArgs),
    /// Show the changes needed to bring each resource in line with the schema
    Plan(PlanArgs),
    /// Apply the planned changes
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Destination schema file
    #[arg(default_value = "schema.yml")]
    pub schema: PathBuf,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Where resources live. Each store id maps to a subdirectory of CSV sheets.
#[derive(Debug, Args)]
pub struct WorkbookArgs {
    /// Root directory holding one workbook directory per store id
    #[arg(short = 'w', long = "workbook", default_value = ".")]
    pub workbook: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Schema file describing the desired columns
    pub schema: PathBuf,
    #[command(flatten)]
    pub store: WorkbookArgs,
    /// Print plans as JSON instead of the human-readable listing
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Schema file describing the desired columns
    pub schema: PathBuf,
    #[command(flatten)]
    pub store: WorkbookArgs,
    /// Report what would change without touching the workbook
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
    /// Give up on remaining changes after this many seconds
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
