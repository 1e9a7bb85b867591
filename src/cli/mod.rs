pub mod categorize;
pub mod export;
pub mod import;
pub mod logging;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "gobbler",
    version,
    about = "Import bank and card CSV exports into a local SQLite store, categorize them and export the result."
)]
pub struct Cli {
    /// CSV files or directories of CSV files to import
    #[arg(value_name = "REPORTS")]
    pub reports: Vec<PathBuf>,

    /// Configuration file (default: ./config.json, then ~/.config/gobbler/config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Debug-level console logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Save all transactions to this CSV file
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Save all transactions and categories to this JS file
    #[arg(short = 'j', long = "savetojs", value_name = "PATH")]
    pub savetojs: Option<PathBuf>,

    /// Recategorize every stored transaction, not just uncategorized ones
    #[arg(long)]
    pub recategorize: bool,

    /// Append-only log file
    #[arg(long, value_name = "PATH", default_value = "gobbler.log")]
    pub log_file: PathBuf,
}
