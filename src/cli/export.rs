use std::path::Path;

use rusqlite::Connection;

use crate::categorizer::RuleSet;
use crate::error::Result;
use crate::export::{export_csv, export_js};
use crate::settings::Config;

pub fn csv(conn: &Connection, config: &Config, output: &Path) -> Result<()> {
    let rows = export_csv(conn, output, config.csv_delimiter)?;
    println!("Wrote {rows} transactions to {}", output.display());
    Ok(())
}

pub fn js(conn: &Connection, config: &Config, rules: &RuleSet, output: &Path) -> Result<()> {
    let rows = export_js(conn, rules, output, config.js_template.as_deref())?;
    println!("Wrote {rows} transactions to {}", output.display());
    Ok(())
}
