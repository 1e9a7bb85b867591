use rusqlite::Connection;

use crate::categorizer::{categorize_transactions, CategorizeResult, RuleSet};
use crate::error::Result;
use crate::settings::Config;

pub fn run(
    conn: &Connection,
    config: &Config,
    rules: &RuleSet,
    force_all: bool,
) -> Result<CategorizeResult> {
    let result = categorize_transactions(conn, rules, &config.unmatched_category, force_all)?;
    println!(
        "{} examined, {} categorized, {} {}",
        result.examined, result.updated, result.unmatched, config.unmatched_category
    );
    Ok(result)
}
