use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::error::Result;
use crate::importer::{import_paths, FileReport};
use crate::settings::Config;

pub fn run(conn: &Connection, config: &Config, reports: &[PathBuf]) -> Result<Vec<FileReport>> {
    let results = import_paths(conn, config, reports)?;
    print_summary(&results);
    Ok(results)
}

fn print_summary(results: &[FileReport]) {
    if results.is_empty() {
        println!("{}", "No files imported.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Account", "Added", "Skipped"]);
    for report in results {
        let skipped = if report.skipped > 0 {
            Cell::new(report.skipped.to_string().yellow())
        } else {
            Cell::new(report.skipped)
        };
        table.add_row(vec![
            Cell::new(report.path.display()),
            Cell::new(&report.account),
            Cell::new(report.added),
            skipped,
        ]);
    }
    let added: usize = results.iter().map(|r| r.added).sum();
    let skipped: usize = results.iter().map(|r| r.skipped).sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(added.to_string().green().bold()),
        Cell::new(skipped.to_string().bold()),
    ]);
    println!("Import\n{table}");
}
