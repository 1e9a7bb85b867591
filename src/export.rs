use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::categorizer::RuleSet;
use crate::db::all_ordered_by_date;
use crate::error::Result;

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through `write` into a sibling temp file, then move it over
/// `path`. The destination never holds a half-written export.
fn write_fresh<F>(path: &Path, write: F) -> Result<usize>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<usize>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    let mut out = BufWriter::new(File::create(&tmp)?);
    let result = write(&mut out).and_then(|rows| {
        out.flush()?;
        Ok(rows)
    });
    drop(out);
    match result {
        Ok(rows) => {
            std::fs::rename(&tmp, path)?;
            Ok(rows)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Dump every transaction, oldest first, as headerless CSV.
pub fn export_csv(conn: &Connection, path: &Path, delimiter: u8) -> Result<usize> {
    tracing::info!("Saving transactions to CSV: {}", path.display());
    let transactions = all_ordered_by_date(conn)?;
    write_fresh(path, |out| {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(out);
        for t in &transactions {
            wtr.write_record([
                t.date.to_string(),
                t.description.clone(),
                format!("{:?}", t.amount),
                t.account.clone(),
                t.category.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
        Ok(transactions.len())
    })
}

/// Write the chart data file: optional template, then `window.categoryProps`
/// and `window.expenses`. Field names are read by the chart page as-is.
pub fn export_js(
    conn: &Connection,
    rules: &RuleSet,
    path: &Path,
    template: Option<&Path>,
) -> Result<usize> {
    tracing::info!("Saving transactions to JS: {}", path.display());
    let template = template.map(std::fs::read_to_string).transpose()?;
    let transactions = all_ordered_by_date(conn)?;

    write_fresh(path, |out| {
        if let Some(template) = &template {
            out.write_all(template.as_bytes())?;
        }

        writeln!(out, "window.categoryProps = new Map([")?;
        for rule in rules.iter() {
            writeln!(
                out,
                "\t[{},\t{{ color:{},\tgroup:{}}} ],",
                serde_json::to_string(&rule.name)?,
                rule.color,
                rule.group
            )?;
        }
        writeln!(out, "]);")?;

        writeln!(out, "window.expenses = [")?;
        for t in &transactions {
            let category = t.category.as_deref().unwrap_or_default();
            let group = rules.group_of(category).unwrap_or_else(|| {
                tracing::debug!("Category '{category}' has no group, using 0");
                0
            });
            writeln!(
                out,
                "\t[{{date: {}, description: {}, amount: {:.6}, account: {},category: {}, categorygroup: {}}}],",
                serde_json::to_string(&t.date.to_string())?,
                serde_json::to_string(&t.description)?,
                t.amount,
                serde_json::to_string(&t.account)?,
                serde_json::to_string(category)?,
                group
            )?;
        }
        write!(out, "];")?;
        Ok(transactions.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_transactions, insert_transaction, open_store, update_category};
    use crate::models::Transaction;
    use crate::settings::CategorySettings;
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_store(&dir.path().join("test.db")).unwrap();
        (dir, conn)
    }

    fn seed(conn: &Connection) {
        for (d, desc, amount, cat) in [
            (20, "POWER \"CO\"", -80.0, Some("Bills")),
            (3, "GROCERY", -45.1, Some("Food")),
            (11, "MYSTERY", -1.5, None),
        ] {
            let date = NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
            insert_transaction(
                conn,
                &Transaction {
                    date,
                    description: desc.to_string(),
                    amount,
                    account: "visa".to_string(),
                    category: None,
                },
            )
            .unwrap();
            if let Some(cat) = cat {
                update_category(conn, date, desc, amount, cat).unwrap();
            }
        }
    }

    fn rules() -> RuleSet {
        RuleSet::from_settings(&[
            (
                "Food".to_string(),
                CategorySettings {
                    regexps: vec!["grocery".to_string()],
                    color: "window.chartColors.green".to_string(),
                    group: 1,
                },
            ),
            (
                "Bills".to_string(),
                CategorySettings {
                    regexps: vec!["power".to_string()],
                    color: "window.chartColors.red".to_string(),
                    group: 2,
                },
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_csv_export_matches_store_count_and_order() {
        let (dir, conn) = test_db();
        seed(&conn);
        let out = dir.path().join("out.csv");
        let written = export_csv(&conn, &out, b',').unwrap();
        assert_eq!(written as i64, count_transactions(&conn).unwrap());

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&out)
            .unwrap();
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        let dates: Vec<&str> = records.iter().map(|r| &r[0]).collect();
        assert_eq!(dates, ["2024-01-03", "2024-01-11", "2024-01-20"]);
        assert_eq!(&records[0][1], "GROCERY");
        assert_eq!(&records[0][2], "-45.1");
        assert_eq!(&records[0][3], "visa");
        assert_eq!(&records[0][4], "Food");
        assert_eq!(&records[1][4], "");
        assert_eq!(&records[2][1], "POWER \"CO\"");
        assert_eq!(&records[2][2], "-80.0");
    }

    #[test]
    fn test_csv_export_custom_delimiter_replaces_old_file() {
        let (dir, conn) = test_db();
        seed(&conn);
        let out = dir.path().join("out.csv");
        std::fs::write(&out, "stale content that is much longer than needed\n".repeat(50)).unwrap();
        export_csv(&conn, &out, b';').unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(!content.contains("stale"));
        assert!(content.starts_with("2024-01-03;GROCERY;-45.1;visa;Food\n"));
        assert!(!temp_path(&out).exists());
    }

    #[test]
    fn test_js_export_layout() {
        let (dir, conn) = test_db();
        seed(&conn);
        let template = dir.path().join("template.js");
        std::fs::write(&template, "'use strict';\n").unwrap();
        let out = dir.path().join("data.js");
        let written = export_js(&conn, &rules(), &out, Some(&template)).unwrap();
        assert_eq!(written, 3);

        let js = std::fs::read_to_string(&out).unwrap();
        assert!(js.starts_with("'use strict';\nwindow.categoryProps = new Map([\n"));
        assert!(js.contains("\t[\"Food\",\t{ color:window.chartColors.green,\tgroup:1} ],\n"));
        assert!(js.contains("\t[\"Bills\",\t{ color:window.chartColors.red,\tgroup:2} ],\n"));
        assert!(js.contains(
            "\t[{date: \"2024-01-03\", description: \"GROCERY\", amount: -45.100000, account: \"visa\",category: \"Food\", categorygroup: 1}],\n"
        ));
        assert!(js.contains("description: \"POWER \\\"CO\\\"\""));
        assert!(js.contains("category: \"\", categorygroup: 0}"));
        assert!(js.ends_with("];"));
    }

    #[test]
    fn test_js_export_missing_template_fails_without_output() {
        let (dir, conn) = test_db();
        let out = dir.path().join("data.js");
        assert!(export_js(&conn, &rules(), &out, Some(&dir.path().join("nope.js"))).is_err());
        assert!(!out.exists());
    }
}
