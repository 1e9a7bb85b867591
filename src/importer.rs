use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::db::insert_transaction;
use crate::dedup::{disambiguate, sort_for_dedup};
use crate::error::{GobblerError, Result};
use crate::models::{InsertOutcome, Transaction};
use crate::normalizer::normalize;
use crate::schema::{AccountSchema, SchemaRegistry};
use crate::settings::Config;
use crate::sniff::load_csv;

/// Outcome of importing one file as one account type.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub account: String,
    pub added: usize,
    pub skipped: usize,
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Import every given file or directory. Files and directories that cannot
/// be matched or read are logged and skipped; only store failures abort.
pub fn import_paths<P: AsRef<Path>>(
    conn: &Connection,
    config: &Config,
    paths: &[P],
) -> Result<Vec<FileReport>> {
    let mut reports = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            import_directory(conn, config, path, &mut reports)?;
        } else {
            import_report(conn, config, path, &mut reports)?;
        }
    }
    tracing::info!("Finished reading {} path(s)", paths.len());
    Ok(reports)
}

fn import_report(
    conn: &Connection,
    config: &Config,
    path: &Path,
    reports: &mut Vec<FileReport>,
) -> Result<()> {
    let Some(registry) = &config.registry else {
        let err = GobblerError::ConfigurationMissing(format!(
            "make sure {} exists next to the config file",
            config.data_config_file
        ));
        tracing::error!("{err}");
        return Ok(());
    };
    let name = file_name(path).unwrap_or_default();
    match registry.resolve(name) {
        Some(schema) => import_logged(conn, config, path, schema, reports),
        None => {
            tracing::error!("{}", GobblerError::AccountTypeUnresolved(path.display().to_string()));
            Ok(())
        }
    }
}

fn import_directory(
    conn: &Connection,
    config: &Config,
    dir: &Path,
    reports: &mut Vec<FileReport>,
) -> Result<()> {
    let registry: SchemaRegistry = match config.registry_for_dir(dir) {
        Ok(Some(registry)) => registry,
        Ok(None) => {
            let err = GobblerError::ConfigurationMissing(format!(
                "make sure {} exists next to the config file or in {}",
                config.data_config_file,
                dir.display()
            ));
            tracing::error!("{err}");
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Skipping {}: {e}", dir.display());
            return Ok(());
        }
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Cannot list {}: {e}", dir.display());
            return Ok(());
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    for file in &files {
        let Some(name) = file_name(file) else {
            continue;
        };
        // A file is imported once per matching account type.
        for schema in registry.matching(name) {
            import_logged(conn, config, file, schema, reports)?;
        }
    }
    Ok(())
}

fn import_logged(
    conn: &Connection,
    config: &Config,
    path: &Path,
    schema: &AccountSchema,
    reports: &mut Vec<FileReport>,
) -> Result<()> {
    match import_file(conn, config, path, schema) {
        Ok(report) => {
            reports.push(report);
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::error!("Failed reading {}: {e}", path.display());
            Ok(())
        }
    }
}

/// Load, optionally disambiguate, normalize and store every row of one
/// file as `schema`. Rows that fail to parse or collide are skipped.
pub fn import_file(
    conn: &Connection,
    config: &Config,
    path: &Path,
    schema: &AccountSchema,
) -> Result<FileReport> {
    tracing::info!("Opening file {} as {}", path.display(), schema.name);
    let mut rows = load_csv(path)?;

    if config.fix_duplicates {
        sort_for_dedup(&mut rows, schema.date.index, schema.description.index);
        let renamed = disambiguate(&mut rows, schema.description.index);
        if renamed > 0 {
            tracing::debug!("Renamed {renamed} repeated rows in {}", path.display());
        }
    }

    let mut added = 0usize;
    let mut skipped = 0usize;
    for row in &rows {
        let normalized = match normalize(row, schema, &config.locale) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Skipping row {row:?}: {e}");
                skipped += 1;
                continue;
            }
        };
        let txn = Transaction::from_row(normalized, &schema.name);
        match insert_transaction(conn, &txn)? {
            InsertOutcome::Inserted => added += 1,
            InsertOutcome::Conflict => {
                tracing::warn!(
                    "Failed inserting row, possible duplicate: {} {:?} {}",
                    txn.date,
                    txn.description,
                    txn.amount
                );
                skipped += 1;
            }
        }
    }

    tracing::info!(
        "Finished reading {}: added {added} rows, skipped {skipped} rows",
        path.display()
    );
    Ok(FileReport {
        path: path.to_path_buf(),
        account: schema.name.clone(),
        added,
        skipped,
    })
}
