use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, ErrorCode, Row};

use crate::error::{GobblerError, Result};
use crate::models::{InsertOutcome, Transaction};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    account TEXT,
    category TEXT,
    PRIMARY KEY (date, description, amount)
);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let unavailable =
        |e: rusqlite::Error| GobblerError::PersistenceUnavailable(format!("{}: {e}", db_path.display()));
    let conn = Connection::open(db_path).map_err(unavailable)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .map_err(unavailable)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .map_err(|e| GobblerError::PersistenceUnavailable(e.to_string()))
}

/// Open the store and make sure the table exists.
pub fn open_store(db_path: &Path) -> Result<Connection> {
    let conn = get_connection(db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    let raw_date: String = row.get(0)?;
    let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Transaction {
        date,
        description: row.get(1)?,
        amount: row.get(2)?,
        account: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        category: row.get(4)?,
    })
}

/// Insert one row in its own implicit transaction. A row with the same
/// `(date, description, amount)` already present is a `Conflict`.
pub fn insert_transaction(conn: &Connection, txn: &Transaction) -> Result<InsertOutcome> {
    let result = conn.execute(
        "INSERT INTO transactions (date, description, amount, account, category) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            format_date(txn.date),
            txn.description,
            txn.amount,
            txn.account,
            txn.category
        ],
    );
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Ok(InsertOutcome::Conflict)
        }
        Err(e) => Err(e.into()),
    }
}

/// Uncategorized rows (NULL or the unmatched sentinel), or every row when
/// `force_all` is set.
pub fn select_for_categorization(
    conn: &Connection,
    force_all: bool,
    unmatched: &str,
) -> Result<Vec<Transaction>> {
    let rows = if force_all {
        let mut stmt = conn.prepare(
            "SELECT date, description, amount, account, category FROM transactions",
        )?;
        let rows = stmt
            .query_map([], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    } else {
        let mut stmt = conn.prepare(
            "SELECT date, description, amount, account, category FROM transactions \
             WHERE category IS NULL OR category = ?1",
        )?;
        let rows = stmt
            .query_map([unmatched], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows
    };
    Ok(rows)
}

pub fn update_category(
    conn: &Connection,
    date: NaiveDate,
    description: &str,
    amount: f64,
    category: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET category = ?1 WHERE date = ?2 AND description = ?3 AND amount = ?4",
        params![category, format_date(date), description, amount],
    )?;
    Ok(())
}

pub fn all_ordered_by_date(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT date, description, amount, account, category FROM transactions \
         ORDER BY date, description, amount",
    )?;
    let rows = stmt
        .query_map([], row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_transactions(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?)
}
