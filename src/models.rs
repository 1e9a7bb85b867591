use chrono::NaiveDate;

/// One CSV record as read from the source file, before any cleanup.
pub type RawRow = Vec<String>;

/// Date, description and amount pulled out of a raw row and parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// A stored transaction. `(date, description, amount)` is its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub account: String,
    pub category: Option<String>,
}

impl Transaction {
    pub fn from_row(row: NormalizedRow, account: &str) -> Self {
        Self {
            date: row.date,
            description: row.description,
            amount: row.amount,
            account: account.to_string(),
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Conflict,
}
