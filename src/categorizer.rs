use regex::{Regex, RegexBuilder};
use rusqlite::Connection;

use crate::db::{select_for_categorization, update_category};
use crate::error::{GobblerError, Result};
use crate::settings::CategorySettings;

#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub name: String,
    pub regexps: Vec<Regex>,
    pub color: String,
    pub group: i64,
}

/// Categories in declaration order, each with its patterns in declaration
/// order. Patterns match case-insensitively anywhere in the description.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CategoryRule>,
}

impl RuleSet {
    pub fn from_settings(settings: &[(String, CategorySettings)]) -> Result<Self> {
        let mut rules = Vec::with_capacity(settings.len());
        for (name, category) in settings {
            let regexps = category
                .regexps
                .iter()
                .map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| GobblerError::InvalidPattern {
                            pattern: pattern.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            rules.push(CategoryRule {
                name: name.clone(),
                regexps,
                color: category.color.clone(),
                group: category.group,
            });
        }
        Ok(Self { rules })
    }

    pub fn match_category(&self, description: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.regexps.iter().any(|re| re.is_match(description)))
            .map(|rule| rule.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn group_of(&self, name: &str) -> Option<i64> {
        self.get(name).map(|rule| rule.group)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub struct CategorizeResult {
    pub examined: usize,
    pub updated: usize,
    pub unmatched: usize,
}

/// Assign a category to every uncategorized transaction (or to all of them
/// with `force_all`). Rows whose category would not change are left alone.
pub fn categorize_transactions(
    conn: &Connection,
    rules: &RuleSet,
    unmatched_category: &str,
    force_all: bool,
) -> Result<CategorizeResult> {
    tracing::info!("Categorizing expenses (force: {force_all})");
    if rules.is_empty() {
        tracing::warn!("No expense categories configured, everything will be '{unmatched_category}'");
    }

    let pending = select_for_categorization(conn, force_all, unmatched_category)?;
    let tx = conn.unchecked_transaction()?;

    let mut updated = 0usize;
    let mut unmatched = 0usize;
    for txn in &pending {
        let category = match rules.match_category(&txn.description) {
            Some(name) => name,
            None => {
                unmatched += 1;
                unmatched_category
            }
        };
        if txn.category.as_deref() == Some(category) {
            continue;
        }
        tracing::debug!("{} {:?} -> {category}", txn.date, txn.description);
        update_category(&tx, txn.date, &txn.description, txn.amount, category)?;
        updated += 1;
    }
    tx.commit()?;

    tracing::info!(
        "Categorized {} transactions: {updated} updated, {unmatched} unmatched",
        pending.len()
    );
    Ok(CategorizeResult {
        examined: pending.len(),
        updated,
        unmatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{all_ordered_by_date, insert_transaction, open_store};
    use crate::models::Transaction;
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_store(&dir.path().join("test.db")).unwrap();
        (dir, conn)
    }

    fn setup_txns(conn: &Connection, descriptions: &[&str]) {
        for (i, desc) in descriptions.iter().enumerate() {
            insert_transaction(
                conn,
                &Transaction {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                    description: desc.to_string(),
                    amount: -50.0,
                    account: "visa".to_string(),
                    category: None,
                },
            )
            .unwrap();
        }
    }

    fn rules(defs: &[(&str, &[&str])]) -> RuleSet {
        let settings: Vec<(String, CategorySettings)> = defs
            .iter()
            .enumerate()
            .map(|(i, (name, patterns))| {
                (
                    name.to_string(),
                    CategorySettings {
                        regexps: patterns.iter().map(|p| p.to_string()).collect(),
                        color: format!("chartColors.c{i}"),
                        group: i as i64 + 1,
                    },
                )
            })
            .collect();
        RuleSet::from_settings(&settings).unwrap()
    }

    fn categories(conn: &Connection) -> Vec<(String, Option<String>)> {
        all_ordered_by_date(conn)
            .unwrap()
            .into_iter()
            .map(|t| (t.description, t.category))
            .collect()
    }

    #[test]
    fn test_first_declared_category_wins() {
        let r = rules(&[("A", &["market"]), ("B", &["super"])]);
        assert_eq!(r.match_category("SUPERMARKET 24"), Some("A"));
    }

    #[test]
    fn test_patterns_in_order_within_category() {
        let r = rules(&[("Food", &["^zzz", "pizza"]), ("Fun", &["pizza"])]);
        assert_eq!(r.match_category("Pizza Place"), Some("Food"));
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let r = rules(&[("Power", &["electric"])]);
        assert_eq!(r.match_category("CITY ELECTRIC CO"), Some("Power"));
        assert_eq!(r.match_category("gas station"), None);
    }

    #[test]
    fn test_invalid_category_pattern() {
        let settings = vec![(
            "Bad".to_string(),
            CategorySettings {
                regexps: vec!["(".to_string()],
                color: String::new(),
                group: 0,
            },
        )];
        assert!(matches!(
            RuleSet::from_settings(&settings),
            Err(GobblerError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_unmatched_gets_sentinel() {
        let (_dir, conn) = test_db();
        setup_txns(&conn, &["GROCERY", "MYSTERY SHOP"]);
        let r = rules(&[("Food", &["grocery"])]);
        let result = categorize_transactions(&conn, &r, "Unmatched", false).unwrap();
        assert_eq!(result.updated, 2);
        assert_eq!(result.unmatched, 1);
        assert_eq!(
            categories(&conn),
            [
                ("GROCERY".to_string(), Some("Food".to_string())),
                ("MYSTERY SHOP".to_string(), Some("Unmatched".to_string())),
            ]
        );
    }

    #[test]
    fn test_second_pass_is_noop() {
        let (_dir, conn) = test_db();
        setup_txns(&conn, &["GROCERY", "MYSTERY SHOP", "POWER BILL"]);
        let r = rules(&[("Food", &["grocery"]), ("Bills", &["power"])]);
        let first = categorize_transactions(&conn, &r, "Unmatched", false).unwrap();
        assert_eq!(first.updated, 3);
        let second = categorize_transactions(&conn, &r, "Unmatched", false).unwrap();
        assert_eq!(second.examined, 1);
        assert_eq!(second.updated, 0);
    }

    #[test]
    fn test_unforced_pass_picks_up_new_rules_for_unmatched_only() {
        let (_dir, conn) = test_db();
        setup_txns(&conn, &["GROCERY", "MYSTERY SHOP"]);
        categorize_transactions(&conn, &rules(&[("Food", &["grocery"])]), "Unmatched", false)
            .unwrap();

        let changed = rules(&[("Shops", &["shop", "grocery"])]);
        let result = categorize_transactions(&conn, &changed, "Unmatched", false).unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(
            categories(&conn),
            [
                ("GROCERY".to_string(), Some("Food".to_string())),
                ("MYSTERY SHOP".to_string(), Some("Shops".to_string())),
            ]
        );
    }

    #[test]
    fn test_forced_pass_recomputes_everything() {
        let (_dir, conn) = test_db();
        setup_txns(&conn, &["GROCERY", "MYSTERY SHOP"]);
        categorize_transactions(&conn, &rules(&[("Food", &["grocery"])]), "Unmatched", false)
            .unwrap();

        let changed = rules(&[("Shops", &["shop", "grocery"])]);
        let result = categorize_transactions(&conn, &changed, "Unmatched", true).unwrap();
        assert_eq!(result.examined, 2);
        assert_eq!(result.updated, 2);
        assert!(categories(&conn)
            .iter()
            .all(|(_, c)| c.as_deref() == Some("Shops")));
    }

    #[test]
    fn test_group_lookup() {
        let r = rules(&[("Food", &["x"]), ("Bills", &["y"])]);
        assert_eq!(r.group_of("Bills"), Some(2));
        assert_eq!(r.group_of("Nope"), None);
        assert_eq!(r.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), ["Food", "Bills"]);
    }
}
