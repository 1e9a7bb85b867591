use crate::error::{GobblerError, Result};
use crate::locale::Locale;
use crate::models::NormalizedRow;
use crate::schema::{AccountSchema, ColumnSpec};

/// Keep ASCII letters, digits, whitespace, `-` and `.`, then trim.
/// Without `trim` the value passes through untouched.
pub fn sanitize(value: &str, trim: bool) -> String {
    if !trim {
        return value.to_string();
    }
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '.')
        .collect::<String>()
        .trim()
        .to_string()
}

fn extract(row: &[String], column: ColumnSpec, field: &'static str) -> Result<String> {
    row.get(column.index)
        .map(|v| sanitize(v, column.trim))
        .ok_or_else(|| {
            GobblerError::field(field, format!("<missing column {}>", column.index))
        })
}

pub fn normalize(row: &[String], schema: &AccountSchema, locale: &Locale) -> Result<NormalizedRow> {
    let date = extract(row, schema.date, "date")?;
    let description = extract(row, schema.description, "description")?;
    let amount = extract(row, schema.amount, "amount")?;

    Ok(NormalizedRow {
        date: locale.parse_date(&date)?,
        description,
        amount: locale.parse_amount(&amount)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AccountSettings, ColumnSettings};
    use chrono::NaiveDate;

    fn schema(trim: bool) -> AccountSchema {
        let col = |index| ColumnSettings { index, trim };
        AccountSchema::new(
            "card",
            &AccountSettings {
                filename_regexp: "card".to_string(),
                column_date: col(2),
                column_description: col(0),
                column_amount: col(1),
            },
        )
        .unwrap()
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sanitize_strips_symbols() {
        assert_eq!(sanitize("  $1,234.50* ", true), "1234.50");
        assert_eq!(sanitize("K-Market #123 (Helsinki)", true), "K-Market 123 Helsinki");
        assert_eq!(sanitize("Café", true), "Caf");
    }

    #[test]
    fn test_sanitize_passthrough() {
        assert_eq!(sanitize("  $1,234.50* ", false), "  $1,234.50* ");
    }

    #[test]
    fn test_normalize_uses_schema_indices() {
        let locale = Locale::from_identifier("en_US");
        let n = normalize(&row(&["GROCERY #12", "-45.10", "2024-01-15"]), &schema(true), &locale)
            .unwrap();
        assert_eq!(n.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(n.description, "GROCERY 12");
        assert_eq!(n.amount, -45.1);
    }

    #[test]
    fn test_normalize_untrimmed_keeps_description() {
        let locale = Locale::from_identifier("en_US");
        let n = normalize(&row(&["GROCERY #12", "1,045.10", "01/15/2024"]), &schema(false), &locale)
            .unwrap();
        assert_eq!(n.description, "GROCERY #12");
        assert_eq!(n.amount, 1045.1);
    }

    #[test]
    fn test_normalize_locale_amount() {
        let locale = Locale::from_identifier("de_DE");
        let n = normalize(&row(&["Miete", "-1.200,00", "01.02.2024"]), &schema(false), &locale)
            .unwrap();
        assert_eq!(n.amount, -1200.0);
        assert_eq!(n.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_bad_amount_is_field_error() {
        let locale = Locale::from_identifier("en_US");
        let err = normalize(&row(&["X", "n/a", "2024-01-15"]), &schema(false), &locale).unwrap_err();
        assert!(matches!(err, GobblerError::FieldParse { field: "amount", .. }));
    }

    #[test]
    fn test_bad_date_is_field_error() {
        let locale = Locale::from_identifier("en_US");
        let err = normalize(&row(&["X", "1.00", "someday"]), &schema(false), &locale).unwrap_err();
        assert!(matches!(err, GobblerError::FieldParse { field: "date", .. }));
    }

    #[test]
    fn test_short_row_is_field_error() {
        let locale = Locale::from_identifier("en_US");
        let err = normalize(&row(&["X", "1.00"]), &schema(false), &locale).unwrap_err();
        assert!(matches!(err, GobblerError::FieldParse { field: "date", .. }));
    }
}
