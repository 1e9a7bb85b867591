use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{GobblerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

/// Number and date conventions derived from a POSIX-style locale name
/// such as `de_DE.UTF-8` or `en-US`.
#[derive(Debug, Clone, PartialEq)]
pub struct Locale {
    pub identifier: String,
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub date_order: DateOrder,
}

const COMMA_DECIMAL_DOT_GROUP: &[&str] = &[
    "da", "de", "es", "id", "it", "nl", "pt", "ro", "tr", "ru", "uk", "pl", "cs", "sk", "sl", "hr",
    "el",
];
const COMMA_DECIMAL_SPACE_GROUP: &[&str] = &[
    "fi", "fr", "nb", "no", "sv", "hu", "et", "lv", "lt",
];
const YEAR_FIRST: &[&str] = &["ja", "zh", "ko", "hu", "lt", "sv"];

impl Locale {
    pub fn from_identifier(identifier: &str) -> Self {
        let base = identifier
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();
        let mut parts = base.split(['_', '-']);
        let language = parts.next().unwrap_or_default().to_lowercase();
        let region = parts.next().unwrap_or_default().to_uppercase();

        let (decimal_separator, thousands_separator) = if language == "de" && region == "CH" {
            ('.', '\'')
        } else if COMMA_DECIMAL_DOT_GROUP.contains(&language.as_str()) {
            (',', '.')
        } else if COMMA_DECIMAL_SPACE_GROUP.contains(&language.as_str()) {
            (',', ' ')
        } else {
            ('.', ',')
        };

        let date_order = if language == "en" && matches!(region.as_str(), "" | "US" | "PH") {
            DateOrder::MonthDayYear
        } else if YEAR_FIRST.contains(&language.as_str()) {
            DateOrder::YearMonthDay
        } else {
            DateOrder::DayMonthYear
        };

        Self {
            identifier: identifier.to_string(),
            decimal_separator,
            thousands_separator,
            date_order,
        }
    }

    /// Parse a decimal number written with this locale's separators.
    pub fn parse_amount(&self, raw: &str) -> Result<f64> {
        let s = raw.trim();
        let mut normalized = String::with_capacity(s.len());
        for c in s.chars() {
            if c == self.thousands_separator
                || (self.thousands_separator == ' ' && c == '\u{a0}')
            {
                continue;
            }
            if c == self.decimal_separator {
                normalized.push('.');
            } else {
                normalized.push(c);
            }
        }
        normalized
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GobblerError::field("amount", raw))
    }

    /// Parse a calendar date. ISO dates are always accepted; numeric dates
    /// follow the locale's day/month/year order.
    pub fn parse_date(&self, raw: &str) -> Result<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(GobblerError::field("date", raw));
        }

        let tokens: Vec<&str> = s
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let year_first = tokens.first().is_some_and(|t| is_year(t));

        if year_first {
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Ok(date);
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                    return Ok(dt.date());
                }
            }
        }

        let year_token = match self.date_order {
            DateOrder::YearMonthDay => tokens.first(),
            _ => tokens.last(),
        };
        let year = if year_token.is_some_and(|t| is_year(t)) {
            "%Y"
        } else {
            "%y"
        };
        for format in self.numeric_formats(year) {
            if let Ok(date) = NaiveDate::parse_from_str(s, &format) {
                return Ok(date);
            }
        }

        for format in textual_formats(self.date_order) {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return Ok(date);
            }
        }

        Err(GobblerError::field("date", raw))
    }

    fn numeric_formats(&self, year: &str) -> Vec<String> {
        let order = match self.date_order {
            DateOrder::DayMonthYear => ["%d", "%m", year],
            DateOrder::MonthDayYear => ["%m", "%d", year],
            DateOrder::YearMonthDay => [year, "%m", "%d"],
        };
        ["/", ".", "-", " "]
            .into_iter()
            .map(|sep| order.join(sep))
            .collect()
    }
}

// `%Y` accepts any digit count, so a two-digit year must be routed to `%y`.
fn is_year(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit())
}

fn textual_formats(order: DateOrder) -> &'static [&'static str] {
    match order {
        DateOrder::MonthDayYear => &["%b %d %Y", "%B %d %Y", "%d %b %Y", "%d %B %Y"],
        _ => &["%d %b %Y", "%d %B %Y", "%b %d %Y", "%B %d %Y"],
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::from_identifier("en_US")
    }
}
