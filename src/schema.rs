use regex::Regex;

use crate::error::{GobblerError, Result};
use crate::settings::{AccountSettings, ColumnSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub index: usize,
    pub trim: bool,
}

impl From<&ColumnSettings> for ColumnSpec {
    fn from(c: &ColumnSettings) -> Self {
        Self {
            index: c.index,
            trim: c.trim,
        }
    }
}

/// Column layout of one bank export format.
#[derive(Debug, Clone)]
pub struct AccountSchema {
    pub name: String,
    pub filename_regexp: Regex,
    pub date: ColumnSpec,
    pub description: ColumnSpec,
    pub amount: ColumnSpec,
}

impl AccountSchema {
    pub fn new(name: &str, settings: &AccountSettings) -> Result<Self> {
        let filename_regexp =
            Regex::new(&settings.filename_regexp).map_err(|source| GobblerError::InvalidPattern {
                pattern: settings.filename_regexp.clone(),
                source,
            })?;
        Ok(Self {
            name: name.to_string(),
            filename_regexp,
            date: (&settings.column_date).into(),
            description: (&settings.column_description).into(),
            amount: (&settings.column_amount).into(),
        })
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.filename_regexp.is_match(filename)
    }
}

/// Account schemas in declaration order. Resolution is a linear scan and
/// the first match wins.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<AccountSchema>,
}

impl SchemaRegistry {
    pub fn from_settings(settings: &[(String, AccountSettings)]) -> Result<Self> {
        let schemas = settings
            .iter()
            .map(|(name, s)| AccountSchema::new(name, s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { schemas })
    }

    pub fn resolve(&self, filename: &str) -> Option<&AccountSchema> {
        self.schemas.iter().find(|s| s.matches(filename))
    }

    pub fn matching<'a>(&'a self, filename: &'a str) -> impl Iterator<Item = &'a AccountSchema> + 'a {
        self.schemas.iter().filter(move |s| s.matches(filename))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
