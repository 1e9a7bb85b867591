use thiserror::Error;

#[derive(Error, Debug)]
pub enum GobblerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import settings not defined: {0}")]
    ConfigurationMissing(String),

    #[error("Cannot determine account type based on filename: {0}")]
    AccountTypeUnresolved(String),

    #[error("Cannot parse {field} from '{value}'")]
    FieldParse { field: &'static str, value: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cannot open transaction store: {0}")]
    PersistenceUnavailable(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl GobblerError {
    pub fn field(field: &'static str, value: impl Into<String>) -> Self {
        Self::FieldParse {
            field,
            value: value.into(),
        }
    }

    /// Errors that stop the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Db(_) | Self::PersistenceUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, GobblerError>;
