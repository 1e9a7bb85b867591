use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::categorizer::RuleSet;
use crate::error::{GobblerError, Result};
use crate::locale::Locale;
use crate::schema::SchemaRegistry;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Ordered `(key, value)` pairs of a JSON object. Account types and
/// categories are matched in declaration order, so a hash map won't do.
pub type Ordered<T> = Vec<(String, T)>;

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSettings {
    pub index: usize,
    #[serde(default)]
    pub trim: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSettings {
    pub filename_regexp: String,
    pub column_date: ColumnSettings,
    pub column_description: ColumnSettings,
    pub column_amount: ColumnSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySettings {
    #[serde(default)]
    pub regexps: Vec<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub group: i64,
}

/// The two sections that may also live in the separate data-config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    #[serde(default, deserialize_with = "ordered_entries")]
    pub import_settings: Option<Ordered<AccountSettings>>,
    #[serde(default, deserialize_with = "ordered_entries")]
    pub expense_categories: Option<Ordered<CategorySettings>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_file")]
    pub database_file: String,
    #[serde(default = "default_data_config_file")]
    pub data_config_file: String,
    #[serde(default = "default_csv_output_delimiter")]
    pub csv_output_delimiter: String,
    #[serde(default)]
    pub js_template: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub fix_duplicates_on_import: bool,
    #[serde(default = "default_unmatched_category")]
    pub unmatched_category: String,
    #[serde(flatten)]
    pub data: DataConfig,
}

fn default_database_file() -> String {
    "transactions.db".to_string()
}

fn default_data_config_file() -> String {
    "dataconfig.json".to_string()
}

fn default_csv_output_delimiter() -> String {
    ",".to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_unmatched_category() -> String {
    "Unmatched".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
            data_config_file: default_data_config_file(),
            csv_output_delimiter: default_csv_output_delimiter(),
            js_template: None,
            locale: default_locale(),
            fix_duplicates_on_import: false,
            unmatched_category: default_unmatched_category(),
            data: DataConfig::default(),
        }
    }
}

fn ordered_entries<'de, D, T>(deserializer: D) -> std::result::Result<Option<Ordered<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Ordered<T>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a JSON object")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, T>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer
        .deserialize_map(EntriesVisitor(PhantomData))
        .map(Some)
}

/// Immutable runtime configuration shared by every component.
#[derive(Debug)]
pub struct Config {
    pub database_path: PathBuf,
    pub data_config_file: String,
    pub csv_delimiter: u8,
    pub js_template: Option<PathBuf>,
    pub locale: Locale,
    pub fix_duplicates: bool,
    pub unmatched_category: String,
    pub registry: Option<SchemaRegistry>,
    pub rules: RuleSet,
}

impl Config {
    /// Read `config.json` (and the data-config file beside it).
    pub fn load(path: &Path) -> Result<Self> {
        let settings = load_settings(path)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_settings(settings, &base_dir)
    }

    pub fn from_settings(mut settings: Settings, base_dir: &Path) -> Result<Self> {
        if let Some(data) = load_data_config(base_dir, &settings.data_config_file) {
            settings.data.merge(data);
        }

        let csv_delimiter = match settings.csv_output_delimiter.as_bytes() {
            [b] => *b,
            _ => {
                return Err(GobblerError::Settings(format!(
                    "csv_output_delimiter must be a single byte, got '{}'",
                    settings.csv_output_delimiter
                )))
            }
        };

        let registry = settings
            .data
            .import_settings
            .as_deref()
            .map(SchemaRegistry::from_settings)
            .transpose()?;
        if registry.as_ref().is_some_and(SchemaRegistry::is_empty) {
            tracing::warn!("import_settings defines no account types");
        }
        let rules = RuleSet::from_settings(
            settings.data.expense_categories.as_deref().unwrap_or_default(),
        )?;

        Ok(Self {
            database_path: resolve_path(base_dir, &settings.database_file),
            data_config_file: settings.data_config_file,
            csv_delimiter,
            js_template: settings.js_template.map(|t| resolve_path(base_dir, &t)),
            locale: Locale::from_identifier(&settings.locale),
            fix_duplicates: settings.fix_duplicates_on_import,
            unmatched_category: settings.unmatched_category,
            registry,
            rules,
        })
    }

    /// Registry to use for files inside `dir`: the directory's own data
    /// config when it has one, the base registry otherwise.
    pub fn registry_for_dir(&self, dir: &Path) -> Result<Option<SchemaRegistry>> {
        let scoped = load_data_config(dir, &self.data_config_file)
            .and_then(|data| data.import_settings);
        match scoped {
            Some(import_settings) => SchemaRegistry::from_settings(&import_settings).map(Some),
            None => Ok(self.registry.clone()),
        }
    }

    /// Categories declared in `dir`'s own data config, if any.
    pub fn rules_for_dir(&self, dir: &Path) -> Result<Option<RuleSet>> {
        load_data_config(dir, &self.data_config_file)
            .and_then(|data| data.expense_categories)
            .map(|categories| RuleSet::from_settings(&categories))
            .transpose()
    }

    /// Rule set for a run over `paths`. The last directory carrying its own
    /// categories wins; the base rules apply otherwise.
    pub fn rules_for_paths<P: AsRef<Path>>(&self, paths: &[P]) -> RuleSet {
        let mut rules = self.rules.clone();
        for path in paths {
            let dir = path.as_ref();
            if !dir.is_dir() {
                continue;
            }
            match self.rules_for_dir(dir) {
                Ok(Some(scoped)) => {
                    tracing::info!("Using expense categories from {}", dir.display());
                    rules = scoped;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring expense categories in {}: {e}", dir.display()),
            }
        }
        rules
    }
}

impl DataConfig {
    fn merge(&mut self, other: DataConfig) {
        if other.import_settings.is_some() {
            self.import_settings = other.import_settings;
        }
        if other.expense_categories.is_some() {
            self.expense_categories = other.expense_categories;
        }
    }
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| GobblerError::Settings(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| GobblerError::Settings(format!("cannot parse {}: {e}", path.display())))
}

/// Load `dir/name` when it exists. A malformed file is logged and ignored.
pub fn load_data_config(dir: &Path, name: &str) -> Option<DataConfig> {
    let path = dir.join(name);
    if !path.is_file() {
        tracing::debug!("No data config at {}", path.display());
        return None;
    }
    let parsed = std::fs::read_to_string(&path)
        .map_err(GobblerError::from)
        .and_then(|content| serde_json::from_str::<DataConfig>(&content).map_err(GobblerError::from));
    match parsed {
        Ok(data) => {
            tracing::info!("Loaded data config from {}", path.display());
            Some(data)
        }
        Err(e) => {
            tracing::warn!("Failed loading data config from {}: {e}", path.display());
            None
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gobbler")
}

/// `./config.json` when present, otherwise `~/.config/gobbler/config.json`.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        local
    } else {
        config_dir().join(CONFIG_FILE_NAME)
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand_path(path));
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}
