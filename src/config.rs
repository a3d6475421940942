use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PopulateError, Result};
use crate::extraction::DEFAULT_MAX_DEPTH;
use crate::resolution::{TitleFields, DEFAULT_MAX_CONCURRENT_QUERIES, DEFAULT_TITLE_FIELDS};

/// Name of the configuration file stored inside the `.lexical` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory holding configuration and the database.
pub const LEXICAL_DIR: &str = ".lexical";

/// Configuration for a populate service project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Socket address the HTTP service binds to.
    pub listen: String,
    /// SQLite database path, relative to the project root unless absolute.
    pub database_path: String,
    /// Entity field holding the document tree when a request names none.
    pub lexical_field: String,
    /// Nesting limit for tree walks; deeper subtrees pass through untouched.
    pub max_depth: usize,
    /// Maximum number of per-content-type entry queries in flight.
    pub max_concurrent_queries: usize,
    /// Candidate title fields, in priority order.
    pub title_fields: Vec<String>,
    /// Per-content-type candidate lists replacing `title_fields`.
    pub title_field_overrides: BTreeMap<String, Vec<String>>,
    /// When set, every route except `/health` requires this bearer token.
    pub admin_token: Option<String>,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            version: 1,
            listen: "127.0.0.1:1337".to_string(),
            database_path: format!("{LEXICAL_DIR}/populate.db"),
            lexical_field: "content".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            title_fields: DEFAULT_TITLE_FIELDS.iter().map(|s| s.to_string()).collect(),
            title_field_overrides: BTreeMap::new(),
            admin_token: None,
        }
    }
}

impl PopulateConfig {
    /// Builds the title-field selector described by this configuration.
    pub fn title_fields(&self) -> TitleFields {
        self.title_field_overrides.iter().fold(
            TitleFields::new(self.title_fields.clone()),
            |titles, (content_type, fields)| titles.with_override(content_type, fields.clone()),
        )
    }

    /// Resolves `database_path` against the project root.
    pub fn database_path(&self, project_root: &Path) -> PathBuf {
        let path = Path::new(&self.database_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_root.join(path)
        }
    }
}

/// Returns the path to the `.lexical` directory within the given project root.
pub fn get_lexical_dir(project_root: &Path) -> PathBuf {
    project_root.join(LEXICAL_DIR)
}

/// Returns the path to the configuration file within the `.lexical` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_lexical_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns the default configuration.
pub fn load_config(project_root: &Path) -> Result<PopulateConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(PopulateConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| PopulateError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    let config: PopulateConfig =
        serde_json::from_str(&contents).map_err(|e| PopulateError::Config {
            message: format!(
                "failed to parse config file '{}': {}",
                config_path.display(),
                e
            ),
        })?;

    if config.max_depth == 0 {
        return Err(PopulateError::Config {
            message: "max_depth must be at least 1".to_string(),
        });
    }

    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it into place.
pub fn save_config(project_root: &Path, config: &PopulateConfig) -> Result<()> {
    let lexical_dir = get_lexical_dir(project_root);
    fs::create_dir_all(&lexical_dir).map_err(|e| PopulateError::Config {
        message: format!(
            "failed to create config directory '{}': {}",
            lexical_dir.display(),
            e
        ),
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| PopulateError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| PopulateError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| PopulateError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}
