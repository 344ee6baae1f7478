//! Configuration types for repofig-core.
//!
//! [`ProjectOptions`] carries caller-level overrides (repository path and tier
//! directories), while [`ProjectConfig`] is read from `.repofig.toml` at the
//! repository root. When a project opens, options win over the config file and
//! the config file wins over platform defaults.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::CoreError;
use crate::file_type::FileType;
use crate::fsutil::write_atomic;
use crate::validation::ValidationResult;

/// Schema version written to new config files.
pub const SCHEMA_VERSION: &str = "2.0";

/// Name of the project config file at the repository root.
pub const CONFIG_FILE: &str = ".repofig.toml";

// ── Project options (caller-level) ───────────────────────────

/// Options for opening a [`Project`](crate::Project).
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use repofig_core::ProjectOptions;
///
/// let options = ProjectOptions::builder()
///     .repo_path(PathBuf::from("/tmp/my-repo"))
///     .user_dir(PathBuf::from("/tmp/presets"))
///     .build();
///
/// assert_eq!(options.config_path(), PathBuf::from("/tmp/my-repo/.repofig.toml"));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct ProjectOptions {
    /// Repository root.
    #[builder(setter(into))]
    repo_path: PathBuf,

    /// Override the User tier directory.
    #[builder(default, setter(strip_option, into))]
    user_dir: Option<PathBuf>,

    /// Override the Project tier directory.
    #[builder(default, setter(strip_option, into))]
    project_dir: Option<PathBuf>,

    /// Extra Library tier directory.
    #[builder(default, setter(strip_option, into))]
    library_dir: Option<PathBuf>,

    /// Include the packaged presets.
    #[builder(default = true)]
    builtins: bool,
}

impl ProjectOptions {
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn user_dir(&self) -> Option<&Path> {
        self.user_dir.as_deref()
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    pub fn library_dir(&self) -> Option<&Path> {
        self.library_dir.as_deref()
    }

    pub fn builtins(&self) -> bool {
        self.builtins
    }

    /// The `.repofig` directory of the repository.
    pub fn repofig_dir(&self) -> PathBuf {
        self.repo_path.join(".repofig")
    }

    /// Path of `.repofig.toml`.
    pub fn config_path(&self) -> PathBuf {
        self.repo_path.join(CONFIG_FILE)
    }

    /// Default Project tier directory.
    pub fn default_project_presets_dir(&self) -> PathBuf {
        self.repofig_dir().join("presets")
    }
}

// ── Project configuration (.repofig.toml) ────────────────────

/// Project-level configuration, deserialized from `.repofig.toml`.
///
/// Every section has serde defaults so a partial file still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub repofig: MetaConfig,

    #[serde(default)]
    pub init: InitConfig,

    #[serde(default)]
    pub presets: PresetsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Raw `[[files]]` records. Parsed one at a time by
    /// [`InstanceSet::from_records`](crate::InstanceSet::from_records) so a
    /// bad record does not reject the whole file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<toml::Value>,
}

/// `[repofig]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
        }
    }
}

/// `[init]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitConfig {
    /// Replace files that already exist when generating.
    #[serde(default)]
    pub overwrite_existing: bool,
}

/// `[presets]` section: tier directory overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_dir: Option<PathBuf>,

    /// Relative paths are taken from the repository root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_dir: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write JSON logs under `.repofig/logs/`.
    #[serde(default)]
    pub file: bool,

    /// Days to keep log files before they are removed at start-up.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: false,
            retention_days: default_retention_days(),
        }
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_owned()
}

fn default_retention_days() -> u64 {
    3
}

// ── Loading and saving ───────────────────────────────────────

/// Load [`ProjectConfig`] from `.repofig.toml`.
///
/// If the file does not exist, returns the default configuration.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file exists but cannot be read.
/// Returns `CoreError::TomlParse` if the file contains invalid TOML.
pub fn load_project_config(config_path: &Path) -> Result<ProjectConfig, CoreError> {
    if !config_path.exists() {
        debug!(path = %config_path.display(), "no project config, using defaults");
        return Ok(ProjectConfig::default());
    }
    let content = fs::read_to_string(config_path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Write [`ProjectConfig`] to `config_path` atomically.
///
/// # Errors
///
/// Returns `CoreError::TomlWrite` if serialization fails and `CoreError::Io`
/// if the file cannot be written.
pub fn save_project_config(config_path: &Path, config: &ProjectConfig) -> Result<(), CoreError> {
    let content = toml::to_string_pretty(config)?;
    write_atomic(config_path, &content)?;
    debug!(path = %config_path.display(), "project config saved");
    Ok(())
}

/// Platform default for the User tier, e.g. `~/.config/repofig/presets`.
pub fn default_user_presets_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "repofig").map(|dirs| dirs.config_dir().join("presets"))
}

/// Check the shape of a raw config document before it is deserialized.
///
/// Reports sections of the wrong kind, `[[files]]` records missing required
/// keys or naming unknown types, and repeated instance ids. A missing or
/// different schema version is only a warning.
pub fn check_config_structure(document: &toml::Table) -> ValidationResult {
    let mut result = ValidationResult::new();

    match document.get("repofig") {
        None => result.add_warning("Missing 'repofig.schema_version' - using default"),
        Some(toml::Value::Table(meta)) => match meta.get("schema_version") {
            None => result.add_warning("Missing 'repofig.schema_version' - using default"),
            Some(toml::Value::String(version)) if version == SCHEMA_VERSION => {}
            Some(other) => result.add_warning(format!(
                "Schema version mismatch: config has '{}', expected '{SCHEMA_VERSION}'",
                other.as_str().unwrap_or(&other.to_string())
            )),
        },
        Some(_) => result.add_error("Section 'repofig' must be a table"),
    }

    for section in ["init", "presets", "logging"] {
        if let Some(value) = document.get(section)
            && !value.is_table()
        {
            result.add_error(format!("Section '{section}' must be a table"));
        }
    }

    if let Some(init) = document.get("init").and_then(toml::Value::as_table)
        && init
            .get("overwrite_existing")
            .is_some_and(|v| !v.is_bool())
    {
        result.add_error("'init.overwrite_existing' must be a boolean");
    }

    match document.get("files") {
        None => {}
        Some(toml::Value::Array(records)) => check_file_records(records, &mut result),
        Some(_) => result.add_error("Section 'files' must be an array of tables"),
    }

    result
}

fn check_file_records(records: &[toml::Value], result: &mut ValidationResult) {
    let mut seen = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        let Some(table) = record.as_table() else {
            result.add_error(format!("File instance at index {index} must be a table"));
            continue;
        };

        for field in ["id", "type", "preset", "path"] {
            if !table.contains_key(field) {
                result.add_error(format!(
                    "File instance at index {index} missing required field: '{field}'"
                ));
            }
        }

        if let Some(file_type) = table.get("type").and_then(toml::Value::as_str)
            && file_type.parse::<FileType>().is_err()
        {
            result.add_error(format!(
                "File instance at index {index} has unknown type '{file_type}'"
            ));
        }

        if let Some(id) = table.get("id").and_then(toml::Value::as_str)
            && !seen.insert(id)
        {
            result.add_error(format!("Duplicate instance ID '{id}' at index {index}"));
        }
    }
}
