//! Preset data model and the on-disk declaration format.
//!
//! A preset is declared in a TOML file with a `[preset]` table. The tier a
//! preset belongs to is never read from that file: the loader assigns it from
//! the directory the file was found in.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::CoreError;
use crate::file_type::FileType;

/// Template variables: name to default value.
pub type Variables = BTreeMap<String, toml::Value>;

/// File name of a preset declaration inside its own directory.
pub const DECLARATION_FILE: &str = "preset.toml";

// ── Tiers ────────────────────────────────────────────────────

/// Where a preset comes from. Later variants override earlier ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PresetTier {
    /// Presets shipped with repofig. Read-only.
    #[default]
    Library,
    /// Per-user presets shared by every project.
    User,
    /// Presets stored inside one repository.
    Project,
}

impl PresetTier {
    /// Tiers in scan order, lowest priority first.
    pub const SCAN_ORDER: [PresetTier; 3] =
        [PresetTier::Library, PresetTier::User, PresetTier::Project];

    pub const fn as_str(self) -> &'static str {
        match self {
            PresetTier::Library => "library",
            PresetTier::User => "user",
            PresetTier::Project => "project",
        }
    }

    /// Whether presets in this tier may be added, updated or deleted.
    pub const fn is_mutable(self) -> bool {
        !matches!(self, PresetTier::Library)
    }
}

impl fmt::Display for PresetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "library" | "built-in" | "builtin" => Ok(PresetTier::Library),
            "user" => Ok(PresetTier::User),
            "project" => Ok(PresetTier::Project),
            other => Err(CoreError::Config(format!("unknown preset tier: {other}"))),
        }
    }
}

// ── Preset ───────────────────────────────────────────────────

/// A named, typed template descriptor.
///
/// # Examples
///
/// ```
/// use repofig_core::{FileType, Preset, PresetTier};
///
/// let preset = Preset::builder()
///     .id("claude_md:backend")
///     .file_type(FileType::ClaudeMd)
///     .name("Backend")
///     .source_tier(PresetTier::Project)
///     .build();
///
/// assert_eq!(preset.short_name(), "backend");
/// assert!(preset.check_identity().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, TypedBuilder)]
pub struct Preset {
    /// Identifier in the form `<file-type>:<name>`.
    #[builder(setter(into))]
    pub id: String,

    /// Kind of file this preset generates.
    #[serde(rename = "type")]
    pub file_type: FileType,

    /// Display name.
    #[builder(setter(into))]
    pub name: String,

    #[builder(default, setter(into))]
    pub description: String,

    /// Tier the preset was loaded from or added to.
    #[builder(default = PresetTier::User)]
    pub source_tier: PresetTier,

    /// Explicit location of the template content.
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    /// Default template variables.
    #[builder(default)]
    pub variables: Variables,

    /// Id of the preset this one inherits variables from.
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[builder(default)]
    pub tags: Vec<String>,

    /// Declaration file this preset was read from or written to.
    #[builder(default, setter(skip))]
    #[serde(skip)]
    pub(crate) declaration_path: Option<PathBuf>,
}

impl Preset {
    /// Compose a preset id from a file type and a preset name.
    pub fn compose_id(file_type: FileType, name: &str) -> String {
        format!("{}:{name}", file_type.as_str())
    }

    /// The part of the id after the `:`, or the whole id when there is none.
    pub fn short_name(&self) -> &str {
        split_id(&self.id).map_or(self.id.as_str(), |(_, name)| name)
    }

    /// Path of the declaration file backing this preset, if any.
    pub fn declaration_path(&self) -> Option<&Path> {
        self.declaration_path.as_deref()
    }

    /// Check that the id's type prefix matches `file_type` and the name part
    /// is not empty.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPreset` describing the mismatch.
    pub fn check_identity(&self) -> Result<(), CoreError> {
        let Some((prefix, name)) = split_id(&self.id) else {
            return Err(CoreError::InvalidPreset(format!(
                "id '{}' must have the form '<file-type>:<name>'",
                self.id
            )));
        };
        if prefix != self.file_type.as_str() {
            return Err(CoreError::InvalidPreset(format!(
                "id '{}' has type prefix '{prefix}' but preset type is '{}'",
                self.id, self.file_type
            )));
        }
        if name.is_empty() {
            return Err(CoreError::InvalidPreset(format!(
                "id '{}' has an empty name",
                self.id
            )));
        }
        Ok(())
    }
}

/// Split `type:name` at the first `:`.
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(':')
}

// ── Declaration files ────────────────────────────────────────

/// Body of the `[preset]` table in a declaration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PresetDeclaration {
    id: String,
    #[serde(rename = "type")]
    file_type: FileType,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template_path: Option<PathBuf>,
    #[serde(default)]
    variables: Variables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extends: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DeclarationFile<'a> {
    preset: &'a PresetDeclaration,
}

/// Read a declaration file and build the preset it declares.
///
/// Returns `Ok(None)` for TOML files that carry no `[preset]` table. A
/// relative `template_path` is resolved against the file's directory.
///
/// # Errors
///
/// Returns `CoreError::Io` if the file cannot be read, `CoreError::TomlParse`
/// for malformed TOML or fields, and `CoreError::InvalidPreset` when the id
/// does not match the type.
pub(crate) fn read_declaration(path: &Path, tier: PresetTier) -> Result<Option<Preset>, CoreError> {
    let content = fs::read_to_string(path)?;
    let mut document: toml::Table = toml::from_str(&content)?;
    let Some(table) = document.remove("preset") else {
        return Ok(None);
    };
    let declaration: PresetDeclaration = table.try_into()?;

    let template_path = declaration
        .template_path
        .map(|p| resolve_template_path(p, path));

    let preset = Preset {
        id: declaration.id,
        file_type: declaration.file_type,
        name: declaration.name,
        description: declaration.description,
        source_tier: tier,
        template_path,
        variables: declaration.variables,
        extends: declaration.extends,
        tags: declaration.tags,
        declaration_path: Some(path.to_path_buf()),
    };
    preset.check_identity()?;
    Ok(Some(preset))
}

/// Resolve a declared `template_path` against the directory of the
/// declaration file at `declaration`.
pub(crate) fn resolve_template_path(template_path: PathBuf, declaration: &Path) -> PathBuf {
    match declaration.parent() {
        Some(dir) if template_path.is_relative() => dir.join(template_path),
        _ => template_path,
    }
}

/// Paths under the declaration's directory are written relative to it.
fn declared_template_path(template_path: &Path, declaration: &Path) -> PathBuf {
    declaration
        .parent()
        .and_then(|dir| template_path.strip_prefix(dir).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .map_or_else(|| template_path.to_path_buf(), Path::to_path_buf)
}

/// Render a preset as the TOML of the declaration file at `declaration`.
pub(crate) fn to_declaration_toml(preset: &Preset, declaration: &Path) -> Result<String, CoreError> {
    let declaration = PresetDeclaration {
        id: preset.id.clone(),
        file_type: preset.file_type,
        name: preset.name.clone(),
        description: preset.description.clone(),
        template_path: preset
            .template_path
            .as_deref()
            .map(|p| declared_template_path(p, declaration)),
        variables: preset.variables.clone(),
        extends: preset.extends.clone(),
        tags: preset.tags.clone(),
    };
    Ok(toml::to_string_pretty(&DeclarationFile {
        preset: &declaration,
    })?)
}
