//! Three-tier preset storage with override priority.
//!
//! Presets are scanned lazily on first access, in the order Library, User,
//! Project. A later tier overwrites earlier entries with the same id in the
//! merged view, while every tier's own entries stay reachable through the
//! per-tier accessors. Files that fail to parse are recorded as load errors
//! and skipped; a scan never aborts.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use typed_builder::TypedBuilder;

use crate::builtin::{builtin_content, builtin_presets};
use crate::error::CoreError;
use crate::file_type::FileType;
use crate::fsutil::write_atomic;
use crate::preset::{
    DECLARATION_FILE, Preset, PresetTier, read_declaration, resolve_template_path,
    to_declaration_toml,
};
use crate::validation::validate_identifier;

/// Where each tier's presets live.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use repofig_core::{PresetTier, StoreConfig};
///
/// let config = StoreConfig::builder()
///     .user_dir(PathBuf::from("/home/me/.config/repofig/presets"))
///     .build();
///
/// assert!(config.builtins);
/// assert!(config.root(PresetTier::Project).is_none());
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreConfig {
    /// Include the presets compiled into the binary.
    #[builder(default = true)]
    pub builtins: bool,

    /// Extra directory scanned into the Library tier after the packaged presets.
    #[builder(default, setter(strip_option, into))]
    pub library_dir: Option<PathBuf>,

    #[builder(default, setter(strip_option, into))]
    pub user_dir: Option<PathBuf>,

    #[builder(default, setter(strip_option, into))]
    pub project_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Directory backing a tier, if one is configured.
    pub fn root(&self, tier: PresetTier) -> Option<&Path> {
        match tier {
            PresetTier::Library => self.library_dir.as_deref(),
            PresetTier::User => self.user_dir.as_deref(),
            PresetTier::Project => self.project_dir.as_deref(),
        }
    }
}

#[derive(Debug, Default)]
struct PresetCache {
    tiers: BTreeMap<PresetTier, BTreeMap<String, Preset>>,
    /// Winning tier per id.
    index: BTreeMap<String, PresetTier>,
    load_errors: Vec<String>,
}

impl PresetCache {
    fn scan(config: &StoreConfig) -> Self {
        let mut cache = Self::default();
        if config.builtins {
            for preset in builtin_presets() {
                cache.insert(preset);
            }
        }
        for tier in PresetTier::SCAN_ORDER {
            if let Some(root) = config.root(tier) {
                cache.scan_root(root, tier);
            }
        }
        info!(
            presets = cache.index.len(),
            errors = cache.load_errors.len(),
            "preset scan complete"
        );
        cache
    }

    fn scan_root(&mut self, root: &Path, tier: PresetTier) {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%tier, root = %root.display(), "tier root does not exist");
                return;
            }
            Err(e) => {
                self.record(format!(
                    "Failed to read preset directory {}: {e}",
                    root.display()
                ));
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for path in paths {
            let declaration = if path.is_dir() {
                let candidate = path.join(DECLARATION_FILE);
                if !candidate.is_file() {
                    continue;
                }
                candidate
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                path
            } else {
                continue;
            };

            match read_declaration(&declaration, tier) {
                Ok(Some(preset)) => {
                    debug!(id = %preset.id, %tier, "loaded preset");
                    self.insert(preset);
                }
                Ok(None) => debug!(path = %declaration.display(), "no [preset] table, skipping"),
                Err(CoreError::Io(e)) => self.record(format!(
                    "Failed to read preset file {}: {e}",
                    declaration.display()
                )),
                Err(e) => self.record(format!(
                    "Invalid preset data in {}: {e}",
                    declaration.display()
                )),
            }
        }
    }

    fn record(&mut self, message: String) {
        warn!("{message}");
        self.load_errors.push(message);
    }

    fn insert(&mut self, preset: Preset) {
        let id = preset.id.clone();
        self.tiers
            .entry(preset.source_tier)
            .or_default()
            .insert(id.clone(), preset);
        self.reindex(&id);
    }

    fn remove(&mut self, id: &str, tier: PresetTier) -> Option<Preset> {
        let removed = self.tiers.get_mut(&tier).and_then(|m| m.remove(id));
        self.reindex(id);
        removed
    }

    /// Point the merged index at the highest tier still declaring `id`.
    fn reindex(&mut self, id: &str) {
        let winner = self
            .tiers
            .iter()
            .rev()
            .find(|(_, presets)| presets.contains_key(id))
            .map(|(tier, _)| *tier);
        match winner {
            Some(tier) => {
                self.index.insert(id.to_owned(), tier);
            }
            None => {
                self.index.remove(id);
            }
        }
    }

    fn tier_entry(&self, id: &str, tier: PresetTier) -> Option<&Preset> {
        self.tiers.get(&tier).and_then(|m| m.get(id))
    }

    fn merged(&self, id: &str) -> Option<&Preset> {
        let tier = self.index.get(id)?;
        self.tier_entry(id, *tier)
    }
}

/// Preset lookup across the Library, User and Project tiers.
///
/// One store belongs to one session. Reads populate the cache on first use;
/// [`clear_cache`](Self::clear_cache) drops it so the next read rescans.
///
/// # Examples
///
/// ```
/// use repofig_core::{PresetTier, StoreConfig, TieredPresetStore};
///
/// let store = TieredPresetStore::new(StoreConfig::builder().build());
/// let preset = store.get("claude_md:default").unwrap();
/// assert_eq!(preset.source_tier, PresetTier::Library);
/// ```
#[derive(Debug)]
pub struct TieredPresetStore {
    config: StoreConfig,
    cache: OnceCell<PresetCache>,
}

impl TieredPresetStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            cache: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn cache(&self) -> &PresetCache {
        self.cache.get_or_init(|| PresetCache::scan(&self.config))
    }

    fn with_cache_mut<R>(&mut self, f: impl FnOnce(&mut PresetCache, &StoreConfig) -> R) -> R {
        let mut cache = self
            .cache
            .take()
            .unwrap_or_else(|| PresetCache::scan(&self.config));
        let result = f(&mut cache, &self.config);
        // The cell was emptied by `take` above, so this cannot fail.
        let _ = self.cache.set(cache);
        result
    }

    /// Look up the winning preset for an id.
    pub fn find(&self, id: &str) -> Option<&Preset> {
        self.cache().merged(id)
    }

    /// Like [`find`](Self::find), but a missing id is an error.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PresetNotFound` if no tier declares `id`.
    pub fn get(&self, id: &str) -> Result<&Preset, CoreError> {
        self.find(id)
            .ok_or_else(|| CoreError::PresetNotFound(id.to_owned()))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Merged view, optionally filtered, sorted by type then name.
    pub fn list(&self, file_type: Option<FileType>, tier: Option<PresetTier>) -> Vec<&Preset> {
        let cache = self.cache();
        let mut presets: Vec<&Preset> = cache
            .index
            .keys()
            .filter_map(|id| cache.merged(id))
            .filter(|p| file_type.is_none_or(|t| p.file_type == t))
            .filter(|p| tier.is_none_or(|t| p.source_tier == t))
            .collect();
        sort_presets(&mut presets);
        presets
    }

    /// Every preset one tier declares, shadowed ones included.
    pub fn list_tier(&self, tier: PresetTier) -> Vec<&Preset> {
        let mut presets: Vec<&Preset> = self
            .cache()
            .tiers
            .get(&tier)
            .map(|m| m.values().collect())
            .unwrap_or_default();
        sort_presets(&mut presets);
        presets
    }

    /// A tier's own entry for an id, even when a higher tier shadows it.
    pub fn get_from_tier(&self, id: &str, tier: PresetTier) -> Option<&Preset> {
        self.cache().tier_entry(id, tier)
    }

    /// Every tier's entry for an id, lowest tier first.
    pub fn declarations(&self, id: &str) -> Vec<&Preset> {
        self.cache()
            .tiers
            .values()
            .filter_map(|m| m.get(id))
            .collect()
    }

    /// Errors recorded while scanning. Stable until the cache is cleared.
    pub fn load_errors(&self) -> &[String] {
        &self.cache().load_errors
    }

    pub fn clear_cache(&mut self) {
        if self.cache.take().is_some() {
            debug!("preset cache cleared");
        }
    }

    /// Drop the cache and scan all tiers again.
    pub fn reload(&mut self) {
        self.clear_cache();
        self.cache();
    }

    /// Store a new preset in a writable tier.
    ///
    /// The declaration is written to `<tier root>/<type>_<name>/preset.toml`.
    /// A User preset may shadow a Library preset with the same id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::BuiltInModification` for the Library tier,
    /// `CoreError::InvalidPreset` if the id does not match the type or the
    /// name is not an identifier, `CoreError::Config` if the tier has no
    /// directory, `CoreError::PresetExists` if the tier already declares the
    /// id and `CoreError::DeclarationExists` if the target file is taken.
    #[instrument(skip(self, preset), fields(id = %preset.id))]
    pub fn add(&mut self, mut preset: Preset, tier: PresetTier) -> Result<(), CoreError> {
        if !tier.is_mutable() {
            return Err(CoreError::BuiltInModification {
                operation: "add",
                id: preset.id,
            });
        }
        preset.check_identity()?;
        check_preset_name(&preset)?;

        self.with_cache_mut(|cache, config| {
            let root = config.root(tier).ok_or_else(|| {
                CoreError::Config(format!("no preset directory configured for the {tier} tier"))
            })?;
            if cache.tier_entry(&preset.id, tier).is_some() {
                return Err(CoreError::PresetExists(preset.id));
            }

            let path = root
                .join(format!("{}_{}", preset.file_type.as_str(), preset.short_name()))
                .join(DECLARATION_FILE);
            if path.exists() {
                return Err(CoreError::DeclarationExists { path });
            }
            preset.template_path = preset
                .template_path
                .take()
                .map(|p| resolve_template_path(p, &path));
            write_atomic(&path, &to_declaration_toml(&preset, &path)?)?;

            info!(%tier, path = %path.display(), "preset added");
            preset.source_tier = tier;
            preset.declaration_path = Some(path);
            cache.insert(preset);
            Ok(())
        })
    }

    /// Replace the winning declaration of an existing preset.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PresetNotFound` for an unknown id,
    /// `CoreError::BuiltInModification` if the winning entry is a Library
    /// preset and `CoreError::InvalidPreset` if the id does not match the type.
    #[instrument(skip(self, preset), fields(id = %preset.id))]
    pub fn update(&mut self, mut preset: Preset) -> Result<(), CoreError> {
        preset.check_identity()?;
        self.with_cache_mut(|cache, config| {
            let current = cache
                .merged(&preset.id)
                .ok_or_else(|| CoreError::PresetNotFound(preset.id.clone()))?;
            let tier = current.source_tier;
            if !tier.is_mutable() {
                return Err(CoreError::BuiltInModification {
                    operation: "update",
                    id: preset.id,
                });
            }

            let path = match current.declaration_path.clone() {
                Some(path) => path,
                None => {
                    check_preset_name(&preset)?;
                    let root = config.root(tier).ok_or_else(|| {
                        CoreError::Config(format!(
                            "no preset directory configured for the {tier} tier"
                        ))
                    })?;
                    root.join(format!("{}_{}", preset.file_type.as_str(), preset.short_name()))
                        .join(DECLARATION_FILE)
                }
            };
            preset.template_path = preset
                .template_path
                .take()
                .map(|p| resolve_template_path(p, &path));
            write_atomic(&path, &to_declaration_toml(&preset, &path)?)?;

            info!(%tier, path = %path.display(), "preset updated");
            preset.source_tier = tier;
            preset.declaration_path = Some(path);
            cache.insert(preset);
            Ok(())
        })
    }

    /// Remove the winning declaration of a preset.
    ///
    /// If a lower tier declares the same id, that entry wins afterwards.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PresetNotFound` for an unknown id and
    /// `CoreError::BuiltInModification` if the winning entry is a Library preset.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> Result<(), CoreError> {
        self.with_cache_mut(|cache, config| {
            let current = cache
                .merged(id)
                .ok_or_else(|| CoreError::PresetNotFound(id.to_owned()))?;
            let tier = current.source_tier;
            if !tier.is_mutable() {
                return Err(CoreError::BuiltInModification {
                    operation: "delete",
                    id: id.to_owned(),
                });
            }

            if let Some(path) = current.declaration_path.clone() {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        debug!(path = %path.display(), "declaration already gone");
                    }
                    Err(e) => return Err(e.into()),
                }
                remove_empty_preset_dir(&path, config.root(tier));
            }

            cache.remove(id, tier);
            info!(%tier, "preset deleted");
            Ok(())
        })
    }

    /// Template text for a preset.
    ///
    /// Looked up in order: the explicit `template_path`, a file named after
    /// the type's template file next to a `preset.toml` declaration, then the
    /// packaged content of a Library preset.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::TemplateNotFound` when no source has content and
    /// `CoreError::Io` if an existing file cannot be read.
    pub fn template_content(&self, preset: &Preset) -> Result<String, CoreError> {
        if let Some(path) = &preset.template_path {
            return read_template(path, &preset.id);
        }

        if let Some(declaration) = preset.declaration_path()
            && declaration.file_name().is_some_and(|n| n == DECLARATION_FILE)
        {
            let sibling = declaration.with_file_name(preset.file_type.template_file_name());
            if sibling.is_file() {
                return read_template(&sibling, &preset.id);
            }
        }

        if preset.source_tier == PresetTier::Library
            && let Some(content) = builtin_content(&preset.id)
        {
            return Ok(content.to_owned());
        }

        Err(CoreError::TemplateNotFound(preset.id.clone()))
    }
}

fn sort_presets(presets: &mut [&Preset]) {
    presets.sort_by(|a, b| {
        (a.file_type.as_str(), a.name.as_str(), a.id.as_str()).cmp(&(
            b.file_type.as_str(),
            b.name.as_str(),
            b.id.as_str(),
        ))
    });
}

/// The name part of the id becomes a directory name, so it must be an
/// identifier.
fn check_preset_name(preset: &Preset) -> Result<(), CoreError> {
    let result = validate_identifier(preset.short_name(), "preset name");
    if result.is_valid() {
        Ok(())
    } else {
        Err(CoreError::InvalidPreset(format!(
            "{}: {}",
            preset.id,
            result.errors().join("; ")
        )))
    }
}

fn read_template(path: &Path, id: &str) -> Result<String, CoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "template file missing");
            Err(CoreError::TemplateNotFound(id.to_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a preset's own directory once its declaration is gone.
fn remove_empty_preset_dir(declaration: &Path, root: Option<&Path>) {
    let Some(dir) = declaration.parent() else {
        return;
    };
    if root.is_some_and(|root| root == dir) {
        return;
    }
    let is_empty = fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
    if is_empty && let Err(e) = fs::remove_dir(dir) {
        debug!(dir = %dir.display(), error = %e, "could not remove preset directory");
    }
}
