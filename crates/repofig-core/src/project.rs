//! Project session.
//!
//! The [`Project`] is the main entry point for repofig-core. It owns one
//! preset store, the project's file instances and its configuration, and
//! refuses to store an instance that fails validation.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::config::{
    ProjectConfig, ProjectOptions, default_user_presets_dir, load_project_config,
    save_project_config,
};
use crate::error::CoreError;
use crate::file_type::FileType;
use crate::id_gen::generate_instance_id;
use crate::inheritance::InheritanceResolver;
use crate::instance::{FileInstance, InstanceSet};
use crate::instance_validator::{InstanceValidator, ValidationMode};
use crate::preset::{Preset, Variables};
use crate::render::PresetRenderer;
use crate::store::{StoreConfig, TieredPresetStore};
use crate::validation::ValidationResult;

/// A repository opened for preset resolution and instance management.
///
/// # Examples
///
/// ```no_run
/// use repofig_core::{FileType, Project, ProjectOptions};
///
/// # fn example() -> Result<(), repofig_core::CoreError> {
/// let mut project = Project::open(ProjectOptions::builder().repo_path(".").build())?;
/// let instance = project.new_instance(FileType::ClaudeMd, "default", None);
/// let result = project.add_instance(instance);
/// if result.is_valid() {
///     project.save()?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Project {
    options: ProjectOptions,
    config: ProjectConfig,
    store: TieredPresetStore,
    instances: InstanceSet,
    /// Records from `.repofig.toml` that could not be loaded.
    instance_errors: Vec<String>,
}

impl Project {
    /// Open a project.
    ///
    /// Reads `.repofig.toml` (defaults if missing), configures the preset
    /// tiers and loads the file instances. Broken instance records are
    /// skipped and reported by [`instance_errors`](Self::instance_errors).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Io` if the config file cannot be read.
    /// Returns `CoreError::TomlParse` if it is not valid TOML.
    #[instrument(skip_all)]
    pub fn open(options: ProjectOptions) -> Result<Self, CoreError> {
        info!(repo = %options.repo_path().display(), "opening project");

        let config = load_project_config(&options.config_path())?;
        let store = TieredPresetStore::new(store_config(&options, &config));
        let (instances, instance_errors) = InstanceSet::from_records(&config.files);
        if !instance_errors.is_empty() {
            warn!(count = instance_errors.len(), "some file instances were skipped");
        }

        Ok(Self {
            options,
            config,
            store,
            instances,
            instance_errors,
        })
    }

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn repo_path(&self) -> &Path {
        self.options.repo_path()
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn store(&self) -> &TieredPresetStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TieredPresetStore {
        &mut self.store
    }

    pub fn instances(&self) -> &InstanceSet {
        &self.instances
    }

    pub fn instance_errors(&self) -> &[String] {
        &self.instance_errors
    }

    fn validator(&self) -> InstanceValidator<'_> {
        InstanceValidator::new(&self.store, self.options.repo_path())
    }

    /// Build an instance with a fresh id. `path` defaults to the type's
    /// default location.
    pub fn new_instance(
        &self,
        file_type: FileType,
        preset_name: &str,
        path: Option<&str>,
    ) -> FileInstance {
        let id = generate_instance_id(file_type, preset_name, path, &self.instances);
        FileInstance::builder()
            .id(id)
            .file_type(file_type)
            .preset(Preset::compose_id(file_type, preset_name))
            .path(path.unwrap_or(file_type.default_path()))
            .build()
    }

    /// Validate and add a new instance. Nothing is stored if the result is
    /// invalid.
    #[instrument(skip_all, fields(id = %instance.id))]
    pub fn add_instance(&mut self, instance: FileInstance) -> ValidationResult {
        let result = self
            .validator()
            .validate(&instance, &self.instances, ValidationMode::Create);
        if result.is_valid() {
            info!("instance added");
            self.instances.insert(instance);
        }
        result
    }

    /// Validate and replace an existing instance.
    #[instrument(skip_all, fields(id = %instance.id))]
    pub fn update_instance(&mut self, instance: FileInstance) -> ValidationResult {
        if !self.instances.contains(&instance.id) {
            return ValidationResult::new()
                .with_error(format!("Instance '{}' not found", instance.id));
        }
        let result = self
            .validator()
            .validate(&instance, &self.instances, ValidationMode::Update);
        if result.is_valid() {
            info!("instance updated");
            self.instances.insert(instance);
        }
        result
    }

    /// Remove an instance.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InstanceNotFound` for an unknown id.
    pub fn remove_instance(&mut self, id: &str) -> Result<FileInstance, CoreError> {
        let removed = self
            .instances
            .remove(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_owned()))?;
        info!(id, "instance removed");
        Ok(removed)
    }

    /// Enable an instance after re-validating it in its enabled state.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InstanceNotFound` for an unknown id.
    pub fn enable_instance(&mut self, id: &str) -> Result<ValidationResult, CoreError> {
        let mut instance = self
            .instances
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_owned()))?;
        instance.enabled = true;
        Ok(self.update_instance(instance))
    }

    /// Disable an instance. Disabling never fails validation.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InstanceNotFound` for an unknown id.
    pub fn disable_instance(&mut self, id: &str) -> Result<(), CoreError> {
        if !self.instances.set_enabled(id, false) {
            return Err(CoreError::InstanceNotFound(id.to_owned()));
        }
        info!(id, "instance disabled");
        Ok(())
    }

    /// Re-validate a stored instance.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InstanceNotFound` for an unknown id.
    pub fn validate_instance(&self, id: &str) -> Result<ValidationResult, CoreError> {
        let instance = self
            .instances
            .get(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_owned()))?;
        Ok(self
            .validator()
            .validate(instance, &self.instances, ValidationMode::Update))
    }

    /// Validate every stored instance, in insertion order.
    pub fn validate_all(&self) -> Vec<(String, ValidationResult)> {
        let validator = self.validator();
        self.instances
            .iter()
            .map(|instance| {
                (
                    instance.id.clone(),
                    validator.validate(instance, &self.instances, ValidationMode::Update),
                )
            })
            .collect()
    }

    /// The instance's preset variables, inherited, with its overrides on top.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::PresetNotFound` if the instance's preset is unknown.
    pub fn resolved_variables(&self, instance: &FileInstance) -> Result<Variables, CoreError> {
        let preset = self.store.get(&instance.preset)?;
        let mut vars = InheritanceResolver::new(&self.store).resolve(preset);
        vars.extend(
            instance
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(vars)
    }

    /// Render the content an instance would generate.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InstanceNotFound`, `CoreError::PresetNotFound`,
    /// `CoreError::TemplateNotFound` or `CoreError::Template`.
    #[instrument(skip(self))]
    pub fn render_instance(&self, id: &str) -> Result<String, CoreError> {
        let instance = self
            .instances
            .get(id)
            .ok_or_else(|| CoreError::InstanceNotFound(id.to_owned()))?;
        let preset = self.store.get(&instance.preset)?;
        PresetRenderer::new(&self.store).render_preset(preset, &instance.variables)
    }

    /// Write the instances back to `.repofig.toml`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::TomlWrite` or `CoreError::Io` if writing fails.
    #[instrument(skip(self))]
    pub fn save(&mut self) -> Result<(), CoreError> {
        self.config.files = self.instances.to_records()?;
        save_project_config(&self.options.config_path(), &self.config)?;
        info!(instances = self.instances.len(), "project saved");
        Ok(())
    }
}

/// Tier roots: options first, then `[presets]`, then platform defaults.
fn store_config(options: &ProjectOptions, config: &ProjectConfig) -> StoreConfig {
    let repo = options.repo_path();
    let from_repo = |p: &PathBuf| -> PathBuf {
        if p.is_relative() {
            repo.join(p)
        } else {
            p.clone()
        }
    };

    let user_dir = options
        .user_dir()
        .map(Path::to_path_buf)
        .or_else(|| config.presets.user_dir.clone())
        .or_else(default_user_presets_dir);
    let project_dir = options
        .project_dir()
        .map(Path::to_path_buf)
        .or_else(|| config.presets.project_dir.as_ref().map(from_repo))
        .unwrap_or_else(|| options.default_project_presets_dir());
    let library_dir = options
        .library_dir()
        .map(Path::to_path_buf)
        .or_else(|| config.presets.library_dir.as_ref().map(from_repo));

    StoreConfig {
        builtins: options.builtins(),
        library_dir,
        user_dir,
        project_dir: Some(project_dir),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::preset::PresetTier;

    struct Fixture {
        repo: TempDir,
        user: TempDir,
    }

    fn fixture() -> Fixture {
        Fixture {
            repo: TempDir::new().expect("should create repo dir"),
            user: TempDir::new().expect("should create user dir"),
        }
    }

    fn open(fx: &Fixture) -> Project {
        Project::open(
            ProjectOptions::builder()
                .repo_path(fx.repo.path())
                .user_dir(fx.user.path())
                .build(),
        )
        .expect("should open project")
    }

    #[test]
    fn test_should_open_empty_repository() {
        let fx = fixture();
        let project = open(&fx);

        assert!(project.instances().is_empty());
        assert!(project.instance_errors().is_empty());
        assert_eq!(
            project.store().config().project_dir.as_deref(),
            Some(fx.repo.path().join(".repofig/presets").as_path())
        );
        assert!(project.store().exists("claude_md:default"));
    }

    #[test]
    fn test_should_add_save_and_reopen() {
        let fx = fixture();
        let mut project = open(&fx);

        let instance = project.new_instance(FileType::ClaudeMd, "default", None);
        assert_eq!(instance.id, "claude_md-default");
        let result = project.add_instance(instance);
        assert!(result.is_valid(), "{:?}", result.errors());

        let docs = project.new_instance(FileType::ClaudeMd, "backend", Some("docs/CLAUDE.md"));
        assert_eq!(docs.id, "claude_md-backend-docs");
        assert!(project.add_instance(docs).is_valid());

        project.save().expect("should save");

        let reopened = open(&fx);
        let ids: Vec<_> = reopened.instances().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["claude_md-default", "claude_md-backend-docs"]);
    }

    #[test]
    fn test_should_not_store_invalid_instance() {
        let fx = fixture();
        let mut project = open(&fx);

        let mut instance = project.new_instance(FileType::ClaudeMd, "default", None);
        instance.path = "../outside.md".to_owned();
        let result = project.add_instance(instance);

        assert!(!result.is_valid());
        assert!(project.instances().is_empty());
    }

    #[test]
    fn test_should_guard_single_instance_types() {
        let fx = fixture();
        let mut project = open(&fx);

        let first = project.new_instance(FileType::Statusline, "default", None);
        assert!(project.add_instance(first).is_valid());

        let mut second = project.new_instance(FileType::Statusline, "default", Some("bin/status.sh"));
        second.enabled = false;
        let second_id = second.id.clone();
        let result = project.add_instance(second);
        assert!(!result.is_valid(), "creating a second instance is rejected");

        let result = project.update_instance(FileInstance::with_defaults(
            FileType::Statusline,
            "missing",
        ));
        assert_eq!(result.errors(), ["Instance 'statusline-missing' not found"]);

        assert!(matches!(
            project.enable_instance(&second_id),
            Err(CoreError::InstanceNotFound(_))
        ));
    }

    #[test]
    fn test_should_toggle_and_remove_instances() {
        let fx = fixture();
        let mut project = open(&fx);
        let instance = project.new_instance(FileType::Gitignore, "python", None);
        let id = instance.id.clone();
        assert!(project.add_instance(instance).is_valid());

        project.disable_instance(&id).expect("should disable");
        assert!(!project.instances().get(&id).is_some_and(|i| i.enabled));

        let result = project.enable_instance(&id).expect("exists");
        assert!(result.is_valid());
        assert!(project.instances().get(&id).is_some_and(|i| i.enabled));

        project.remove_instance(&id).expect("should remove");
        assert!(matches!(
            project.remove_instance(&id),
            Err(CoreError::InstanceNotFound(_))
        ));
        assert!(project.disable_instance(&id).is_err());
    }

    #[test]
    fn test_should_report_broken_records_on_open() {
        let fx = fixture();
        fs::write(
            fx.repo.path().join(".repofig.toml"),
            r#"
[[files]]
id = "ok"
type = "claude_md"
preset = "claude_md:default"
path = "CLAUDE.md"

[[files]]
id = "bad"
type = "claude_md"
"#,
        )
        .expect("should write config");

        let project = open(&fx);
        assert_eq!(project.instances().len(), 1);
        assert_eq!(project.instance_errors().len(), 1);
        assert!(project.instance_errors()[0].contains("'bad'"));
    }

    #[test]
    fn test_should_validate_stored_instances() {
        let fx = fixture();
        fs::write(
            fx.repo.path().join(".repofig.toml"),
            r#"
[[files]]
id = "good"
type = "claude_md"
preset = "claude_md:default"
path = "CLAUDE.md"

[[files]]
id = "ghost"
type = "claude_md"
preset = "claude_md:ghost"
path = "other/CLAUDE.md"
"#,
        )
        .expect("should write config");

        let project = open(&fx);
        let results = project.validate_all();
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_valid());
        assert!(!results[1].1.is_valid());

        let ghost = project.validate_instance("ghost").expect("exists");
        assert_eq!(ghost.errors(), ["Preset 'claude_md:ghost' not found"]);
        assert!(project.validate_instance("nope").is_err());
    }

    #[test]
    fn test_should_render_instance_with_overrides() {
        let fx = fixture();
        let mut project = open(&fx);
        let mut instance = project.new_instance(FileType::ClaudeMd, "minimal", None);
        instance.variables.insert(
            "project_name".to_owned(),
            toml::Value::String("Widgets".to_owned()),
        );
        let id = instance.id.clone();
        assert!(project.add_instance(instance.clone()).is_valid());

        let vars = project.resolved_variables(&instance).expect("preset exists");
        assert_eq!(
            vars.get("project_name"),
            Some(&toml::Value::String("Widgets".to_owned()))
        );

        let text = project.render_instance(&id).expect("should render");
        assert!(text.starts_with("# Widgets\n"));
    }

    #[test]
    fn test_should_use_project_tier_from_config() {
        let fx = fixture();
        fs::write(
            fx.repo.path().join(".repofig.toml"),
            "[presets]\nproject_dir = \"team-presets\"\n",
        )
        .expect("should write config");
        fs::create_dir_all(fx.repo.path().join("team-presets")).expect("should create dir");
        fs::write(
            fx.repo.path().join("team-presets/p.toml"),
            "[preset]\nid = \"claude_md:team\"\ntype = \"claude_md\"\nname = \"Team\"\n",
        )
        .expect("should write preset");

        let project = open(&fx);
        let preset = project.store().get("claude_md:team").expect("should load");
        assert_eq!(preset.source_tier, PresetTier::Project);
    }
}
