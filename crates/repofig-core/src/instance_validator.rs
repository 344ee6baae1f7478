//! Whole-instance validation against the store and the other instances.

use std::path::Path;

use tracing::{debug, instrument};

use crate::instance::{FileInstance, InstanceSet};
use crate::path_security::PathSecurityValidator;
use crate::store::TieredPresetStore;
use crate::validation::ValidationResult;

/// Whether the instance is being added or already exists in the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
}

/// Runs every instance check and reports all findings at once.
#[derive(Debug, Clone, Copy)]
pub struct InstanceValidator<'a> {
    store: &'a TieredPresetStore,
    paths: PathSecurityValidator<'a>,
}

impl<'a> InstanceValidator<'a> {
    pub fn new(store: &'a TieredPresetStore, repo_root: &'a Path) -> Self {
        Self {
            store,
            paths: PathSecurityValidator::new(repo_root),
        }
    }

    /// Validate `instance` against `all` and the preset store.
    ///
    /// Checks run in a fixed order and never short-circuit: duplicate id
    /// (create only), preset existence, preset type, path rules, path
    /// conflicts with other enabled instances, then single-instance types.
    #[instrument(skip_all, fields(id = %instance.id, ?mode))]
    pub fn validate(
        &self,
        instance: &FileInstance,
        all: &InstanceSet,
        mode: ValidationMode,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if mode == ValidationMode::Create && all.contains(&instance.id) {
            result.add_error(format!(
                "Instance with ID '{}' already exists",
                instance.id
            ));
        }

        match self.store.find(&instance.preset) {
            None => result.add_error(format!("Preset '{}' not found", instance.preset)),
            Some(preset) if preset.file_type != instance.file_type => {
                result.add_error(format!(
                    "Preset type mismatch: preset is for {}, but instance is for {}",
                    preset.file_type, instance.file_type
                ));
            }
            Some(_) => {}
        }

        result.absorb(self.paths.validate(&instance.path, instance.file_type));

        let others = || {
            all.iter()
                .filter(move |other| mode == ValidationMode::Create || other.id != instance.id)
        };

        for other in others().filter(|o| o.enabled && o.path == instance.path) {
            result.add_warning(format!(
                "Path '{}' is already used by instance '{}'",
                instance.path, other.id
            ));
        }

        let applies = mode == ValidationMode::Create || instance.enabled;
        if applies && !instance.file_type.supports_multiple() {
            let taken = others()
                .any(|o| o.enabled && o.file_type == instance.file_type && o.id != instance.id);
            if taken {
                result.add_error(format!(
                    "File type '{}' does not support multiple instances. An instance already exists.",
                    instance.file_type
                ));
            }
        }

        debug!(
            errors = result.errors().len(),
            warnings = result.warnings().len(),
            "instance validated"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::file_type::FileType;
    use crate::store::StoreConfig;

    struct Setup {
        repo: TempDir,
        store: TieredPresetStore,
    }

    fn setup() -> Setup {
        Setup {
            repo: TempDir::new().expect("should create temp dir"),
            store: TieredPresetStore::new(StoreConfig::builder().build()),
        }
    }

    fn instance(id: &str, file_type: FileType, preset: &str, path: &str) -> FileInstance {
        FileInstance::builder()
            .id(id)
            .file_type(file_type)
            .preset(preset)
            .path(path)
            .build()
    }

    #[test]
    fn test_should_accept_valid_instance() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let inst = FileInstance::with_defaults(FileType::ClaudeMd, "default");

        let result = validator.validate(&inst, &InstanceSet::new(), ValidationMode::Create);
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_should_report_duplicate_id_only_on_create() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let inst = FileInstance::with_defaults(FileType::ClaudeMd, "default");
        let all: InstanceSet = [inst.clone()].into_iter().collect();

        let created = validator.validate(&inst, &all, ValidationMode::Create);
        assert!(
            created
                .errors()
                .contains(&"Instance with ID 'claude_md-default' already exists".to_owned())
        );

        let updated = validator.validate(&inst, &all, ValidationMode::Update);
        assert!(updated.is_valid(), "{:?}", updated.errors());
        assert!(!updated.has_warnings(), "self is not a path conflict");
    }

    #[test]
    fn test_should_report_missing_preset_without_type_check() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let inst = instance("x", FileType::ClaudeMd, "claude_md:ghost", "CLAUDE.md");

        let result = validator.validate(&inst, &InstanceSet::new(), ValidationMode::Create);
        assert_eq!(result.errors(), ["Preset 'claude_md:ghost' not found"]);
    }

    #[test]
    fn test_should_report_type_mismatch() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let inst = instance("x", FileType::ClaudeMd, "gitignore:python", "CLAUDE.md");

        let result = validator.validate(&inst, &InstanceSet::new(), ValidationMode::Create);
        assert_eq!(
            result.errors(),
            ["Preset type mismatch: preset is for gitignore, but instance is for claude_md"]
        );
    }

    #[test]
    fn test_should_collect_errors_in_check_order() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let existing = instance("dup", FileType::ClaudeMd, "claude_md:default", "CLAUDE.md");
        let all: InstanceSet = [existing].into_iter().collect();
        let inst = instance("dup", FileType::ClaudeMd, "claude_md:ghost", "../../etc/passwd");

        let result = validator.validate(&inst, &all, ValidationMode::Create);
        let errors = result.errors();
        assert_eq!(errors[0], "Instance with ID 'dup' already exists");
        assert_eq!(errors[1], "Preset 'claude_md:ghost' not found");
        assert!(errors[2].contains("parent directory"));
    }

    #[test]
    fn test_should_warn_on_shared_path_with_enabled_instance() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let mut disabled = instance("off", FileType::ClaudeMd, "claude_md:minimal", "CLAUDE.md");
        disabled.enabled = false;
        let all: InstanceSet = [
            instance("first", FileType::ClaudeMd, "claude_md:default", "CLAUDE.md"),
            disabled,
        ]
        .into_iter()
        .collect();
        let inst = instance("second", FileType::ClaudeMd, "claude_md:backend", "CLAUDE.md");

        let result = validator.validate(&inst, &all, ValidationMode::Create);
        assert!(result.is_valid());
        assert_eq!(
            result.warnings(),
            ["Path 'CLAUDE.md' is already used by instance 'first'"]
        );
    }

    #[test]
    fn test_should_reject_second_single_instance_type() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let all: InstanceSet = [FileInstance::with_defaults(FileType::Statusline, "default")]
            .into_iter()
            .collect();
        let inst = instance(
            "statusline-other",
            FileType::Statusline,
            "statusline:default",
            "scripts/status.sh",
        );

        let result = validator.validate(&inst, &all, ValidationMode::Create);
        assert!(!result.is_valid());
        assert!(
            result
                .errors()
                .iter()
                .any(|e| e.contains("does not support multiple"))
        );
    }

    #[test]
    fn test_should_allow_disabled_update_of_single_instance_type() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let mut second = FileInstance::with_defaults(FileType::SettingsJson, "strict");
        second.enabled = false;
        let all: InstanceSet = [
            FileInstance::with_defaults(FileType::SettingsJson, "default"),
            second.clone(),
        ]
        .into_iter()
        .collect();

        let result = validator.validate(&second, &all, ValidationMode::Update);
        assert!(
            !result
                .errors()
                .iter()
                .any(|e| e.contains("does not support multiple"))
        );

        second.enabled = true;
        let result = validator.validate(&second, &all, ValidationMode::Update);
        assert!(
            result
                .errors()
                .iter()
                .any(|e| e.contains("does not support multiple"))
        );
    }

    #[test]
    fn test_should_not_count_self_on_update() {
        let s = setup();
        let validator = InstanceValidator::new(&s.store, s.repo.path());
        let only = FileInstance::with_defaults(FileType::Statusline, "default");
        let all: InstanceSet = [only.clone()].into_iter().collect();

        let result = validator.validate(&only, &all, ValidationMode::Update);
        assert!(result.is_valid(), "{:?}", result.errors());
    }
}
