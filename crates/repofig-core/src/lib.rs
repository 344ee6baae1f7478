//! Preset resolution and file instance validation for repofig.
//!
//! Presets come from three tiers (Library, User, Project) where the higher
//! tier wins; [`TieredPresetStore`] loads and caches them,
//! [`InheritanceResolver`] merges variables along `extends` chains, and
//! [`InstanceValidator`] checks a [`FileInstance`] against the store and the
//! rest of the project before anything is written. [`Project`] ties these
//! together for one repository.

mod builtin;
mod config;
mod error;
mod file_type;
mod fsutil;
mod id_gen;
mod inheritance;
mod instance;
mod instance_validator;
mod path_security;
mod preset;
mod project;
mod render;
mod store;
mod validation;

pub use config::{
    CONFIG_FILE, InitConfig, LoggingConfig, MetaConfig, PresetsConfig, ProjectConfig,
    ProjectOptions, SCHEMA_VERSION, check_config_structure, default_user_presets_dir,
    load_project_config, save_project_config,
};
pub use error::CoreError;
pub use file_type::FileType;
pub use id_gen::generate_instance_id;
pub use inheritance::InheritanceResolver;
pub use instance::{FileInstance, InstanceSet};
pub use instance_validator::{InstanceValidator, ValidationMode};
pub use path_security::PathSecurityValidator;
pub use preset::{Preset, PresetTier, Variables, split_id};
pub use project::Project;
pub use render::PresetRenderer;
pub use store::{StoreConfig, TieredPresetStore};
pub use validation::{ValidationResult, validate_identifier};
