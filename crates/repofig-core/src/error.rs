use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("preset not found: {0}")]
    PresetNotFound(String),

    #[error("preset already exists: {0}")]
    PresetExists(String),

    #[error("declaration file {} already exists", .path.display())]
    DeclarationExists { path: std::path::PathBuf },

    #[error("cannot {operation} library preset {id}: library presets are read-only")]
    BuiltInModification { operation: &'static str, id: String },

    #[error("invalid preset: {0}")]
    InvalidPreset(String),

    #[error("invalid or unsupported file type: {0}")]
    InvalidFileType(String),

    #[error("file instance not found: {0}")]
    InstanceNotFound(String),

    #[error("template not found for preset {0}")]
    TemplateNotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(#[from] repofig_tpl::TplError),

    #[error("invalid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
