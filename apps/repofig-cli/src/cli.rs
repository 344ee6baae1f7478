use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use repofig_core::{
    FileType, Preset, PresetRenderer, PresetTier, Project, ProjectOptions, ValidationResult,
    Variables, check_config_structure, split_id,
};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "repofig",
    version,
    about = "Manage presets and file instances for Claude Code repository configuration"
)]
pub struct Cli {
    /// Path to the target repository
    #[arg(long, global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and manage presets
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },

    /// Inspect and manage file instances
    Files {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Validate the config file and every file instance (exit status 1 on errors)
    Validate,

    /// Print the content a file instance would generate
    Render {
        /// Instance id
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum PresetCommands {
    /// List presets, highest tier wins
    List {
        /// Only presets of this file type
        #[arg(long = "type")]
        file_type: Option<FileType>,

        /// Only presets from this tier
        #[arg(long)]
        tier: Option<PresetTier>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one preset with its inherited variables
    Show { id: String },

    /// Create a preset in the user or project tier
    Create {
        /// Preset id, `<file-type>:<name>`
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "user")]
        tier: PresetTier,

        /// Parent preset id
        #[arg(long)]
        extends: Option<String>,

        /// Default variable, `key=value` (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, toml::Value)>,
    },

    /// Delete a user or project preset
    Delete { id: String },

    /// Compare a preset's template with its variables
    Check { id: String },

    /// Show errors from the last preset scan
    Errors,
}

#[derive(Debug, Subcommand)]
pub enum FileCommands {
    /// List file instances
    List {
        #[arg(long = "type")]
        file_type: Option<FileType>,

        #[arg(long)]
        enabled_only: bool,
    },

    /// Add a file instance
    Add {
        file_type: FileType,

        /// Preset name within the file type
        #[arg(long, default_value = "default")]
        preset: String,

        /// Location relative to the repository (defaults to the type's default)
        #[arg(long)]
        path: Option<String>,

        /// Add the instance disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Change an instance's preset, path or variables
    Edit {
        id: String,

        /// Preset name within the instance's file type
        #[arg(long)]
        preset: Option<String>,

        #[arg(long)]
        path: Option<String>,

        /// Variable override, `key=value` (repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, toml::Value)>,
    },

    /// Remove a file instance
    Remove { id: String },

    /// Enable a file instance
    Enable { id: String },

    /// Disable a file instance
    Disable { id: String },
}

impl Cli {
    pub fn run(self) -> Result<ExitCode> {
        debug!(repo = %self.repo.display(), command = ?self.command, "running command");
        let options = ProjectOptions::builder().repo_path(self.repo).build();
        let mut project = Project::open(options).context("failed to open project")?;

        match self.command {
            Commands::Presets { command } => run_presets(&mut project, command),
            Commands::Files { command } => run_files(&mut project, command),
            Commands::Validate => run_validate(&project),
            Commands::Render { id } => {
                let text = project
                    .render_instance(&id)
                    .with_context(|| format!("failed to render instance '{id}'"))?;
                print!("{text}");
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn run_presets(project: &mut Project, command: PresetCommands) -> Result<ExitCode> {
    match command {
        PresetCommands::List {
            file_type,
            tier,
            json,
        } => {
            let presets = project.store().list(file_type, tier);
            if json {
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                for preset in presets {
                    println!(
                        "{:<32} {:<8} {}",
                        preset.id,
                        preset.source_tier.as_str(),
                        preset.description
                    );
                }
            }
        }
        PresetCommands::Show { id } => {
            let store = project.store();
            let preset = store.get(&id)?;
            let renderer = PresetRenderer::new(store);
            println!("id:          {}", preset.id);
            println!("name:        {}", preset.name);
            println!("type:        {}", preset.file_type.display_name());
            println!("tier:        {}", preset.source_tier);
            println!("description: {}", preset.description);
            if !preset.tags.is_empty() {
                println!("tags:        {}", preset.tags.join(", "));
            }
            let shadowed: Vec<_> = store
                .declarations(&id)
                .iter()
                .filter(|p| p.source_tier != preset.source_tier)
                .map(|p| p.source_tier.to_string())
                .collect();
            if !shadowed.is_empty() {
                println!("shadows:     {}", shadowed.join(", "));
            }
            println!("variables:");
            for (key, value) in renderer.context(preset, &Variables::new()) {
                println!("  {key} = {value}");
            }
        }
        PresetCommands::Create {
            id,
            name,
            description,
            tier,
            extends,
            vars,
        } => {
            let Some((prefix, _)) = split_id(&id) else {
                bail!("preset id '{id}' must have the form '<file-type>:<name>'");
            };
            let file_type: FileType = prefix.parse()?;
            let mut preset = Preset::builder()
                .id(id.clone())
                .file_type(file_type)
                .name(name)
                .description(description)
                .variables(vars.into_iter().collect())
                .build();
            preset.extends = extends;
            project.store_mut().add(preset, tier)?;
            println!("created {id} in the {tier} tier");
        }
        PresetCommands::Delete { id } => {
            project.store_mut().delete(&id)?;
            println!("deleted {id}");
        }
        PresetCommands::Check { id } => {
            let store = project.store();
            let preset = store.get(&id)?;
            let result = PresetRenderer::new(store).check_variables(preset, &Variables::new());
            return Ok(report(&id, &result));
        }
        PresetCommands::Errors => {
            let errors = project.store().load_errors();
            if errors.is_empty() {
                println!("no preset load errors");
            }
            for error in errors {
                println!("{error}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_files(project: &mut Project, command: FileCommands) -> Result<ExitCode> {
    match command {
        FileCommands::List {
            file_type,
            enabled_only,
        } => {
            for instance in project.instances().list(file_type, enabled_only) {
                let state = if instance.enabled { "" } else { " (disabled)" };
                println!(
                    "{:<36} {:<28} {}{state}",
                    instance.id, instance.preset, instance.path
                );
            }
            for error in project.instance_errors() {
                eprintln!("warning: {error}");
            }
            return Ok(ExitCode::SUCCESS);
        }
        FileCommands::Add {
            file_type,
            preset,
            path,
            disabled,
        } => {
            let mut instance = project.new_instance(file_type, &preset, path.as_deref());
            instance.enabled = !disabled;
            let id = instance.id.clone();
            let result = project.add_instance(instance);
            if !result.is_valid() {
                return Ok(report(&id, &result));
            }
            print_warnings(&result);
            println!("added {id}");
        }
        FileCommands::Edit {
            id,
            preset,
            path,
            vars,
        } => {
            let mut instance = project
                .instances()
                .get(&id)
                .cloned()
                .with_context(|| format!("file instance not found: {id}"))?;
            if let Some(name) = preset {
                instance.preset = Preset::compose_id(instance.file_type, &name);
            }
            if let Some(path) = path {
                instance.path = path;
            }
            instance.variables.extend(vars);

            let result = project.update_instance(instance);
            if !result.is_valid() {
                return Ok(report(&id, &result));
            }
            print_warnings(&result);
            println!("updated {id}");
        }
        FileCommands::Remove { id } => {
            project.remove_instance(&id)?;
            println!("removed {id}");
        }
        FileCommands::Enable { id } => {
            let result = project.enable_instance(&id)?;
            if !result.is_valid() {
                return Ok(report(&id, &result));
            }
            println!("enabled {id}");
        }
        FileCommands::Disable { id } => {
            project.disable_instance(&id)?;
            println!("disabled {id}");
        }
    }
    project.save().context("failed to save project config")?;
    Ok(ExitCode::SUCCESS)
}

fn run_validate(project: &Project) -> Result<ExitCode> {
    let mut failed = false;

    let config_path = project.options().config_path();
    if config_path.exists() {
        let text = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let document: toml::Table = toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        let label = config_path.display().to_string();
        if report(&label, &check_config_structure(&document)) != ExitCode::SUCCESS {
            failed = true;
        }
    }

    for (id, result) in project.validate_all() {
        if report(&id, &result) != ExitCode::SUCCESS {
            failed = true;
        }
    }
    for error in project.instance_errors() {
        eprintln!("warning: {error}");
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Print a validation result and map it to an exit status.
fn report(label: &str, result: &ValidationResult) -> ExitCode {
    if result.is_valid() {
        println!("{label}: ok");
    } else {
        println!("{label}: invalid");
        for error in result.errors() {
            eprintln!("  error: {error}");
        }
    }
    print_warnings(result);
    if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_warnings(result: &ValidationResult) {
    for warning in result.warnings() {
        eprintln!("  warning: {warning}");
    }
}

/// Parse `key=value`. The value is read as a TOML literal when it is one
/// (`true`, `3`, `["a"]`), otherwise kept as a string.
fn parse_var(raw: &str) -> Result<(String, toml::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{raw}'"));
    }
    let parsed = toml::from_str::<toml::Table>(&format!("v = {value}"))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_owned()));
    Ok((key.to_owned(), parsed))
}
