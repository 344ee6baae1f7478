//! Rendering of preset templates with inherited variables.

use repofig_tpl::{TemplateRenderer, TemplateSource};
use tracing::{debug, instrument};

use crate::error::CoreError;
use crate::inheritance::InheritanceResolver;
use crate::preset::{Preset, Variables};
use crate::store::TieredPresetStore;
use crate::validation::ValidationResult;

/// Renders presets from one store.
#[derive(Debug)]
pub struct PresetRenderer<'a> {
    store: &'a TieredPresetStore,
    renderer: TemplateRenderer,
}

impl<'a> PresetRenderer<'a> {
    pub fn new(store: &'a TieredPresetStore) -> Self {
        Self {
            store,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Inherited variables of `preset` with `overrides` applied on top.
    pub fn context(&self, preset: &Preset, overrides: &Variables) -> Variables {
        let mut vars = InheritanceResolver::new(self.store).resolve(preset);
        vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }

    /// Render a preset's template.
    ///
    /// The template is loaded and compiled on first use and reused for later
    /// renders of the same preset.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::TemplateNotFound` if the preset has no content and
    /// `CoreError::Template` if the template fails to parse or render.
    #[instrument(skip(self, preset, overrides), fields(id = %preset.id))]
    pub fn render_preset(
        &mut self,
        preset: &Preset,
        overrides: &Variables,
    ) -> Result<String, CoreError> {
        if !self.renderer.has_template(&preset.id) {
            let source = self.store.template_content(preset)?;
            self.renderer
                .add_template(TemplateSource::new(preset.id.clone(), source))?;
        }
        let vars = self.context(preset, overrides);
        let out = self.renderer.render(&preset.id, &vars)?;
        debug!(bytes = out.len(), "preset rendered");
        Ok(out)
    }

    /// Compare the template's variables with those the preset defines.
    ///
    /// Warns about variables the template reads but nothing provides, and
    /// about defined variables the template never reads. A missing or
    /// unparsable template is an error.
    pub fn check_variables(&self, preset: &Preset, overrides: &Variables) -> ValidationResult {
        let mut result = ValidationResult::new();

        let source = match self.store.template_content(preset) {
            Ok(source) => source,
            Err(e) => {
                result.add_error(e.to_string());
                return result;
            }
        };
        let used = match self.renderer.referenced_variables(&preset.id, &source) {
            Ok(used) => used,
            Err(e) => {
                result.add_error(CoreError::from(e).to_string());
                return result;
            }
        };

        let defined = self.context(preset, overrides);
        for name in used.iter().filter(|v| !defined.contains_key(*v)) {
            result.add_warning(format!(
                "Template uses variable '{name}' but no default value is provided"
            ));
        }
        for name in defined.keys().filter(|v| !used.contains(*v)) {
            result.add_warning(format!(
                "Preset defines variable '{name}' but it's not used in the template"
            ));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::store::StoreConfig;

    fn store_with(dir: &TempDir) -> TieredPresetStore {
        TieredPresetStore::new(
            StoreConfig::builder()
                .user_dir(dir.path().to_path_buf())
                .build(),
        )
    }

    fn write_dir_preset(dir: &TempDir, name: &str, declaration: &str, template: &str) {
        let root = dir.path().join(name);
        fs::create_dir_all(&root).expect("should create dir");
        fs::write(root.join("preset.toml"), declaration).expect("should write declaration");
        fs::write(root.join("CLAUDE.md"), template).expect("should write template");
    }

    #[test]
    fn test_should_render_with_inheritance_and_overrides() {
        let dir = TempDir::new().expect("should create temp dir");
        write_dir_preset(
            &dir,
            "claude_md_team",
            "[preset]\nid = \"claude_md:team\"\ntype = \"claude_md\"\nname = \"Team\"\n\
             extends = \"claude_md:minimal\"\n[preset.variables]\nteam = \"core\"\n",
            "# {{ project_name }} by {{ team }}\n",
        );
        let store = store_with(&dir);
        let mut renderer = PresetRenderer::new(&store);
        let preset = store.get("claude_md:team").expect("exists");

        let out = renderer
            .render_preset(preset, &Variables::new())
            .expect("should render");
        assert_eq!(out, "# Project by core\n");

        let overrides = Variables::from([(
            "project_name".to_owned(),
            toml::Value::String("repofig".to_owned()),
        )]);
        let out = renderer
            .render_preset(preset, &overrides)
            .expect("should render");
        assert_eq!(out, "# repofig by core\n");
    }

    #[test]
    fn test_should_render_library_preset() {
        let store = TieredPresetStore::new(StoreConfig::builder().build());
        let mut renderer = PresetRenderer::new(&store);
        let preset = store.get("claude_md:minimal").expect("exists");

        let out = renderer
            .render_preset(preset, &Variables::new())
            .expect("should render");
        assert!(out.starts_with("# Project\n"));
    }

    #[test]
    fn test_should_report_missing_and_unused_variables() {
        let dir = TempDir::new().expect("should create temp dir");
        write_dir_preset(
            &dir,
            "claude_md_vars",
            "[preset]\nid = \"claude_md:vars\"\ntype = \"claude_md\"\nname = \"Vars\"\n\
             [preset.variables]\nused = \"1\"\nunused = \"2\"\n",
            "{{ used }} {{ missing }}\n",
        );
        let store = store_with(&dir);
        let renderer = PresetRenderer::new(&store);
        let preset = store.get("claude_md:vars").expect("exists");

        let result = renderer.check_variables(preset, &Variables::new());
        assert!(result.is_valid());
        assert_eq!(
            result.warnings(),
            [
                "Template uses variable 'missing' but no default value is provided",
                "Preset defines variable 'unused' but it's not used in the template",
            ]
        );
    }

    #[test]
    fn test_should_report_missing_template_as_error() {
        let dir = TempDir::new().expect("should create temp dir");
        fs::write(
            dir.path().join("bare.toml"),
            "[preset]\nid = \"claude_md:bare\"\ntype = \"claude_md\"\nname = \"Bare\"\n",
        )
        .expect("should write");
        let store = store_with(&dir);
        let mut renderer = PresetRenderer::new(&store);
        let preset = store.get("claude_md:bare").expect("exists");

        let result = renderer.check_variables(preset, &Variables::new());
        assert!(!result.is_valid());
        assert!(matches!(
            renderer.render_preset(preset, &Variables::new()),
            Err(CoreError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_should_find_library_presets_consistent() {
        let store = TieredPresetStore::new(StoreConfig::builder().build());
        let renderer = PresetRenderer::new(&store);
        for preset in store.list(None, None) {
            let result = renderer.check_variables(preset, &Variables::new());
            assert!(result.is_valid(), "{}: {:?}", preset.id, result.errors());
            assert!(!result.has_warnings(), "{}: {:?}", preset.id, result.warnings());
        }
    }
}
