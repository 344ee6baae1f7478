//! Jinja2 rendering of preset template content.
//!
//! [`TemplateRenderer`] wraps a `minijinja` environment. Templates are
//! registered by name (a preset id) the first time their content is loaded
//! and rendered from the environment afterwards.

use std::collections::BTreeSet;

use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::TplError;
use crate::template::TemplateSource;

/// Renders template text with a variable context.
#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Create a renderer with no registered templates.
    ///
    /// Undefined variables render as empty strings and trailing newlines are
    /// preserved, so generated files keep their final line break.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Register a named template.
    ///
    /// # Errors
    ///
    /// Returns `TplError::InvalidTemplate` if the source does not parse.
    pub fn add_template(&mut self, template: TemplateSource) -> Result<(), TplError> {
        let TemplateSource { name, source } = template;
        self.env
            .add_template_owned(name.clone(), source)
            .map_err(|e| TplError::InvalidTemplate(format!("{name}: {e}")))?;
        debug!(template = %name, "registered template");
        Ok(())
    }

    /// Returns whether a template with this name has been registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Render a registered template by name.
    ///
    /// # Errors
    ///
    /// Returns `TplError::TemplateNotFound` for an unknown name and
    /// `TplError::RenderError` if evaluation fails.
    #[instrument(skip(self, ctx))]
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, TplError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|_| TplError::TemplateNotFound(name.to_owned()))?;
        template.render(ctx).map_err(|e| classify(name, &e))
    }

    /// Top-level variable names the template reads without defining them.
    ///
    /// # Errors
    ///
    /// Returns `TplError::InvalidTemplate` if the source does not parse.
    pub fn referenced_variables(
        &self,
        name: &str,
        source: &str,
    ) -> Result<BTreeSet<String>, TplError> {
        // Borrowed sources need an environment scoped to their lifetime.
        let env = Environment::new();
        let template = env
            .template_from_named_str(name, source)
            .map_err(|e| TplError::InvalidTemplate(format!("{name}: {e}")))?;
        Ok(template.undeclared_variables(false).into_iter().collect())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(name: &str, err: &minijinja::Error) -> TplError {
    if err.kind() == ErrorKind::SyntaxError {
        TplError::InvalidTemplate(format!("{name}: {err}"))
    } else {
        TplError::RenderError(format!("{name}: {err}"))
    }
}
