//! Template source type used by the renderer.

/// A named piece of template text, usually the content behind a preset.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    /// Template name used for lookup (a preset id such as `claude_md:default`).
    pub name: String,

    /// Raw Jinja2 template source.
    pub source: String,
}

impl TemplateSource {
    /// Create a template source from a name and its text.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}
