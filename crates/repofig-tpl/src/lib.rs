mod error;
mod renderer;
mod template;

pub use error::TplError;
pub use renderer::TemplateRenderer;
pub use template::TemplateSource;
