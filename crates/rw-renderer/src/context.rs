//! Render trait, context and errors.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything a renderer may know about the page being rendered.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Template variables (presets overlaid with configured vars).
    pub variables: BTreeMap<String, String>,
    /// Absolute path of the source document.
    pub source_path: PathBuf,
    /// Absolute path the rendered document is written to.
    pub output_path: PathBuf,
    /// Root of the source tree.
    pub source_root: PathBuf,
    /// Root of the output tree.
    pub output_root: PathBuf,
}

/// Error returned by a renderer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    /// `{% if %}` without a matching `{% endif %}`.
    #[error("unclosed condition '{0}'")]
    UnclosedCondition(String),

    /// `{% else %}` or `{% endif %}` outside of a condition.
    #[error("unexpected '{0}' tag outside of a condition")]
    UnexpectedTag(String),

    /// Condition expression that cannot be evaluated.
    #[error("invalid condition '{0}'")]
    InvalidCondition(String),
}

/// Converts one document's raw text into output text.
///
/// Implementations are synchronous and pure given their context.
pub trait Render: Send + Sync {
    /// Render `content` for the page described by `context`.
    fn render(&self, content: &str, context: &RenderContext) -> Result<String, RenderError>;
}
