//! Page renderers for RW.
//!
//! The build consumes rendering through the [`Render`] trait: a synchronous,
//! pure function from a document's raw text and its [`RenderContext`] to
//! output text.
//!
//! # Renderers
//!
//! - [`MarkdownRenderer`]: markdown to markdown, resolving `{% if %}` blocks and
//!   `{{ var }}` substitutions
//! - [`HtmlRenderer`]: the same templating followed by HTML conversion with
//!   `pulldown-cmark`
//!
//! [`evaluate_condition`] and [`substitute`] expose the template rules to
//! callers that template structured data instead of whole documents.
//!
//! # Example
//!
//! ```
//! use rw_renderer::{MarkdownRenderer, Render, RenderContext};
//!
//! let mut context = RenderContext::default();
//! context.variables.insert("product".to_owned(), "RW".to_owned());
//!
//! let result = MarkdownRenderer::new().render("# {{ product }}", &context).unwrap();
//! assert_eq!(result, "# RW");
//! ```

mod context;
mod html;
mod template;

pub use context::{Render, RenderContext, RenderError};
pub use html::HtmlRenderer;
pub use template::{MarkdownRenderer, evaluate_condition, substitute};
