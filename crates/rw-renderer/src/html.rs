//! Markdown-to-HTML rendering.

use pulldown_cmark::{Options, Parser, html};

use crate::context::{Render, RenderContext, RenderError};
use crate::template::MarkdownRenderer;

/// Drop a leading `---` metadata block, if any.
fn strip_front_matter(content: &str) -> &str {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return content;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return &rest[offset..];
        }
    }
    content
}

/// Markdown-to-HTML renderer.
///
/// Templates are resolved with [`MarkdownRenderer`] first; the metadata
/// block is not part of the HTML output. Include directives must already be
/// inlined by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer {
    markdown: MarkdownRenderer,
}

impl HtmlRenderer {
    /// Create a new renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Render for HtmlRenderer {
    fn render(&self, content: &str, context: &RenderContext) -> Result<String, RenderError> {
        let markdown = self.markdown.render(content, context)?;
        let body = strip_front_matter(&markdown);

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(body, options);
        let mut output = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut output, parser);
        Ok(output)
    }
}
