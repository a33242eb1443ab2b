//! Markdown-to-markdown rendering: conditional blocks and variable substitution.
//!
//! Supported syntax:
//!
//! - `{{ name }}` - replaced with the variable value; unknown names are left as-is
//! - `{% if name %}`, `{% if not name %}`, `{% if name == "value" %}`,
//!   `{% if name != "value" %}` with optional `{% else %}` and a closing
//!   `{% endif %}`; conditions nest
//!
//! Other `{% ... %}` tags (for example include directives) pass through untouched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::context::{Render, RenderContext, RenderError};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%-?\s*(if\s+[^%]+?|else|endif)\s*-?%\}").unwrap());

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][\w.-]*)\s*\}\}").unwrap());

static COMPARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z_][\w.-]*)\s*(==|!=)\s*"([^"]*)"$"#).unwrap()
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w.-]*$").unwrap());

/// Open `{% if %}` block while scanning.
struct Frame {
    expr: String,
    parent_active: bool,
    branch_taken: bool,
    in_else: bool,
    active: bool,
}

fn is_truthy(vars: &BTreeMap<String, String>, name: &str) -> bool {
    vars.get(name)
        .is_some_and(|v| !matches!(v.as_str(), "" | "false" | "0"))
}

/// Evaluate a condition expression (`name`, `not name`, `name == "v"`,
/// `name != "v"`) against template variables.
///
/// A variable is truthy when it is set to anything but `""`, `false` or `0`.
pub fn evaluate_condition(expr: &str, vars: &BTreeMap<String, String>) -> Result<bool, RenderError> {
    let expr = expr.trim();
    if let Some(name) = expr.strip_prefix("not ") {
        let name = name.trim();
        if NAME_RE.is_match(name) {
            return Ok(!is_truthy(vars, name));
        }
        return Err(RenderError::InvalidCondition(expr.to_owned()));
    }

    if let Some(caps) = COMPARE_RE.captures(expr) {
        let value = vars.get(&caps[1]).map_or("", String::as_str);
        let equal = value == &caps[3];
        return Ok(if &caps[2] == "==" { equal } else { !equal });
    }

    if NAME_RE.is_match(expr) {
        return Ok(is_truthy(vars, expr));
    }

    Err(RenderError::InvalidCondition(expr.to_owned()))
}

/// Resolve conditional blocks, keeping only the active branches.
pub(crate) fn apply_conditions(
    input: &str,
    vars: &BTreeMap<String, String>,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(input.len());
    let mut stack: Vec<Frame> = Vec::new();
    let mut last = 0;

    for caps in TAG_RE.captures_iter(input) {
        let tag_match = caps.get_match();
        let active = stack.last().is_none_or(|f| f.active);
        if active {
            out.push_str(&input[last..tag_match.start()]);
        }
        last = tag_match.end();

        let tag = caps[1].trim();
        if let Some(expr) = tag.strip_prefix("if") {
            let expr = expr.trim();
            // Inactive branches are skipped without evaluating their conditions
            let taken = active && evaluate_condition(expr, vars)?;
            stack.push(Frame {
                expr: expr.to_owned(),
                parent_active: active,
                branch_taken: taken,
                in_else: false,
                active: active && taken,
            });
        } else if tag == "else" {
            let frame = stack
                .last_mut()
                .filter(|f| !f.in_else)
                .ok_or_else(|| RenderError::UnexpectedTag("else".to_owned()))?;
            frame.in_else = true;
            frame.active = frame.parent_active && !frame.branch_taken;
        } else if stack.pop().is_none() {
            return Err(RenderError::UnexpectedTag("endif".to_owned()));
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(RenderError::UnclosedCondition(frame.expr));
    }
    out.push_str(&input[last..]);

    Ok(out)
}

/// Replace `{{ name }}` references with variable values.
pub fn substitute(input: &str, vars: &BTreeMap<String, String>) -> String {
    VAR_RE
        .replace_all(input, |caps: &Captures<'_>| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

/// Markdown-to-markdown renderer.
///
/// Resolves conditions first, then substitutes variables, so a variable
/// referenced only inside a dropped branch never has to be defined.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    /// Create a new renderer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Render for MarkdownRenderer {
    fn render(&self, content: &str, context: &RenderContext) -> Result<String, RenderError> {
        let resolved = apply_conditions(content, &context.variables)?;
        Ok(substitute(&resolved, &context.variables))
    }
}
