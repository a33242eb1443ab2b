//! Leading pages.
//!
//! A section's `index.yaml` describes its landing page:
//!
//! ```yaml
//! title: Guide
//! description:
//!   - Everything about {{ product }}.
//!   - text: Preview features are marked.
//!     when: beta
//! links:
//!   - title: Setup
//!     href: setup.md
//!     description: Install and configure
//!   - title: Administration
//!     href: admin/index.yaml
//!     when: audience == "admins"
//! ```
//!
//! Any entry carrying a `when` condition is dropped when the condition is
//! false; kept entries lose the `when` key. String values get `{{ var }}`
//! substitution.

use std::collections::BTreeMap;

use rw_renderer::{RenderError, evaluate_condition, substitute};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::paths::PathFacts;

const WHEN_KEY: &str = "when";

/// Error while processing a leading page.
#[derive(Debug, thiserror::Error)]
pub enum LeadingError {
    /// Not valid YAML, or not shaped like a leading page.
    #[error("invalid leading page: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// A `when` condition cannot be evaluated.
    #[error(transparent)]
    Condition(#[from] RenderError),

    /// Filtered page could not be written back as YAML.
    #[error("cannot serialize leading page: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// Whether `facts` names a leading page (`index.yaml`).
pub(crate) fn is_leading(facts: &PathFacts) -> bool {
    facts.base_name == "index" && facts.extension == ".yaml"
}

/// Leading page YAML with conditions resolved against `vars`.
pub fn filter_leading(source: &str, vars: &BTreeMap<String, String>) -> Result<String, LeadingError> {
    let doc = parse_filtered(source, vars)?;
    serde_yaml::to_string(&doc).map_err(LeadingError::Serialize)
}

/// Markdown rendition of a leading page, conditions resolved against `vars`.
///
/// Links to `.md` and `.yaml` documents are rewritten to their `.html` output.
pub fn leading_markdown(source: &str, vars: &BTreeMap<String, String>) -> Result<String, LeadingError> {
    let doc = parse_filtered(source, vars)?;
    let page: LeadingPage = serde_yaml::from_value(doc).map_err(LeadingError::Parse)?;

    let mut blocks = Vec::new();
    if let Some(title) = &page.title {
        blocks.push(format!("# {}", title.lines().join(" ")));
    }
    if let Some(description) = &page.description {
        blocks.extend(description.lines().into_iter().map(str::to_owned));
    }
    if !page.links.is_empty() {
        let items: Vec<String> = page.links.iter().map(LeadingLink::to_markdown).collect();
        blocks.push(items.join("\n"));
    }

    let mut markdown = blocks.join("\n\n");
    markdown.push('\n');
    Ok(markdown)
}

fn parse_filtered(source: &str, vars: &BTreeMap<String, String>) -> Result<Value, LeadingError> {
    let doc: Value = serde_yaml::from_str(source).map_err(LeadingError::Parse)?;
    Ok(resolve(doc, vars)?.unwrap_or(Value::Mapping(Mapping::new())))
}

/// `None` when the value carries a false `when` condition.
fn resolve(value: Value, vars: &BTreeMap<String, String>) -> Result<Option<Value>, RenderError> {
    match value {
        Value::Sequence(items) => {
            let mut kept = Vec::with_capacity(items.len());
            for item in items {
                if let Some(item) = resolve(item, vars)? {
                    kept.push(item);
                }
            }
            Ok(Some(Value::Sequence(kept)))
        }
        Value::Mapping(map) => {
            let mut when = None;
            let mut entries = Vec::with_capacity(map.len());
            for (key, value) in map {
                if key.as_str() == Some(WHEN_KEY) {
                    when = Some(value);
                } else {
                    entries.push((key, value));
                }
            }
            if let Some(when) = &when
                && !condition_holds(when, vars)?
            {
                return Ok(None);
            }

            let mut kept = Mapping::with_capacity(entries.len());
            for (key, value) in entries {
                if let Some(value) = resolve(value, vars)? {
                    kept.insert(key, value);
                }
            }
            Ok(Some(Value::Mapping(kept)))
        }
        Value::String(text) => Ok(Some(Value::String(substitute(&text, vars)))),
        other => Ok(Some(other)),
    }
}

fn condition_holds(when: &Value, vars: &BTreeMap<String, String>) -> Result<bool, RenderError> {
    match when {
        Value::Bool(b) => Ok(*b),
        Value::String(expr) => evaluate_condition(expr, vars),
        other => Err(RenderError::InvalidCondition(format!("{other:?}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LeadingPage {
    title: Option<Text>,
    description: Option<Text>,
    links: Vec<LeadingLink>,
}

/// A string, or a list of strings and `{ text: ... }` entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    One(String),
    Many(Vec<TextItem>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextItem {
    Plain(String),
    Tagged { text: String },
}

impl Text {
    fn lines(&self) -> Vec<&str> {
        match self {
            Self::One(text) => vec![text.as_str()],
            Self::Many(items) => items
                .iter()
                .map(|item| match item {
                    TextItem::Plain(text) | TextItem::Tagged { text } => text.as_str(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LeadingLink {
    title: Option<String>,
    href: Option<String>,
    description: Option<String>,
}

impl LeadingLink {
    fn to_markdown(&self) -> String {
        let mut item = match (&self.title, &self.href) {
            (title, Some(href)) => {
                let label = title.as_deref().unwrap_or(href);
                format!("- [{label}]({})", html_href(href))
            }
            (Some(title), None) => format!("- {title}"),
            (None, None) => "-".to_owned(),
        };
        if let Some(description) = &self.description {
            item.push_str("\n  ");
            item.push_str(description);
        }
        item
    }
}

fn html_href(href: &str) -> String {
    if href.contains("://") || href.starts_with("//") {
        return href.to_owned();
    }
    let (path, fragment) = href
        .split_once('#')
        .map_or((href, None), |(path, fragment)| (path, Some(fragment)));
    let stem = [".md", ".yaml", ".yml"]
        .iter()
        .find_map(|ext| path.strip_suffix(ext));
    match (stem, fragment) {
        (Some(stem), Some(fragment)) => format!("{stem}.html#{fragment}"),
        (Some(stem), None) => format!("{stem}.html"),
        (None, _) => href.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"title: Guide
description:
  - Everything about {{ product }}.
  - text: Preview features are marked.
    when: beta
links:
  - title: Setup
    href: setup.md
    description: Install and configure
  - title: Administration
    href: admin/index.yaml
    when: audience == "admins"
  - title: Always
    href: https://example.com/x.md
    when: true
"#;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_filter_drops_false_conditions() {
        let filtered = filter_leading(PAGE, &vars(&[("product", "RW")])).unwrap();
        let doc: Value = serde_yaml::from_str(&filtered).unwrap();

        assert_eq!(doc["description"].as_sequence().unwrap().len(), 1);
        assert_eq!(doc["description"][0].as_str(), Some("Everything about RW."));
        let titles: Vec<&str> = doc["links"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|link| link["title"].as_str())
            .collect();
        assert_eq!(titles, vec!["Setup", "Always"]);
        assert!(!filtered.contains("when"));
    }

    #[test]
    fn test_filter_keeps_true_conditions() {
        let filtered =
            filter_leading(PAGE, &vars(&[("beta", "true"), ("audience", "admins")])).unwrap();
        let doc: Value = serde_yaml::from_str(&filtered).unwrap();

        assert_eq!(
            doc["description"][1]["text"].as_str(),
            Some("Preview features are marked.")
        );
        assert_eq!(doc["links"].as_sequence().unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_condition_is_an_error() {
        let err = filter_leading("links:\n  - title: X\n    when: a > 1\n", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            LeadingError::Condition(RenderError::InvalidCondition(_))
        ));
        assert!(matches!(
            filter_leading("links: [", &BTreeMap::new()).unwrap_err(),
            LeadingError::Parse(_)
        ));
    }

    #[test]
    fn test_leading_markdown() {
        let markdown = leading_markdown(PAGE, &vars(&[("product", "RW"), ("beta", "1")])).unwrap();
        assert_eq!(
            markdown,
            "# Guide\n\nEverything about RW.\n\nPreview features are marked.\n\n\
             - [Setup](setup.html)\n  Install and configure\n\
             - [Always](https://example.com/x.md)\n"
        );
    }

    #[test]
    fn test_html_href() {
        assert_eq!(html_href("setup.md"), "setup.html");
        assert_eq!(html_href("admin/index.yaml"), "admin/index.html");
        assert_eq!(html_href("setup.md#install"), "setup.html#install");
        assert_eq!(html_href("logo.svg"), "logo.svg");
        assert_eq!(html_href("//cdn.example.com/a.md"), "//cdn.example.com/a.md");
    }
}
