//! Include directives.
//!
//! Directive form: `{% include [label](target) %}`, optionally
//! `{% include notitle [label](target) %}`. The target may carry a
//! `#fragment` suffix that selects part of the included document; it is
//! not part of the file path.

use std::collections::HashSet;
use std::future::Future;
use std::ops::Range;
use std::path::Path;
use std::pin::Pin;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::front_matter;
use crate::paths::resolve_relative;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%\s*include\s+(notitle\s+)?\[([^\]]*)\]\(([^)\s]+)\)\s*%\}").unwrap()
});

/// Remove a `#fragment` suffix from an include target.
#[must_use]
pub fn strip_fragment(target: &str) -> &str {
    target.split_once('#').map_or(target, |(path, _)| path)
}

/// File targets of every include directive in `text`, in document order.
///
/// Fragments are stripped; targets that are fragment-only are skipped.
pub fn include_targets(text: &str) -> Vec<&str> {
    INCLUDE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(3))
        .map(|m| strip_fragment(m.as_str()))
        .filter(|target| !target.is_empty())
        .collect()
}

/// Include targets of `text` resolved against the source-relative file
/// `from`. Targets leaving the source root are logged and skipped.
pub(crate) fn resolved_targets(from: &str, text: &str) -> Vec<String> {
    include_targets(text)
        .into_iter()
        .filter_map(|target| {
            let resolved = resolve_relative(from, target);
            if resolved.is_none() {
                tracing::warn!(page = from, target, "Include points outside the source directory");
            }
            resolved
        })
        .collect()
}

/// Prefix every file target in `text` with `dir`.
///
/// Used when a page's text moves to another directory (a single page
/// bundle) but its includes must keep pointing at the same files.
pub fn rebase(text: &str, dir: &str) -> String {
    if dir.is_empty() {
        return text.to_owned();
    }
    INCLUDE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let target = &caps[3];
            if target.starts_with('#') {
                return caps[0].to_owned();
            }
            let notitle = caps.get(1).map_or("", |m| m.as_str());
            format!("{{% include {notitle}[{}]({dir}/{target}) %}}", &caps[2])
        })
        .into_owned()
}

/// One include directive, detached from the text it was found in.
struct Directive {
    range: Range<usize>,
    target: String,
    notitle: bool,
}

fn directives(text: &str) -> Vec<Directive> {
    INCLUDE_RE
        .captures_iter(text)
        .map(|caps| Directive {
            range: caps.get_match().range(),
            target: strip_fragment(&caps[3]).to_owned(),
            notitle: caps.get(1).is_some(),
        })
        .collect()
}

/// Replace include directives in `text` with the content of their targets.
///
/// `page` is the source-relative path `text` belongs to. Included files
/// lose their metadata block (and first heading for `notitle`) and are
/// expanded recursively. Targets that are missing, leave `source_root` or
/// would include themselves again are dropped with a warning.
pub async fn inline_includes(source_root: &Path, page: &str, text: &str) -> String {
    let mut chain = HashSet::from([page.to_owned()]);
    expand(source_root, page, text, &mut chain).await
}

fn expand<'a>(
    source_root: &'a Path,
    from: &'a str,
    text: &'a str,
    chain: &'a mut HashSet<String>,
) -> Pin<Box<dyn Future<Output = String> + Send + 'a>> {
    Box::pin(async move {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for directive in directives(text) {
            out.push_str(&text[last..directive.range.start]);
            last = directive.range.end;
            if directive.target.is_empty() {
                continue;
            }

            let Some(path) = resolve_relative(from, &directive.target) else {
                tracing::warn!(page = from, target = %directive.target, "Include points outside the source directory");
                continue;
            };
            if chain.contains(&path) {
                tracing::warn!(page = from, target = %path, "Include cycle, skipping");
                continue;
            }
            let content = match tokio::fs::read_to_string(source_root.join(&path)).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(page = from, target = %path, error = %e, "Cannot read included file");
                    continue;
                }
            };

            let mut body = front_matter::strip(&content);
            if directive.notitle {
                body = drop_title(body);
            }

            chain.insert(path.clone());
            let expanded = expand(source_root, &path, body, chain).await;
            chain.remove(&path);
            out.push_str(expanded.trim_end());
        }

        out.push_str(&text[last..]);
        out
    })
}

/// Text without its first line when that line is an ATX heading.
fn drop_title(text: &str) -> &str {
    let trimmed = text.trim_start_matches(['\r', '\n']);
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    if first.starts_with('#') {
        rest
    } else {
        text
    }
}
