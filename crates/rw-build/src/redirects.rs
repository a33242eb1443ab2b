//! Redirect rules from `redirects.yaml`.
//!
//! Rules are grouped in named sections (`common` plus one per language):
//!
//! ```yaml
//! common:
//!   - from: /old/setup
//!     to: /guide/setup
//! ```
//!
//! Every rule needs both ends, and they must differ. A missing file means
//! no redirects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Redirects file name, looked up in the source root.
pub const REDIRECTS_FILE: &str = "redirects.yaml";

/// Error while loading redirects.
#[derive(Debug, thiserror::Error)]
pub enum RedirectsError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid redirects file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Rule without `from` or without `to`.
    #[error("{}: one of the two parameters is missing in section '{section}' (from: {from}, to: {to})", .path.display())]
    Incomplete {
        path: PathBuf,
        section: String,
        from: String,
        to: String,
    },

    /// Rule pointing at itself.
    #[error("{}: parameters must be different in section '{section}' (from: {from}, to: {from})", .path.display())]
    Identical {
        path: PathBuf,
        section: String,
        from: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawRedirect {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

/// One validated redirect rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub from: String,
    pub to: String,
}

/// Validated redirect rules by section.
#[derive(Debug, Default)]
pub struct Redirects {
    sections: BTreeMap<String, Vec<Redirect>>,
}

impl Redirects {
    /// Load and validate `redirects.yaml` from `source_root`.
    ///
    /// Returns empty rules when the file does not exist.
    pub fn load(source_root: &Path) -> Result<Self, RedirectsError> {
        let path = source_root.join(REDIRECTS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(RedirectsError::Io { path, source }),
        };

        let raw: Option<BTreeMap<String, Vec<RawRedirect>>> = serde_yaml::from_str(&content)
            .map_err(|source| RedirectsError::Parse {
                path: path.clone(),
                source,
            })?;

        let mut sections = BTreeMap::new();
        for (section, rules) in raw.unwrap_or_default() {
            let mut validated = Vec::with_capacity(rules.len());
            for rule in rules {
                let (from, to) = match (rule.from, rule.to) {
                    (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => (from, to),
                    (from, to) => {
                        return Err(RedirectsError::Incomplete {
                            path,
                            section,
                            from: from.unwrap_or_default(),
                            to: to.unwrap_or_default(),
                        });
                    }
                };
                if from == to {
                    return Err(RedirectsError::Identical {
                        path,
                        section,
                        from,
                    });
                }
                validated.push(Redirect { from, to });
            }
            sections.insert(section, validated);
        }

        let redirects = Self { sections };
        tracing::debug!(rules = redirects.len(), "Loaded redirects");
        Ok(redirects)
    }

    /// Rules of one section.
    #[must_use]
    pub fn section(&self, name: &str) -> &[Redirect] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of rules across all sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    /// Whether there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
