//! Directory presets.
//!
//! A `presets.yaml` file supplies template variables to every page in its
//! directory and below:
//!
//! ```yaml
//! default:
//!   product: RW
//!   beta: true
//! ```
//!
//! Deeper directories override shallower ones.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

/// Presets file name looked up in every directory.
pub const PRESETS_FILE: &str = "presets.yaml";

/// Error while loading presets.
#[derive(Debug, thiserror::Error)]
pub enum PresetsError {
    /// Presets file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// Presets file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Presets file is not valid YAML of the expected shape.
    #[error("invalid presets file {}: {source}", .path.display())]
    Parse {
        /// Presets file path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PresetsFile {
    default: BTreeMap<String, Value>,
}

/// Variables from `presets.yaml` files, per source-relative directory.
#[derive(Debug, Default)]
pub struct Presets {
    /// Variables declared directly in each directory that has a presets file.
    by_dir: HashMap<String, BTreeMap<String, String>>,
}

impl Presets {
    /// Load presets for the given source-relative directories and their ancestors.
    pub fn load<'a>(
        source_root: &Path,
        dirs: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, PresetsError> {
        let mut by_dir = HashMap::new();
        let mut seen = HashSet::new();

        for dir in dirs {
            for ancestor in ancestors(dir) {
                if !seen.insert(ancestor.to_owned()) {
                    continue;
                }
                if let Some(vars) = read_presets(&source_root.join(ancestor).join(PRESETS_FILE))? {
                    tracing::debug!(dir = ancestor, vars = vars.len(), "Loaded presets");
                    by_dir.insert(ancestor.to_owned(), vars);
                }
            }
        }

        Ok(Self { by_dir })
    }

    /// Variables for pages in `dir`: root presets first, deeper directories on top.
    #[must_use]
    pub fn variables_for(&self, dir: &str) -> BTreeMap<String, String> {
        let mut chain = ancestors(dir);
        chain.reverse();

        let mut vars = BTreeMap::new();
        for ancestor in chain {
            if let Some(layer) = self.by_dir.get(ancestor) {
                vars.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        vars
    }
}

/// `dir` and its ancestors, deepest first, ending with the root (`""`).
fn ancestors(dir: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut current = dir.trim_matches('/');
    loop {
        result.push(current);
        if current.is_empty() {
            break;
        }
        current = current.rsplit_once('/').map_or("", |(parent, _)| parent);
    }
    result
}

fn read_presets(path: &Path) -> Result<Option<BTreeMap<String, String>>, PresetsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PresetsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file: PresetsFile = serde_yaml::from_str(&content).map_err(|source| PresetsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let vars = file
        .default
        .into_iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key, v)))
        .collect();
    Ok(Some(vars))
}

/// Scalar YAML value as template text; nested values are not templatable.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
