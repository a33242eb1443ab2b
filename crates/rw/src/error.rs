//! CLI error types.

use rw_build::{BuildError, NavigationError, PresetsError, RedirectsError};
use rw_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Redirects(#[from] RedirectsError),

    #[error("{0}")]
    Navigation(#[from] NavigationError),

    #[error("{0}")]
    Presets(#[from] PresetsError),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("{0} page(s) skipped")]
    PagesSkipped(usize),
}
