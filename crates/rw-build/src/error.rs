//! Build error types.

use std::path::PathBuf;

use rw_renderer::RenderError;
use rw_vcs::VcsError;

use crate::contributors::AttributionError;
use crate::leading::LeadingError;
use crate::paths::PathError;

/// Error that skips one page; sibling pages are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being done (`read`, `write`, ...).
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("contributor attribution failed: {0}")]
    Attribution(#[from] AttributionError),

    #[error(transparent)]
    Leading(#[from] LeadingError),

    /// Page task panicked or was cancelled.
    #[error("page task failed: {0}")]
    Task(String),
}

impl PageError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }
}

/// Error that aborts the whole build before any page is processed.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Repository contributor list could not be loaded.
    #[error("cannot load repository contributors: {0}")]
    Contributors(#[source] VcsError),

    /// Contributor attribution is enabled without a version control client.
    #[error("contributor attribution requires a version control client")]
    MissingVcs,

    /// Output root could not be created.
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
