//! Multi-file documentation build for RW.
//!
//! Takes a navigation list of source-relative documents and produces an
//! output tree:
//!
//! - markdown pages are rendered through a [`rw_renderer::Render`] implementation;
//!   files they include are rendered next to them (markdown output) or
//!   inlined (HTML output)
//! - leading pages (`index.yaml`) get their `when` conditions resolved when
//!   enabled, and are rendered to HTML for HTML output
//! - other `.yaml` reference files and assets are copied verbatim
//! - optionally, every section gets a single page bundle at
//!   `<section>/_single_page/index.md` holding its pages in navigation order
//! - optionally, every page gets a `contributors` metadata field computed from
//!   version control history of the page and the files it includes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rw_build::{Builder, Navigation};
//! use rw_renderer::MarkdownRenderer;
//! use rw_vcs::GitHubClient;
//!
//! let navigation = Navigation::load(&config.source_dir, &config.toc_filename)?;
//! let report = Builder::<GitHubClient>::new(config, Arc::new(MarkdownRenderer::new()))
//!     .build(&navigation)
//!     .await?;
//! ```

mod contributors;
mod dispatcher;
mod error;
mod front_matter;
mod includes;
mod leading;
mod navigation;
mod paths;
mod presets;
mod redirects;
mod report;
mod single_page;

pub use contributors::{
    AttributionError, Contributor, ContributorAttributor, ContributorDirectory, PageContributors,
    embed_contributors,
};
pub use dispatcher::Builder;
pub use error::{BuildError, PageError};
pub use front_matter::{embed_field, strip as strip_front_matter};
pub use includes::{include_targets, inline_includes};
pub use leading::{LeadingError, filter_leading, leading_markdown};
pub use navigation::{Navigation, NavigationError};
pub use paths::{PathError, PathFacts, SINGLE_PAGE_DIR, SINGLE_PAGE_FILE, SinglePagePaths, plan};
pub use presets::{Presets, PresetsError};
pub use redirects::{REDIRECTS_FILE, Redirect, Redirects, RedirectsError};
pub use report::{BuildReport, OutputKind, PageOutcome, SkippedPage};
pub use single_page::SinglePageAggregator;
