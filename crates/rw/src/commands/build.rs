//! `rw build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use rw_build::{BuildReport, Builder, Navigation, Presets, Redirects};
use rw_config::{CliSettings, Config, OutputFormat};
use rw_renderer::{HtmlRenderer, MarkdownRenderer, Render};
use rw_vcs::GitHubClient;

use crate::error::CliError;
use crate::output::{Output, Tone};

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover rw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Documentation source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format: md or html (overrides config).
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Generate a single page bundle per section.
    #[arg(long)]
    single_page: bool,

    /// Embed contributors from version control history into every page.
    #[arg(long)]
    contributors: bool,

    /// Resolve `when` conditions of leading pages in markdown output.
    #[arg(long)]
    resolve_conditions: bool,

    /// Enable verbose output (per-page progress logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, redirects, navigation or presets
    /// cannot be loaded, if the build cannot start, or if any page was skipped.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            output_format: self.format,
            single_page: self.single_page.then_some(true),
            contributors: self.contributors.then_some(true),
            resolve_conditions: self.resolve_conditions.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let build_config = config.build_resolved;

        output.info(&format!("Source: {}", build_config.source_dir.display()));
        output.info(&format!("Output: {}", build_config.output_dir.display()));
        output.info(&format!("Format: {}", build_config.output_format));

        let redirects = Redirects::load(&build_config.source_dir)?;
        if !redirects.is_empty() {
            output.info(&format!("Redirects: {} valid", redirects.len()));
        }

        let navigation = Navigation::load(&build_config.source_dir, &build_config.toc_filename)?;
        let page_dirs: Vec<String> = navigation
            .paths()
            .iter()
            .filter_map(|path| rw_build::plan(path, &build_config).ok())
            .map(|facts| facts.source_dir().to_owned())
            .collect();
        let presets = Presets::load(&build_config.source_dir, page_dirs.iter().map(String::as_str))?;

        let renderer: Arc<dyn Render> = match build_config.output_format {
            OutputFormat::Md => Arc::new(MarkdownRenderer::new()),
            OutputFormat::Html => Arc::new(HtmlRenderer::new()),
        };

        let mut builder = Builder::<GitHubClient>::new(build_config, renderer)
            .with_presets(presets)
            .with_vars(config.vars);
        if let Some(vcs) = &config.vcs {
            let client = GitHubClient::new(&vcs.endpoint, &vcs.token, &vcs.owner, &vcs.repo);
            builder = builder.with_vcs(Arc::new(client), vcs.path_prefix.clone());
        }

        let report = builder.build(&navigation).await?;
        print_report(&output, &report);

        if report.is_success() {
            Ok(())
        } else {
            Err(CliError::PagesSkipped(report.skipped.len()))
        }
    }
}

fn print_report(output: &Output, report: &BuildReport) {
    output.heading("Build summary");
    output.stat("Attempted", report.attempted, Tone::Plain);
    output.stat("Written", report.written.len(), Tone::Good);

    output.stat("Single page bundles", report.bundles.len(), Tone::Plain);
    for bundle in &report.bundles {
        output.item(bundle.display(), None);
    }

    output.stat("Skipped", report.skipped.len(), Tone::Bad);
    for page in &report.skipped {
        output.item(&page.source_path, Some(page.reason.as_str()));
    }
}
