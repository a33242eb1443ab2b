//! Page dispatch.
//!
//! [`Builder::build`] runs one task per navigation entry. Each task plans
//! its paths, renders or copies the page, publishes the files it includes,
//! attributes contributors, writes the result and finally contributes to
//! its section's single page bundle. A failing page is logged and reported
//! without stopping its siblings.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rw_config::{BuildConfig, OutputFormat};
use rw_renderer::{Render, RenderContext};
use rw_vcs::VcsClient;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::contributors::{ContributorAttributor, ContributorDirectory, embed_contributors};
use crate::error::{BuildError, PageError};
use crate::includes;
use crate::leading::{self, filter_leading, leading_markdown};
use crate::navigation::Navigation;
use crate::paths::{self, PathFacts};
use crate::presets::Presets;
use crate::report::{BuildReport, OutputKind, PageOutcome};
use crate::single_page::SinglePageAggregator;

/// How a navigation entry is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    /// `.md`: rendered.
    Markdown,
    /// Leading page: `index.yaml` with conditions resolved, or any `.yaml`
    /// entry in HTML output.
    Leading,
    /// Anything else, including other `.yaml` files: copied.
    Copy,
}

impl FileKind {
    fn of(facts: &PathFacts, config: &BuildConfig) -> Self {
        match facts.extension.as_str() {
            ".md" => Self::Markdown,
            ".yaml" | ".yml" if config.output_format == OutputFormat::Html => Self::Leading,
            _ if config.resolve_conditions && leading::is_leading(facts) => Self::Leading,
            _ => Self::Copy,
        }
    }
}

/// Multi-file documentation builder.
pub struct Builder<V> {
    config: BuildConfig,
    renderer: Arc<dyn Render>,
    vars: BTreeMap<String, String>,
    presets: Presets,
    vcs: Option<(Arc<V>, String)>,
}

impl<V: VcsClient + 'static> Builder<V> {
    /// Create a builder rendering pages with `renderer`.
    pub fn new(config: BuildConfig, renderer: Arc<dyn Render>) -> Self {
        Self {
            config,
            renderer,
            vars: BTreeMap::new(),
            presets: Presets::default(),
            vcs: None,
        }
    }

    /// Use `vcs` for contributor attribution.
    ///
    /// `path_prefix` is the repository-relative directory of the source root.
    #[must_use]
    pub fn with_vcs(mut self, vcs: Arc<V>, path_prefix: impl Into<String>) -> Self {
        self.vcs = Some((vcs, path_prefix.into()));
        self
    }

    /// Variables applied to every page on top of presets.
    #[must_use]
    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Directory presets.
    #[must_use]
    pub fn with_presets(mut self, presets: Presets) -> Self {
        self.presets = presets;
        self
    }

    /// Build every page listed in `navigation`.
    ///
    /// Page failures end up in the report. Only build-wide setup failures
    /// are returned as errors.
    pub async fn build(self, navigation: &Navigation) -> Result<BuildReport, BuildError> {
        let attribution = self.prepare_attribution().await?;

        if self.config.single_page && self.config.output_format != OutputFormat::Md {
            tracing::warn!(
                format = %self.config.output_format,
                "Single page bundles require markdown output, skipping bundles"
            );
        }

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| BuildError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            })?;

        let paths = navigation.paths();
        // Navigation pages are written by their own task, never as an include
        let published = paths
            .iter()
            .filter_map(|path| paths::normalize(path).ok())
            .collect();

        let ctx = Arc::new(BuildContext {
            config: self.config,
            renderer: self.renderer,
            vars: self.vars,
            presets: self.presets,
            attribution,
            aggregator: SinglePageAggregator::new(),
            published: Mutex::new(published),
        });

        tracing::info!(pages = paths.len(), "Building documentation");

        let mut tasks = JoinSet::new();
        let mut task_seqs = HashMap::with_capacity(paths.len());
        for (seq, nav_path) in paths.iter().enumerate() {
            let ctx = Arc::clone(&ctx);
            let path = nav_path.clone();
            let handle = tasks.spawn(async move { (seq, ctx.process_page(seq, &path).await) });
            task_seqs.insert(handle.id(), seq);
        }

        let mut results: Vec<Option<Result<PageOutcome, PageError>>> =
            std::iter::repeat_with(|| None).take(paths.len()).collect();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (seq, result) = match joined {
                Ok((_, (seq, result))) => (seq, result),
                Err(e) => {
                    let Some(&seq) = task_seqs.get(&e.id()) else {
                        tracing::error!(error = %e, "Unknown page task failed");
                        continue;
                    };
                    (seq, Err(PageError::Task(e.to_string())))
                }
            };
            results[seq] = Some(result);
        }

        let mut report = BuildReport {
            attempted: paths.len(),
            ..BuildReport::default()
        };
        for (nav_path, result) in paths.iter().zip(results) {
            match result {
                Some(Ok(outcome)) => report.record_written(outcome),
                Some(Err(e)) => {
                    tracing::error!(path = %nav_path, error = %e, "Failed to build page");
                    report.record_skipped(nav_path, e.to_string());
                }
                None => report.record_skipped(nav_path, "page task did not finish".to_owned()),
            }
        }

        tracing::info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            bundles = report.bundles.len(),
            "Build finished"
        );
        Ok(report)
    }

    /// Load the contributor directory when attribution applies to this build.
    async fn prepare_attribution(&self) -> Result<Option<Attribution<V>>, BuildError> {
        if !self.config.contributors {
            return Ok(None);
        }
        if self.config.output_format != OutputFormat::Md {
            tracing::warn!(
                format = %self.config.output_format,
                "Contributor attribution requires markdown output, skipping attribution"
            );
            return Ok(None);
        }
        let Some((vcs, path_prefix)) = &self.vcs else {
            return Err(BuildError::MissingVcs);
        };

        let directory = ContributorDirectory::load(vcs.as_ref())
            .await
            .map_err(BuildError::Contributors)?;
        if directory.is_empty() {
            tracing::warn!("Repository has no contributors with a login, skipping attribution");
            return Ok(None);
        }
        tracing::info!(contributors = directory.len(), "Loaded repository contributors");

        Ok(Some(Attribution {
            attributor: ContributorAttributor::new(
                Arc::clone(vcs),
                self.config.source_dir.clone(),
                path_prefix,
            ),
            directory,
        }))
    }
}

struct Attribution<V> {
    attributor: ContributorAttributor<V>,
    directory: ContributorDirectory,
}

/// State shared by every page task of one build.
struct BuildContext<V> {
    config: BuildConfig,
    renderer: Arc<dyn Render>,
    vars: BTreeMap<String, String>,
    presets: Presets,
    attribution: Option<Attribution<V>>,
    aggregator: SinglePageAggregator,
    /// Source-relative files already claimed for writing.
    published: Mutex<HashSet<String>>,
}

impl<V: VcsClient + 'static> BuildContext<V> {
    async fn process_page(&self, seq: usize, nav_path: &str) -> Result<PageOutcome, PageError> {
        let facts = paths::plan(nav_path, &self.config)?;

        tokio::fs::create_dir_all(&facts.output_dir)
            .await
            .map_err(PageError::io("create", &facts.output_dir))?;

        match FileKind::of(&facts, &self.config) {
            FileKind::Markdown => self.process_markdown(seq, facts).await,
            FileKind::Leading => self.process_leading(facts).await,
            FileKind::Copy => self.copy(facts).await,
        }
    }

    async fn copy(&self, facts: PathFacts) -> Result<PageOutcome, PageError> {
        let target = facts.copy_target();
        tokio::fs::copy(&facts.resolved_source_path, &target)
            .await
            .map_err(PageError::io("copy", &facts.resolved_source_path))?;
        tracing::debug!(path = %facts.source_path, "Copied file");
        Ok(PageOutcome {
            source_path: facts.source_path,
            output_path: target,
            kind: OutputKind::Copied,
            bundle: None,
            contributors: None,
        })
    }

    /// Filter a leading page, or render it to HTML for HTML output.
    async fn process_leading(&self, facts: PathFacts) -> Result<PageOutcome, PageError> {
        let source = tokio::fs::read_to_string(&facts.resolved_source_path)
            .await
            .map_err(PageError::io("read", &facts.resolved_source_path))?;
        let variables = self.variables_for(&facts);

        let (output_path, text) = match self.config.output_format {
            OutputFormat::Md => (facts.copy_target(), filter_leading(&source, &variables)?),
            OutputFormat::Html => {
                let markdown = leading_markdown(&source, &variables)?;
                let context = self.render_context(&facts, variables);
                (facts.output_path.clone(), self.renderer.render(&markdown, &context)?)
            }
        };

        tokio::fs::write(&output_path, text)
            .await
            .map_err(PageError::io("write", &output_path))?;
        tracing::debug!(path = %facts.source_path, output = %output_path.display(), "Wrote leading page");

        Ok(PageOutcome {
            source_path: facts.source_path,
            output_path,
            kind: OutputKind::Rendered,
            bundle: None,
            contributors: None,
        })
    }

    async fn process_markdown(&self, seq: usize, facts: PathFacts) -> Result<PageOutcome, PageError> {
        let source = tokio::fs::read_to_string(&facts.resolved_source_path)
            .await
            .map_err(PageError::io("read", &facts.resolved_source_path))?;
        let context = self.render_context(&facts, self.variables_for(&facts));

        let mut rendered = match self.config.output_format {
            OutputFormat::Md => {
                let rendered = self.renderer.render(&source, &context)?;
                self.publish_includes(&facts.source_path, &rendered, &context)
                    .await?;
                rendered
            }
            OutputFormat::Html => {
                let inlined =
                    includes::inline_includes(&self.config.source_dir, &facts.source_path, &source)
                        .await;
                self.renderer.render(&inlined, &context)?
            }
        };

        let mut contributors = None;
        if let Some(attribution) = &self.attribution {
            let page_contributors = attribution
                .attributor
                .attribute(&facts.source_path, &rendered, &attribution.directory)
                .await?;
            rendered = embed_contributors(&rendered, &page_contributors)?;
            contributors = Some(page_contributors.len());
        }

        let fragment = match &facts.single_page {
            Some(single) => {
                let context = RenderContext {
                    output_path: single.file_dir.join(
                        facts
                            .output_path
                            .file_name()
                            .unwrap_or(facts.output_path.as_os_str()),
                    ),
                    ..context
                };
                let fragment = self.renderer.render(&source, &context)?;
                Some(includes::rebase(
                    &fragment,
                    paths::parent_dir(&single.relative_path),
                ))
            }
            None => None,
        };

        tokio::fs::write(&facts.output_path, rendered)
            .await
            .map_err(PageError::io("write", &facts.output_path))?;
        tracing::debug!(path = %facts.source_path, output = %facts.output_path.display(), "Wrote page");

        // Only pages that made it to disk join their bundle
        let mut bundle = None;
        if let (Some(single), Some(fragment)) = (&facts.single_page, fragment) {
            self.aggregator
                .append_and_write(
                    &facts.section_dir,
                    seq,
                    &facts.source_path,
                    &single.relative_path,
                    &fragment,
                    &single.bundle_path,
                )
                .await
                .map_err(PageError::io("write", &single.bundle_path))?;
            bundle = Some(single.bundle_path.clone());
        }

        Ok(PageOutcome {
            source_path: facts.source_path,
            output_path: facts.output_path,
            kind: OutputKind::Rendered,
            bundle,
            contributors,
        })
    }

    /// Render the files `page` includes, transitively, to the same relative
    /// path in the output tree using the page's variables.
    ///
    /// A file is written by the first page that claims it. Unreadable
    /// targets are left to the reader of the output and only logged.
    async fn publish_includes(
        &self,
        page: &str,
        rendered: &str,
        page_context: &RenderContext,
    ) -> Result<(), PageError> {
        let mut visited = HashSet::from([page.to_owned()]);
        let mut pending = includes::resolved_targets(page, rendered);
        pending.reverse();

        while let Some(path) = pending.pop() {
            if !visited.insert(path.clone()) || !self.published.lock().await.insert(path.clone()) {
                continue;
            }

            let source_path = self.config.source_dir.join(&path);
            let content = match tokio::fs::read_to_string(&source_path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(page, include = %path, error = %e, "Cannot read included file");
                    continue;
                }
            };

            let output_path = self.config.output_dir.join(&path);
            let context = RenderContext {
                source_path,
                output_path: output_path.clone(),
                ..page_context.clone()
            };
            let text = self.renderer.render(&content, &context)?;

            if let Some(dir) = output_path.parent() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(PageError::io("create", dir))?;
            }
            tokio::fs::write(&output_path, &text)
                .await
                .map_err(PageError::io("write", &output_path))?;
            tracing::debug!(page, include = %path, "Published included file");

            let mut nested = includes::resolved_targets(&path, &text);
            nested.reverse();
            pending.extend(nested);
        }
        Ok(())
    }

    /// Presets of the page's directory overlaid with configured vars.
    fn variables_for(&self, facts: &PathFacts) -> BTreeMap<String, String> {
        let mut variables = self.presets.variables_for(facts.source_dir());
        variables.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables
    }

    fn render_context(&self, facts: &PathFacts, variables: BTreeMap<String, String>) -> RenderContext {
        RenderContext {
            variables,
            source_path: facts.resolved_source_path.clone(),
            output_path: facts.output_path.clone(),
            source_root: self.config.source_dir.clone(),
            output_root: self.config.output_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use rw_renderer::{HtmlRenderer, MarkdownRenderer, RenderError};
    use rw_vcs::MockVcs;

    fn write(root: &Path, path: &str, content: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    fn config(root: &Path) -> BuildConfig {
        BuildConfig {
            source_dir: root.join("docs"),
            output_dir: root.join("out"),
            output_format: OutputFormat::Md,
            single_page: false,
            contributors: false,
            resolve_conditions: false,
            toc_filename: "toc.yaml".to_owned(),
        }
    }

    fn nav(paths: &[&str]) -> Navigation {
        Navigation::from_paths(paths.iter().map(|p| (*p).to_owned()).collect())
    }

    fn builder(config: BuildConfig) -> Builder<MockVcs> {
        Builder::new(config, Arc::new(MarkdownRenderer::new()))
    }

    /// Delays the first page so it finishes last.
    struct SlowFirstRenderer;

    impl Render for SlowFirstRenderer {
        fn render(&self, content: &str, context: &RenderContext) -> Result<String, RenderError> {
            if context.source_path.ends_with("intro.md") {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            MarkdownRenderer::new().render(content, context)
        }
    }

    /// Fails on pages named `broken.md`.
    struct FailingRenderer;

    impl Render for FailingRenderer {
        fn render(&self, content: &str, context: &RenderContext) -> Result<String, RenderError> {
            if context.source_path.ends_with("broken.md") {
                return Err(RenderError::UnclosedCondition("x".to_owned()));
            }
            MarkdownRenderer::new().render(content, context)
        }
    }

    #[tokio::test]
    async fn test_renders_and_copies() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/en/index.yaml", "title: En\n");
        write(dir.path(), "docs/en/intro.md", "# {{ product }}\n");
        write(dir.path(), "docs/en/logo.svg", "<svg/>");

        let mut vars = BTreeMap::new();
        vars.insert("product".to_owned(), "RW".to_owned());

        let report = builder(config(dir.path()))
            .with_vars(vars)
            .build(&nav(&["en/index.yaml", "en/intro.md", "en/logo.svg"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.attempted, 3);
        let kinds: Vec<OutputKind> = report.written.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![OutputKind::Copied, OutputKind::Rendered, OutputKind::Copied]
        );

        let out = dir.path().join("out/en");
        assert_eq!(std::fs::read_to_string(out.join("index.yaml")).unwrap(), "title: En\n");
        assert_eq!(std::fs::read_to_string(out.join("intro.md")).unwrap(), "# RW\n");
        assert_eq!(std::fs::read_to_string(out.join("logo.svg")).unwrap(), "<svg/>");
        assert!(report.bundles.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_bundle_follows_navigation_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/en/intro.md", "# Intro\n");
        write(dir.path(), "docs/en/setup.md", "# Setup\n");
        write(dir.path(), "docs/en/toc.yaml", "items: []\n");

        let mut cfg = config(dir.path());
        cfg.single_page = true;
        let report = Builder::<MockVcs>::new(cfg, Arc::new(SlowFirstRenderer))
            .build(&nav(&["en/intro.md", "en/setup.md", "en/toc.yaml"]))
            .await
            .unwrap();

        let bundle_path = dir.path().join("out/en/_single_page/index.md");
        assert_eq!(
            report.bundles.iter().collect::<Vec<_>>(),
            vec![&bundle_path]
        );

        let bundle = std::fs::read_to_string(&bundle_path).unwrap();
        let intro = bundle.find("# Intro").unwrap();
        let setup = bundle.find("# Setup").unwrap();
        assert!(intro < setup);
        assert!(!bundle.contains("items"));
        assert_eq!(bundle.matches("<a id=").count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_navigation_entry_appears_once_in_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/en/a.md", "A\n");
        write(dir.path(), "docs/en/b.md", "B\n");

        let mut cfg = config(dir.path());
        cfg.single_page = true;
        let report = builder(cfg)
            .build(&nav(&["en/a.md", "en/b.md", "en/a.md"]))
            .await
            .unwrap();

        assert!(report.is_success());
        let bundle =
            std::fs::read_to_string(dir.path().join("out/en/_single_page/index.md")).unwrap();
        assert_eq!(bundle.matches("id=\"a\"").count(), 1);
        assert!(bundle.find("id=\"a\"").unwrap() < bundle.find("id=\"b\"").unwrap());
    }

    #[tokio::test]
    async fn test_failing_page_does_not_block_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/en/ok.md", "ok\n");
        write(dir.path(), "docs/en/broken.md", "broken\n");

        let report = Builder::<MockVcs>::new(config(dir.path()), Arc::new(FailingRenderer))
            .build(&nav(&["en/broken.md", "en/ok.md", "en/missing.md", "../escape.md"]))
            .await
            .unwrap();

        assert_eq!(report.attempted, 4);
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.written[0].source_path, "en/ok.md");
        let skipped: Vec<&str> = report
            .skipped
            .iter()
            .map(|s| s.source_path.as_str())
            .collect();
        assert_eq!(skipped, vec!["en/broken.md", "en/missing.md", "../escape.md"]);
        assert!(!report.is_success());
        assert!(dir.path().join("out/en/ok.md").exists());
    }

    #[tokio::test]
    async fn test_markdown_output_publishes_includes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "docs/en/page.md",
            "# {{ product }}\n{% include [n](_includes/note.md) %}\n",
        );
        write(
            dir.path(),
            "docs/en/_includes/note.md",
            "{{ product }} {% include [t](tip.md) %}\n",
        );
        write(
            dir.path(),
            "docs/en/_includes/tip.md",
            "{% if product %}tip{% endif %} {% include [p](../page.md) %}\n",
        );

        let mut vars = BTreeMap::new();
        vars.insert("product".to_owned(), "RW".to_owned());
        let report = builder(config(dir.path()))
            .with_vars(vars)
            .build(&nav(&["en/page.md"]))
            .await
            .unwrap();

        assert!(report.is_success());
        let out = dir.path().join("out/en");
        assert_eq!(
            std::fs::read_to_string(out.join("page.md")).unwrap(),
            "# RW\n{% include [n](_includes/note.md) %}\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("_includes/note.md")).unwrap(),
            "RW {% include [t](tip.md) %}\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join("_includes/tip.md")).unwrap(),
            "tip {% include [p](../page.md) %}\n"
        );
    }

    #[tokio::test]
    async fn test_html_output_inlines_includes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "docs/en/page.md",
            "# Page\n\n{% include notitle [n](_includes/note.md) %}\n",
        );
        write(
            dir.path(),
            "docs/en/_includes/note.md",
            "---\ntitle: Note\n---\n# Note\n\n**{{ product }}** note\n",
        );

        let mut vars = BTreeMap::new();
        vars.insert("product".to_owned(), "RW".to_owned());
        let mut cfg = config(dir.path());
        cfg.output_format = OutputFormat::Html;
        let report = Builder::<MockVcs>::new(cfg, Arc::new(HtmlRenderer::new()))
            .with_vars(vars)
            .build(&nav(&["en/page.md"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/en/page.html")).unwrap(),
            "<h1>Page</h1>\n<p><strong>RW</strong> note</p>\n"
        );
        assert!(!dir.path().join("out/en/_includes").exists());
    }

    #[tokio::test]
    async fn test_bundle_includes_point_at_page_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "docs/en/guide/page.md",
            "Page {% include [n](_includes/note.md) %}\n",
        );
        write(dir.path(), "docs/en/guide/_includes/note.md", "note\n");

        let mut cfg = config(dir.path());
        cfg.single_page = true;
        builder(cfg)
            .build(&nav(&["en/guide/page.md"]))
            .await
            .unwrap();

        let bundle =
            std::fs::read_to_string(dir.path().join("out/en/_single_page/index.md")).unwrap();
        assert_eq!(
            bundle,
            "<a id=\"guide_page\"></a>\n\nPage {% include [n](../guide/_includes/note.md) %}\n"
        );
        assert!(dir.path().join("out/en/guide/_includes/note.md").exists());
    }

    #[tokio::test]
    async fn test_page_with_failed_attribution_stays_out_of_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/en/a.md", "A\n");
        write(dir.path(), "docs/en/b.md", "B\n");

        let vcs = Arc::new(
            MockVcs::new()
                .with_contributor("alice", "")
                .with_failure("en/a.md"),
        );
        let mut cfg = config(dir.path());
        cfg.single_page = true;
        cfg.contributors = true;
        let report = builder(cfg)
            .with_vcs(vcs, "")
            .build(&nav(&["en/a.md", "en/b.md"]))
            .await
            .unwrap();

        assert_eq!(report.skipped[0].source_path, "en/a.md");
        let bundle_path = dir.path().join("out/en/_single_page/index.md");
        assert!(report.bundles.contains(&bundle_path));
        let bundle = std::fs::read_to_string(&bundle_path).unwrap();
        assert!(!bundle.contains("id=\"a\""));
        assert!(bundle.contains("id=\"b\""));
        assert!(!dir.path().join("out/en/a.md").exists());
    }

    #[tokio::test]
    async fn test_leading_page_conditions_in_markdown_output() {
        let dir = tempfile::tempdir().unwrap();
        let leading = "title: Guide\nlinks:\n  - title: Setup\n    href: setup.md\n  - title: Admin\n    href: admin.md\n    when: admins\n";
        write(dir.path(), "docs/en/index.yaml", leading);
        write(dir.path(), "docs/en/data.yaml", "when: admins\n");

        let mut cfg = config(dir.path());
        cfg.resolve_conditions = true;
        let report = builder(cfg)
            .build(&nav(&["en/index.yaml", "en/data.yaml"]))
            .await
            .unwrap();

        assert!(report.is_success());
        let kinds: Vec<OutputKind> = report.written.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![OutputKind::Rendered, OutputKind::Copied]);

        let out = dir.path().join("out/en");
        let filtered: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(out.join("index.yaml")).unwrap())
                .unwrap();
        assert_eq!(filtered["links"].as_sequence().unwrap().len(), 1);
        assert_eq!(filtered["links"][0]["title"].as_str(), Some("Setup"));
        assert_eq!(
            std::fs::read_to_string(out.join("data.yaml")).unwrap(),
            "when: admins\n"
        );
    }

    #[tokio::test]
    async fn test_leading_page_copied_without_condition_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let leading = "links:\n  - title: Admin\n    when: admins\n";
        write(dir.path(), "docs/en/index.yaml", leading);

        builder(config(dir.path()))
            .build(&nav(&["en/index.yaml"]))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/en/index.yaml")).unwrap(),
            leading
        );
    }

    #[tokio::test]
    async fn test_html_output_renders_leading_page() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "docs/en/index.yaml",
            "title: Guide\nlinks:\n  - title: Setup\n    href: setup.md\n  - title: Beta\n    href: beta.md\n    when: beta\n",
        );

        let mut cfg = config(dir.path());
        cfg.output_format = OutputFormat::Html;
        let report = Builder::<MockVcs>::new(cfg, Arc::new(HtmlRenderer::new()))
            .build(&nav(&["en/index.yaml"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(
            report.written[0].output_path,
            dir.path().join("out/en/index.html")
        );
        let html = std::fs::read_to_string(dir.path().join("out/en/index.html")).unwrap();
        assert!(html.contains("<h1>Guide</h1>"));
        assert!(html.contains("<a href=\"setup.html\">Setup</a>"));
        assert!(!html.contains("Beta"));
    }

    #[tokio::test]
    async fn test_attribution_embeds_contributors() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "docs/en/page.md",
            "---\ntitle: Page\n---\n{% include [n](_includes/note.md) %}\n",
        );
        write(dir.path(), "docs/en/_includes/note.md", "note\n");

        let vcs = Arc::new(
            MockVcs::new()
                .with_contributor("alice", "https://avatars/alice")
                .with_contributor("bob", "https://avatars/bob")
                .with_history("docs/en/page.md", &[("alice", 2)])
                .with_history("docs/en/_includes/note.md", &[("bob", 1), ("eve", 7)]),
        );

        let mut cfg = config(dir.path());
        cfg.contributors = true;
        let report = builder(cfg)
            .with_vcs(vcs, "docs")
            .build(&nav(&["en/page.md"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.written[0].contributors, Some(2));

        let output = std::fs::read_to_string(dir.path().join("out/en/page.md")).unwrap();
        assert_eq!(
            output,
            "---\ntitle: Page\ncontributors: [{\"login\":\"alice\",\"avatar\":\"https://avatars/alice\",\"name\":\"alice\",\"commits\":2},{\"login\":\"bob\",\"avatar\":\"https://avatars/bob\",\"name\":\"bob\",\"commits\":1}]\n---\n{% include [n](_includes/note.md) %}\n"
        );
    }

    #[tokio::test]
    async fn test_attribution_failure_skips_page_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/a.md", "A\n");
        write(dir.path(), "docs/b.md", "B\n");

        let vcs = Arc::new(
            MockVcs::new()
                .with_contributor("alice", "")
                .with_failure("a.md"),
        );
        let mut cfg = config(dir.path());
        cfg.contributors = true;
        let report = builder(cfg)
            .with_vcs(vcs, "")
            .build(&nav(&["a.md", "b.md"]))
            .await
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].source_path, "a.md");
        assert_eq!(report.written[0].source_path, "b.md");
    }

    #[tokio::test]
    async fn test_global_contributor_failure_aborts_build() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/a.md", "A\n");

        let mut cfg = config(dir.path());
        cfg.contributors = true;
        let result = builder(cfg)
            .with_vcs(Arc::new(MockVcs::new().with_global_failure()), "")
            .build(&nav(&["a.md"]))
            .await;

        assert!(matches!(result, Err(BuildError::Contributors(_))));
        assert!(!dir.path().join("out/a.md").exists());
    }

    #[tokio::test]
    async fn test_empty_directory_disables_attribution() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/a.md", "A\n");

        let vcs = Arc::new(MockVcs::new().with_anonymous_contributor());
        let mut cfg = config(dir.path());
        cfg.contributors = true;
        let report = builder(cfg)
            .with_vcs(Arc::clone(&vcs), "")
            .build(&nav(&["a.md"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.written[0].contributors, None);
        assert!(vcs.lookups().is_empty());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/a.md")).unwrap(),
            "A\n"
        );
    }

    #[tokio::test]
    async fn test_attribution_without_vcs_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.contributors = true;

        let result = builder(cfg).build(&nav(&[])).await;
        assert!(matches!(result, Err(BuildError::MissingVcs)));
    }

    #[tokio::test]
    async fn test_html_output_skips_bundles_and_attribution() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/en/a.md", "# A\n");

        let vcs = Arc::new(MockVcs::new().with_contributor("alice", ""));
        let mut cfg = config(dir.path());
        cfg.output_format = OutputFormat::Html;
        cfg.single_page = true;
        cfg.contributors = true;
        let report = Builder::new(cfg, Arc::new(HtmlRenderer::new()))
            .with_vcs(Arc::clone(&vcs), "")
            .build(&nav(&["en/a.md"]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(report.bundles.is_empty());
        assert!(vcs.lookups().is_empty());
        assert_eq!(
            report.written[0].output_path,
            dir.path().join("out/en/a.html")
        );
        let html = std::fs::read_to_string(dir.path().join("out/en/a.html")).unwrap();
        assert!(html.contains("<h1>A</h1>"));
        assert!(!dir.path().join("out/en/_single_page").exists());
    }

    #[tokio::test]
    async fn test_presets_overlaid_by_vars() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "docs/en/presets.yaml",
            "default:\n  product: Preset\n  audience: all\n",
        );
        write(dir.path(), "docs/en/a.md", "{{ product }} for {{ audience }}\n");

        let presets = Presets::load(&dir.path().join("docs"), ["en"]).unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("product".to_owned(), "RW".to_owned());

        builder(config(dir.path()))
            .with_presets(presets)
            .with_vars(vars)
            .build(&nav(&["en/a.md"]))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/en/a.md")).unwrap(),
            "RW for all\n"
        );
    }
}
