//! Build orchestration.
//!
//! ```text
//! CleanSource ──► Assets ──► PerLanguage(en) ──► PerLanguage(hu) ──► Done
//!      │            │
//!      │            └─ per-file failures recorded, never fatal
//!      └─ SourceTreeError: abort, no page is built
//!
//! PerLanguage(lang):
//!   Fetch ─► Inline ─► RewriteUrls ─► PatchSelector ─► Minify ─► Write
//!     │        └──────────── any failure: language abandoned ────────┘
//!     └─ non-200 / network error: language abandoned
//! ```
//!
//! Languages run one after another. A failed language is recorded in the
//! [`BuildReport`] and never affects the others. Nothing mutable is shared
//! between languages; the rewriter and the page list are built once up front.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::{AssetBuilder, AssetReport};
use crate::clean::{CleanReport, SourceTreeCleaner, SourceTreeError};
use crate::config::{BuildConfig, ConfigError};
use crate::fetch::{FetchError, PageFetcher, Transport};
use crate::inline::AssetInliner;
use crate::minify::{MinifyError, minify_html};
use crate::rewrite::UrlRewriter;
use crate::rules::RuleError;
use crate::selector::patch_selector;
use crate::types::PageVariant;

/// Failure that aborts the build before any page is produced.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Source(#[from] SourceTreeError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rule error: {0}")]
    Rules(#[from] RuleError),
}

/// Step of the per-language state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Inline,
    RewriteUrls,
    PatchSelector,
    Minify,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Inline => "inline",
            Stage::RewriteUrls => "rewrite-urls",
            Stage::PatchSelector => "patch-selector",
            Stage::Minify => "minify",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// Failure that abandons one language.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("asset root does not resolve against the page URL: {0}")]
    Inline(#[from] url::ParseError),
    #[error("minification failed: {0}")]
    Minify(#[from] MinifyError),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PageError {
    pub fn stage(&self) -> Stage {
        match self {
            PageError::Fetch(_) => Stage::Fetch,
            PageError::Inline(_) => Stage::Inline,
            PageError::Minify(_) => Stage::Minify,
            PageError::Write { .. } => Stage::Write,
        }
    }
}

/// What happened to one language.
#[derive(Debug)]
pub enum LanguageOutcome {
    Built {
        lang: String,
        path: PathBuf,
        bytes: usize,
        assets_inlined: usize,
        assets_dropped: usize,
    },
    Failed {
        lang: String,
        stage: Stage,
        error: PageError,
    },
}

impl LanguageOutcome {
    pub fn lang(&self) -> &str {
        match self {
            LanguageOutcome::Built { lang, .. } | LanguageOutcome::Failed { lang, .. } => lang,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, LanguageOutcome::Built { .. })
    }
}

/// Result of a full build.
#[derive(Debug)]
pub struct BuildReport {
    pub clean: CleanReport,
    pub assets: AssetReport,
    /// One entry per configured language, in configuration order.
    pub languages: Vec<LanguageOutcome>,
    pub output_root: PathBuf,
}

impl BuildReport {
    pub fn built(&self) -> impl Iterator<Item = &LanguageOutcome> {
        self.languages.iter().filter(|l| l.is_built())
    }

    pub fn failed(&self) -> impl Iterator<Item = &LanguageOutcome> {
        self.languages.iter().filter(|l| !l.is_built())
    }
}

/// PHP prologue placed in front of every page so it boots the cleaned tree.
pub fn bootstrap_header(php_dir: &str) -> String {
    format!("<?php\nsession_start();\ninclude_once __DIR__ . '/{php_dir}/autoload.php';\n?>\n")
}

struct Page {
    html: String,
    assets_inlined: usize,
    assets_dropped: usize,
}

/// Runs the whole build against a [`Transport`].
pub struct BuildOrchestrator<'a, T: Transport + ?Sized> {
    config: &'a BuildConfig,
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> BuildOrchestrator<'a, T> {
    pub fn new(config: &'a BuildConfig, transport: &'a T) -> Self {
        Self { config, transport }
    }

    /// Clean the source tree, build the static assets, then build every
    /// language in turn.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let base = self.config.site.base_url()?;
        let rewriter = UrlRewriter::new(&self.config.site.asset_root)?;

        info!("cleaning source tree");
        let clean = SourceTreeCleaner::new(self.config)?.run()?;

        info!("building static assets");
        let assets = AssetBuilder::new(self.config)?.run();

        let languages = self
            .config
            .site
            .languages
            .iter()
            .map(|lang| PageVariant::new(&base, &lang.code))
            .map(|variant| self.build_language(&variant, &rewriter))
            .collect();

        Ok(BuildReport {
            clean,
            assets,
            languages,
            output_root: self.config.output_root(),
        })
    }

    fn build_language(&self, variant: &PageVariant, rewriter: &UrlRewriter) -> LanguageOutcome {
        match self.render(variant, rewriter) {
            Ok(page) => match self.write(variant, &page.html) {
                Ok(path) => {
                    info!(lang = %variant.lang, path = %path.display(), "page written");
                    LanguageOutcome::Built {
                        lang: variant.lang.clone(),
                        path,
                        bytes: page.html.len(),
                        assets_inlined: page.assets_inlined,
                        assets_dropped: page.assets_dropped,
                    }
                }
                Err(error) => self.failed(variant, error),
            },
            Err(error) => self.failed(variant, error),
        }
    }

    fn failed(&self, variant: &PageVariant, error: PageError) -> LanguageOutcome {
        let stage = error.stage();
        warn!(lang = %variant.lang, %stage, %error, "language skipped");
        LanguageOutcome::Failed {
            lang: variant.lang.clone(),
            stage,
            error,
        }
    }

    /// Fetch one language and run it through every post-processing step.
    fn render(&self, variant: &PageVariant, rewriter: &UrlRewriter) -> Result<Page, PageError> {
        let site = &self.config.site;
        let body = PageFetcher::new(self.transport, site.page_timeout()).fetch(variant)?;

        let mut html = String::with_capacity(body.len() + 128);
        if site.bootstrap_header {
            html.push_str(&bootstrap_header(&self.config.php_dir.to_string_lossy()));
        }
        html.push_str(&body);

        let inliner = AssetInliner::new(
            self.transport,
            &variant.url,
            &site.asset_root,
            site.asset_timeout(),
        )?;
        let inlined = inliner.inline(&html);

        let html = rewriter.rewrite(&inlined.html).text;
        let html = patch_selector(&html, &site.languages, &variant.lang);
        let html = minify_html(&html)?;

        Ok(Page {
            html,
            assets_inlined: inlined.inlined.len(),
            assets_dropped: inlined.dropped.len(),
        })
    }

    fn write(&self, variant: &PageVariant, html: &str) -> Result<PathBuf, PageError> {
        let path = self.config.output_root().join(&variant.file_name);
        fs::write(&path, html).map_err(|source| PageError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
