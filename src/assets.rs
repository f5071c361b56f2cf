//! Static asset stage.
//!
//! Runs after the source tree is cleaned and writes next to it:
//!
//! ```text
//! src/assets/images/**   ──►  dist/assets/images/**   (byte copy)
//! src/assets/fonts/**    ──►  dist/assets/fonts/**    (byte copy)
//! src/assets/css/*.css   ──►  dist/assets/css/*.min.css
//! src/assets/js/*.js     ──►  dist/assets/js/*.min.js
//! src/html/*.html        ──►  dist/html/*.min.html
//! ```
//!
//! Stylesheets go through lightningcss and scripts through oxc; both are
//! parsed first, so a file with a syntax error is skipped rather than
//! mangled. Only the top level of `css/`, `js/` and the template directory is
//! minified. A file whose name already contains `.min.` is copied as-is.
//! A missing copy directory is reported and skipped; missing `css/`, `js/`
//! or template directories are simply empty.
//!
//! Nothing in this stage aborts the build. A file that cannot be read,
//! decoded, minified, or written is recorded as a [`SkippedAsset`].
//!
//! Templates are static HTML. They are minified with the same PHP-aware
//! minifier as the pages, so embedded `<?php … ?>` blocks pass through.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{BuildConfig, ConfigError};
use crate::encoding::{self, DecodeError, TextEncoding};
use crate::minify::{MinifyError, minify_html};

/// Failure for a single asset. The asset is skipped, the stage continues.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("minification failed: {0}")]
    Minify(#[from] MinifyError),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A stylesheet, script, or template written in minified form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifiedAsset {
    /// Relative to the project root.
    pub source: PathBuf,
    /// Relative to the output root.
    pub output: PathBuf,
    pub bytes_before: usize,
    pub bytes_after: usize,
}

#[derive(Debug)]
pub struct SkippedAsset {
    /// Relative to the project root.
    pub path: PathBuf,
    pub error: AssetError,
}

/// Everything the asset stage did, for the build summary.
#[derive(Debug, Default)]
pub struct AssetReport {
    /// Files copied byte-for-byte, relative to the output root.
    pub copied: Vec<PathBuf>,
    pub minified: Vec<MinifiedAsset>,
    /// Copy directories that do not exist, relative to the project root.
    pub missing: Vec<PathBuf>,
    pub skipped: Vec<SkippedAsset>,
}

impl AssetReport {
    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
            && self.minified.is_empty()
            && self.missing.is_empty()
            && self.skipped.is_empty()
    }
}

/// Minify a stylesheet with lightningcss.
pub fn minify_css(css: &str) -> Result<String, AssetError> {
    let sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| AssetError::Syntax(e.to_string()))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| AssetError::Syntax(e.to_string()))?;
    Ok(printed.code)
}

/// Minify a classic script with oxc: comments and whitespace go, names and
/// statements stay, since inline handlers on the pages call into them.
pub fn minify_js(js: &str) -> Result<String, AssetError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, js, SourceType::cjs()).parse();
    if !ret.errors.is_empty() {
        let message = ret
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AssetError::Syntax(message));
    }
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .build(&ret.program)
        .code;
    Ok(code)
}

/// `site.css` becomes `site.min.css`.
pub fn min_file_name(path: &Path, ext: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{stem}.min.{ext}")
}

/// Copies and minifies the static assets into the output directory.
#[derive(Debug)]
pub struct AssetBuilder<'a> {
    config: &'a BuildConfig,
    encodings: Vec<TextEncoding>,
}

impl<'a> AssetBuilder<'a> {
    pub fn new(config: &'a BuildConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            encodings: config.text_encodings()?,
            config,
        })
    }

    /// Run the whole asset stage. See the [module docs](self).
    pub fn run(&self) -> AssetReport {
        let mut report = AssetReport::default();
        let assets = &self.config.assets;
        if !assets.enabled {
            debug!("asset stage disabled");
            return report;
        }

        let source = self.config.assets_source();
        let output = self.config.assets_output();

        for name in &assets.copy_dirs {
            self.copy_tree(&source.join(name), &output.join(name), &mut report);
        }
        self.minify_dir(
            &source.join("css"),
            &output.join("css"),
            "css",
            minify_css,
            &mut report,
        );
        self.minify_dir(
            &source.join("js"),
            &output.join("js"),
            "js",
            minify_js,
            &mut report,
        );

        let minify_templates = assets.minify_templates;
        self.minify_dir(
            &self.config.templates_source(),
            &self.config.templates_output(),
            "html",
            |text| {
                if minify_templates {
                    Ok(minify_html(text)?)
                } else {
                    Ok(text.to_string())
                }
            },
            &mut report,
        );

        info!(
            copied = report.copied.len(),
            minified = report.minified.len(),
            missing = report.missing.len(),
            skipped = report.skipped.len(),
            "assets built"
        );
        report
    }

    fn copy_tree(&self, src: &Path, dst: &Path, report: &mut AssetReport) {
        if !src.is_dir() {
            let rel = self.source_rel(src);
            warn!(path = %rel.display(), "asset directory not found");
            report.missing.push(rel);
            return;
        }

        for entry in WalkDir::new(src).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.skip_walk_error(err, report);
                    continue;
                }
            };
            let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
            let dest = dst.join(rel);

            if entry.file_type().is_dir() {
                if let Err(err) = fs::create_dir_all(&dest) {
                    self.skip(entry.path(), AssetError::Write(err), report);
                }
                continue;
            }
            match copy_file(entry.path(), &dest) {
                Ok(()) => report.copied.push(self.output_rel(&dest)),
                Err(err) => self.skip(entry.path(), AssetError::Write(err), report),
            }
        }
    }

    /// Minify every `*.<ext>` directly inside `src` into `dst`.
    fn minify_dir(
        &self,
        src: &Path,
        dst: &Path,
        ext: &str,
        minify: impl Fn(&str) -> Result<String, AssetError>,
        report: &mut AssetReport,
    ) {
        if !src.is_dir() {
            debug!(path = %src.display(), "nothing to minify");
            return;
        }

        let walker = WalkDir::new(src)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    self.skip_walk_error(err, report);
                    continue;
                }
            };
            let path = entry.path();
            let matches_ext = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            if !entry.file_type().is_file() || !matches_ext {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if name.contains(".min.") {
                let dest = dst.join(entry.file_name());
                match copy_file(path, &dest) {
                    Ok(()) => report.copied.push(self.output_rel(&dest)),
                    Err(err) => self.skip(path, AssetError::Write(err), report),
                }
                continue;
            }

            let dest = dst.join(min_file_name(path, ext));
            match self.minify_file(path, &dest, &minify) {
                Ok((bytes_before, bytes_after)) => {
                    debug!(path = %path.display(), bytes_before, bytes_after, "minified");
                    report.minified.push(MinifiedAsset {
                        source: self.source_rel(path),
                        output: self.output_rel(&dest),
                        bytes_before,
                        bytes_after,
                    });
                }
                Err(error) => self.skip(path, error, report),
            }
        }
    }

    fn minify_file(
        &self,
        src: &Path,
        dest: &Path,
        minify: &impl Fn(&str) -> Result<String, AssetError>,
    ) -> Result<(usize, usize), AssetError> {
        let bytes = fs::read(src).map_err(AssetError::Read)?;
        let (text, _) = encoding::decode(&bytes, &self.encodings)?;
        let minified = minify(&text)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(AssetError::Write)?;
        }
        fs::write(dest, minified.as_bytes()).map_err(AssetError::Write)?;
        Ok((bytes.len(), minified.len()))
    }

    fn skip(&self, path: &Path, error: AssetError, report: &mut AssetReport) {
        let path = self.source_rel(path);
        warn!(path = %path.display(), %error, "skipping asset");
        report.skipped.push(SkippedAsset { path, error });
    }

    fn skip_walk_error(&self, err: walkdir::Error, report: &mut AssetReport) {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        self.skip(&path, err.into(), report);
    }

    fn source_rel(&self, path: &Path) -> PathBuf {
        relative_to(path, &self.config.project_root)
    }

    fn output_rel(&self, path: &Path) -> PathBuf {
        relative_to(path, &self.config.output_root())
    }
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}
