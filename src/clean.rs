//! Source tree cleaning.
//!
//! Stage 1 of the build. Mirrors the development PHP tree into the output
//! directory with every excluded module removed:
//!
//! ```text
//! src/php/                      dist/
//! ├── PHPMailer/         ──►    ├── config.php           (copied from project root)
//! ├── APIClass.php       ──►    └── php/
//! ├── LanguageClass.php  ✗          ├── PHPMailer/       (verbatim)
//! ├── autoload.php       ──►        ├── APIClass.php     (cleaned)
//! └── img/logo.png       ──►        ├── autoload.php     (cleaned)
//!                                   └── img/logo.png     (byte copy)
//! ```
//!
//! ## Order of work
//!
//! 1. Verify the source root exists and that the output directory does not
//!    overlap the project root or an input tree, then delete and recreate
//!    the output directory.
//! 2. Copy each vendor directory verbatim. The walk never descends into them.
//! 3. Walk the source tree in file-name order. Excluded names are skipped,
//!    non-text files are byte-copied, text files are decoded, cleaned with
//!    [`RuleSet::cleaning`], and written back as UTF-8.
//! 4. Copy the site config file to the top of the output directory.
//!
//! Anything that goes wrong in steps 1, 2 or 4 is a [`SourceTreeError`] and
//! aborts the build. A file that cannot be read, decoded, or written in step 3,
//! or a directory that cannot be created, is recorded as a [`SkippedFile`] and
//! the walk carries on.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{BuildConfig, ConfigError};
use crate::encoding::{self, DecodeError, TextEncoding};
use crate::rules::{RuleError, RuleSet, Rewritten};
use crate::types::{ExclusionSet, SourceFile};

/// Failure that aborts the whole build.
#[derive(Error, Debug)]
pub enum SourceTreeError {
    #[error("source directory not found: {0}")]
    MissingSource(PathBuf),
    #[error("vendor directory not found: {0}")]
    MissingVendor(PathBuf),
    #[error("refusing to wipe {output}: {reason}")]
    UnsafeOutput { output: PathBuf, reason: String },
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rule error: {0}")]
    Rules(#[from] RuleError),
}

impl SourceTreeError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| SourceTreeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Failure for a single file. The file is skipped, the walk continues.
#[derive(Error, Debug)]
pub enum ReadDecodeError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A text file that was rewritten into the output tree.
#[derive(Debug, Clone)]
pub struct CleanedFile {
    /// Relative to the source root.
    pub path: PathBuf,
    pub encoding: TextEncoding,
    /// `(rule name, matches)` for each rule that changed the file.
    pub hits: Vec<(String, usize)>,
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: ReadDecodeError,
}

/// Everything the clean stage did, for the build summary.
#[derive(Debug, Default)]
pub struct CleanReport {
    pub cleaned: Vec<CleanedFile>,
    /// Non-text files copied byte-for-byte.
    pub copied: Vec<PathBuf>,
    /// Files left out because their name is excluded.
    pub excluded: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    /// Vendor directory names copied verbatim.
    pub vendor: Vec<String>,
    /// Destination of the site config file, when one was copied.
    pub site_config: Option<PathBuf>,
}

impl CleanReport {
    /// Total matches per rule across all cleaned files, by rule name.
    pub fn rule_totals(&self) -> BTreeMap<&str, usize> {
        let mut totals = BTreeMap::new();
        for file in &self.cleaned {
            for (rule, n) in &file.hits {
                *totals.entry(rule.as_str()).or_insert(0) += n;
            }
        }
        totals
    }

    /// Cleaned files whose text actually changed.
    pub fn rewritten(&self) -> impl Iterator<Item = &CleanedFile> {
        self.cleaned.iter().filter(|f| !f.hits.is_empty())
    }
}

/// Mirrors the source tree into the output directory, stripping excluded
/// modules along the way.
#[derive(Debug)]
pub struct SourceTreeCleaner<'a> {
    config: &'a BuildConfig,
    rules: RuleSet,
    exclusions: ExclusionSet,
    encodings: Vec<TextEncoding>,
}

impl<'a> SourceTreeCleaner<'a> {
    pub fn new(config: &'a BuildConfig) -> Result<Self, SourceTreeError> {
        let exclusions = config.exclusions();
        Ok(Self {
            rules: RuleSet::cleaning(&exclusions)?,
            encodings: config.text_encodings()?,
            exclusions,
            config,
        })
    }

    /// Clean one file's text with the rule set.
    pub fn clean_text(&self, file_name: &str, text: &str) -> Rewritten {
        self.rules.apply(file_name, text)
    }

    /// Run the whole clean stage. See the [module docs](self) for the order
    /// of work.
    pub fn run(&self) -> Result<CleanReport, SourceTreeError> {
        let source = self.config.source_root();
        if !source.is_dir() {
            return Err(SourceTreeError::MissingSource(source));
        }

        let output = self.config.output_root();
        if let Some(reason) = self.config.output_conflict() {
            return Err(SourceTreeError::UnsafeOutput { output, reason });
        }
        if output.exists() {
            fs::remove_dir_all(&output).map_err(SourceTreeError::io(&output))?;
        }
        let php_out = self.config.php_output();
        fs::create_dir_all(&php_out).map_err(SourceTreeError::io(&php_out))?;

        let mut report = CleanReport::default();

        for name in &self.config.vendor_dirs {
            let src = source.join(name);
            if !src.is_dir() {
                return Err(SourceTreeError::MissingVendor(src));
            }
            let dst = php_out.join(name);
            copy_dir_recursive(&src, &dst, &self.exclusions)
                .map_err(SourceTreeError::io(&src))?;
            info!(vendor = %name, "copied vendor directory");
            report.vendor.push(name.clone());
        }

        let walker = WalkDir::new(&source)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_vendor_dir(&source, e.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .and_then(|p| p.strip_prefix(&source).ok())
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                    report.skipped.push(SkippedFile {
                        path,
                        error: err.into(),
                    });
                    continue;
                }
            };

            let rel = entry
                .path()
                .strip_prefix(&source)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            let dest = php_out.join(&rel);

            if entry.file_type().is_dir() {
                if let Err(err) = fs::create_dir_all(&dest) {
                    warn!(path = %rel.display(), error = %err, "skipping directory");
                    report.skipped.push(SkippedFile {
                        path: rel,
                        error: ReadDecodeError::Write(err),
                    });
                }
                continue;
            }

            if self.exclusions.contains(&rel) {
                debug!(path = %rel.display(), "excluded");
                report.excluded.push(rel);
                continue;
            }

            if !self.config.is_text_file(&rel) {
                match copy_file(entry.path(), &dest) {
                    Ok(()) => report.copied.push(rel),
                    Err(err) => {
                        warn!(path = %rel.display(), error = %err, "skipping file");
                        report.skipped.push(SkippedFile {
                            path: rel,
                            error: ReadDecodeError::Write(err),
                        });
                    }
                }
                continue;
            }

            match self.clean_file(entry.path(), &rel, &dest) {
                Ok(cleaned) => report.cleaned.push(cleaned),
                Err(error) => {
                    warn!(path = %rel.display(), %error, "skipping file");
                    report.skipped.push(SkippedFile { path: rel, error });
                }
            }
        }

        let site_config = self.config.site_config_path();
        if site_config.is_file() {
            let name = site_config
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.php"));
            let dst = output.join(name);
            fs::copy(&site_config, &dst).map_err(SourceTreeError::io(&site_config))?;
            report.site_config = Some(dst);
        }

        info!(
            cleaned = report.cleaned.len(),
            copied = report.copied.len(),
            excluded = report.excluded.len(),
            skipped = report.skipped.len(),
            "source tree cleaned"
        );
        Ok(report)
    }

    /// Read, decode, clean, and write one text file.
    fn clean_file(
        &self,
        src: &Path,
        rel: &Path,
        dest: &Path,
    ) -> Result<CleanedFile, ReadDecodeError> {
        let file = self.read_source(src, rel)?;
        let cleaned = self.clean_text(&file.file_name(), &file.text);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(ReadDecodeError::Write)?;
        }
        fs::write(dest, cleaned.text.as_bytes()).map_err(ReadDecodeError::Write)?;

        Ok(CleanedFile {
            path: file.path,
            encoding: file.encoding,
            hits: cleaned.hits,
        })
    }

    fn read_source(&self, src: &Path, rel: &Path) -> Result<SourceFile, ReadDecodeError> {
        let bytes = fs::read(src).map_err(ReadDecodeError::Read)?;
        let (text, encoding) = encoding::decode(&bytes, &self.encodings)?;
        if encoding != self.encodings[0] {
            debug!(path = %rel.display(), %encoding, "decoded with fallback encoding");
        }
        Ok(SourceFile {
            path: rel.to_path_buf(),
            bytes,
            text,
            encoding,
        })
    }

    fn is_vendor_dir(&self, source: &Path, path: &Path) -> bool {
        path.parent() == Some(source)
            && path.is_dir()
            && path
                .file_name()
                .is_some_and(|n| self.config.vendor_dirs.iter().any(|v| n == v.as_str()))
    }
}

fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Copy a directory tree as-is, leaving out excluded file names.
fn copy_dir_recursive(src: &Path, dst: &Path, exclusions: &ExclusionSet) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, exclusions)?;
        } else if !exclusions.contains(&src_path) {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
