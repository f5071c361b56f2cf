//! CLI output formatting for the build.
//!
//! # Output Format
//!
//! ## Clean
//!
//! ```text
//! Excluded
//!     LanguageClass.php
//!     LoggerClass.php
//!     MinifierClass.php
//!
//! Rules
//!     api-log-stub: 1
//!     include-excluded: 4
//!
//! Source tree
//!     6 cleaned (6 rewritten), 1 copied, 3 excluded, 0 skipped
//!     Vendor: PHPMailer/ (verbatim)
//!     Site config: dist/config.php
//! ```
//!
//! ## Assets
//!
//! ```text
//! Assets
//!     4 copied, 3 minified, 0 skipped
//!     src/assets/css/site.css → assets/css/site.min.css (142 → 71 bytes)
//!     Missing: src/assets/fonts
//! ```
//!
//! ## Pages
//!
//! ```text
//! Pages
//!     en → index_en.php (5210 bytes, 2 assets inlined)
//!     hu ✗ fetch: https://dev.test/src/?lang=hu returned HTTP 404
//! ```
//!
//! ## Output tree
//!
//! ```text
//! dist/
//! ├── config.php
//! ├── index_en.php
//! └── php/
//!     ├── APIClass.php
//!     └── PHPMailer/ (2 entries)
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure. The only filesystem access is [`collect_tree`], which
//! the print wrappers call to snapshot the output directory.

use std::path::Path;
use walkdir::WalkDir;

use crate::assets::AssetReport;
use crate::clean::CleanReport;
use crate::pipeline::{BuildReport, LanguageOutcome};

/// Directory levels shown below the output root before a directory is
/// summarised as an entry count.
pub const TREE_DEPTH: usize = 2;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Stage 1: Clean output
// ============================================================================

/// Format the source-tree stage: what was excluded, which rules fired, and
/// file counts.
pub fn format_clean_output(report: &CleanReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Excluded".to_string());
    if report.excluded.is_empty() {
        lines.push(format!("{}(none found)", indent(1)));
    }
    for path in &report.excluded {
        lines.push(format!("{}{}", indent(1), path.display()));
    }

    let totals = report.rule_totals();
    if !totals.is_empty() {
        lines.push(String::new());
        lines.push("Rules".to_string());
        for (rule, n) in totals {
            lines.push(format!("{}{}: {}", indent(1), rule, n));
        }
    }

    lines.push(String::new());
    lines.push("Source tree".to_string());
    lines.push(format!(
        "{}{} cleaned ({} rewritten), {} copied, {} excluded, {} skipped",
        indent(1),
        report.cleaned.len(),
        report.rewritten().count(),
        report.copied.len(),
        report.excluded.len(),
        report.skipped.len(),
    ));
    for name in &report.vendor {
        lines.push(format!("{}Vendor: {}/ (verbatim)", indent(1), name));
    }
    if let Some(ref dst) = report.site_config {
        lines.push(format!("{}Site config: {}", indent(1), dst.display()));
    }
    for skipped in &report.skipped {
        lines.push(format!(
            "{}Skipped: {} ({})",
            indent(1),
            skipped.path.display(),
            skipped.error
        ));
    }

    lines
}

/// Print clean stage output to stdout.
pub fn print_clean_output(report: &CleanReport) {
    for line in format_clean_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Assets output
// ============================================================================

/// Format the asset stage: counts, each minified file, and anything missing
/// or skipped.
pub fn format_assets_output(report: &AssetReport) -> Vec<String> {
    let mut lines = vec!["Assets".to_string()];
    if report.is_empty() {
        lines.push(format!("{}(nothing to do)", indent(1)));
        return lines;
    }

    lines.push(format!(
        "{}{} copied, {} minified, {} skipped",
        indent(1),
        report.copied.len(),
        report.minified.len(),
        report.skipped.len(),
    ));
    for asset in &report.minified {
        lines.push(format!(
            "{}{} → {} ({} → {} bytes)",
            indent(1),
            asset.source.display(),
            asset.output.display(),
            asset.bytes_before,
            asset.bytes_after,
        ));
    }
    for path in &report.missing {
        lines.push(format!("{}Missing: {}", indent(1), path.display()));
    }
    for skipped in &report.skipped {
        lines.push(format!(
            "{}Skipped: {} ({})",
            indent(1),
            skipped.path.display(),
            skipped.error
        ));
    }
    lines
}

// ============================================================================
// Stage 2: Pages output
// ============================================================================

/// One line per configured language, in build order.
pub fn format_pages_output(languages: &[LanguageOutcome]) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    for outcome in languages {
        match outcome {
            LanguageOutcome::Built {
                lang,
                path,
                bytes,
                assets_inlined,
                assets_dropped,
            } => {
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut detail = format!(
                    "{} bytes, {} inlined",
                    bytes,
                    plural(*assets_inlined, "asset", "assets")
                );
                if *assets_dropped > 0 {
                    detail.push_str(&format!(", {assets_dropped} dropped"));
                }
                lines.push(format!("{}{} → {} ({})", indent(1), lang, file, detail));
            }
            LanguageOutcome::Failed { lang, stage, error } => {
                lines.push(format!("{}{} ✗ {}: {}", indent(1), lang, stage, error));
            }
        }
    }
    lines
}

// ============================================================================
// Output tree
// ============================================================================

/// A file or directory in the output snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub is_dir: bool,
    /// Entries below this one. Empty for files and for directories past the
    /// depth limit (see `hidden`).
    pub children: Vec<TreeEntry>,
    /// Entries not listed because the depth limit was reached.
    pub hidden: usize,
}

/// Snapshot `root` down to `max_depth` levels, sorted by name.
pub fn collect_tree(root: &Path, max_depth: usize) -> Vec<TreeEntry> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| {
            let is_dir = entry.file_type().is_dir();
            let (children, hidden) = match (is_dir, max_depth) {
                (false, _) => (Vec::new(), 0),
                (true, 0) => (Vec::new(), count_entries(entry.path())),
                (true, _) => (collect_tree(entry.path(), max_depth - 1), 0),
            };
            TreeEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
                children,
                hidden,
            }
        })
        .collect()
}

fn count_entries(dir: &Path) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .count()
}

/// Render a snapshot as an ASCII tree under `root_label`.
pub fn format_tree(root_label: &str, entries: &[TreeEntry]) -> Vec<String> {
    let mut lines = vec![format!("{}/", root_label.trim_end_matches('/'))];
    format_tree_recursive(entries, "", &mut lines);
    lines
}

fn format_tree_recursive(entries: &[TreeEntry], prefix: &str, lines: &mut Vec<String>) {
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let connector = if last { "└── " } else { "├── " };
        let mut label = entry.name.clone();
        if entry.is_dir {
            label.push('/');
        }
        if entry.hidden > 0 {
            label.push_str(&format!(" ({})", plural(entry.hidden, "entry", "entries")));
        }
        lines.push(format!("{prefix}{connector}{label}"));

        if !entry.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            format_tree_recursive(&entry.children, &child_prefix, lines);
        }
    }
}

// ============================================================================
// Full build
// ============================================================================

/// Format a full build: clean stage, assets, pages, and the output tree.
pub fn format_build_output(report: &BuildReport, tree: &[TreeEntry]) -> Vec<String> {
    let mut lines = format_clean_output(&report.clean);
    lines.push(String::new());
    lines.extend(format_assets_output(&report.assets));
    lines.push(String::new());
    lines.extend(format_pages_output(&report.languages));
    lines.push(String::new());

    let built = report.built().count();
    let total = report.languages.len();
    lines.push(format!(
        "Built {} of {}",
        built,
        plural(total, "language", "languages")
    ));
    lines.push(String::new());

    lines.extend(format_tree(&report.output_root.to_string_lossy(), tree));
    lines
}

/// Print full build output to stdout.
pub fn print_build_output(report: &BuildReport) {
    let tree = collect_tree(&report.output_root, TREE_DEPTH);
    for line in format_build_output(report, &tree) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
