//! Build configuration.
//!
//! Handles loading, validating, and merging the `distill.toml` file. Every
//! value has a stock default, so the file is optional and may be sparse:
//! user values are merged over the defaults table before deserializing.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! project_root = "."             # Other paths are relative to this
//! source_dir = "src/php"         # Development PHP tree
//! output_dir = "dist"            # Wiped and rebuilt on every run
//! php_dir = "php"                # Cleaned tree lands in <output_dir>/<php_dir>
//! site_config = "config.php"     # Copied to <output_dir>/ when present
//! vendor_dirs = ["PHPMailer"]    # Copied verbatim, never rewritten
//! excluded = ["LanguageClass.php", "LoggerClass.php", "MinifierClass.php"]
//! text_extensions = ["php"]      # Everything else is copied byte-for-byte
//! encodings = ["utf-8", "latin-1"]
//!
//! [site]
//! base_url = "https://beyondsolutions.ddev.site/src/"
//! asset_root = "/assets-root/"
//! bootstrap_header = true
//! accept_invalid_certs = true
//! page_timeout_secs = 60
//! asset_timeout_secs = 10
//!
//! [[site.languages]]
//! code = "en"
//! label = "🇺🇸 English"
//!
//! [[site.languages]]
//! code = "hu"
//! label = "🇭🇺 Magyar"
//!
//! [assets]
//! enabled = true
//! source_dir = "src/assets"      # images/ and fonts/ copied, css/ and js/ minified
//! output_dir = "assets"          # Under <output_dir>
//! copy_dirs = ["images", "fonts"]
//! templates_dir = "src/html"     # *.html written as <templates_output>/*.min.html
//! templates_output = "html"
//! minify_templates = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::encoding::TextEncoding;
use crate::types::ExclusionSet;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "distill.toml";

/// Build configuration loaded from `distill.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Base for every relative path below.
    pub project_root: PathBuf,
    /// Development PHP tree, relative to `project_root`.
    pub source_dir: PathBuf,
    /// Output directory, relative to `project_root`. Deleted on every run.
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` that mirrors `source_dir`.
    pub php_dir: PathBuf,
    /// Site config file copied to the top of `output_dir`, relative to
    /// `project_root`. Skipped when absent.
    pub site_config: PathBuf,
    /// Third-party directories under `source_dir` copied without cleaning.
    pub vendor_dirs: Vec<String>,
    /// File names removed from the build, along with every reference to them.
    pub excluded: Vec<String>,
    /// Extensions (without dot) decoded and cleaned; anything else is copied.
    pub text_extensions: Vec<String>,
    /// Decode attempts, in order.
    pub encodings: Vec<String>,
    /// Page fetching and post-processing.
    pub site: SiteConfig,
    /// Static assets and HTML templates.
    pub assets: AssetsConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            source_dir: PathBuf::from("src/php"),
            output_dir: PathBuf::from("dist"),
            php_dir: PathBuf::from("php"),
            site_config: PathBuf::from("config.php"),
            vendor_dirs: vec!["PHPMailer".to_string()],
            excluded: vec![
                "LanguageClass.php".to_string(),
                "LoggerClass.php".to_string(),
                "MinifierClass.php".to_string(),
            ],
            text_extensions: vec!["php".to_string()],
            encodings: vec!["utf-8".to_string(), "latin-1".to_string()],
            site: SiteConfig::default(),
            assets: AssetsConfig::default(),
        }
    }
}

/// Settings for the per-language page stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Development page URL; each language is requested as `?lang=<code>`.
    pub base_url: String,
    /// Development asset prefix. Linked assets resolve against it on the
    /// page's origin, and it is stripped from links in the output.
    pub asset_root: String,
    /// Prefix every page with a PHP header that starts the session and
    /// loads the cleaned autoloader.
    pub bootstrap_header: bool,
    /// Skip TLS certificate validation (the development host is local).
    pub accept_invalid_certs: bool,
    /// Timeout for each page request.
    pub page_timeout_secs: u64,
    /// Timeout for each linked asset request.
    pub asset_timeout_secs: u64,
    /// Languages to build, in order. Also the options of the language selector.
    pub languages: Vec<LanguageConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://beyondsolutions.ddev.site/src/".to_string(),
            asset_root: "/assets-root/".to_string(),
            bootstrap_header: true,
            accept_invalid_certs: true,
            page_timeout_secs: 60,
            asset_timeout_secs: 10,
            languages: vec![
                LanguageConfig {
                    code: "en".to_string(),
                    label: "\u{1F1FA}\u{1F1F8} English".to_string(),
                },
                LanguageConfig {
                    code: "hu".to_string(),
                    label: "\u{1F1ED}\u{1F1FA} Magyar".to_string(),
                },
            ],
        }
    }
}

impl SiteConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_secs(self.asset_timeout_secs)
    }

    /// Parsed `base_url`. Validated at load time.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Validation(format!("site.base_url: {e}")))
    }
}

/// Settings for the static asset stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    pub enabled: bool,
    /// Asset tree, relative to `project_root`.
    pub source_dir: PathBuf,
    /// Where assets land, relative to `output_dir`.
    pub output_dir: PathBuf,
    /// Subdirectories of `source_dir` copied byte-for-byte.
    pub copy_dirs: Vec<String>,
    /// HTML templates, relative to `project_root`.
    pub templates_dir: PathBuf,
    /// Where templates land, relative to `output_dir`.
    pub templates_output: PathBuf,
    /// Minify templates on the way out. Off writes them unchanged.
    pub minify_templates: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_dir: PathBuf::from("src/assets"),
            output_dir: PathBuf::from("assets"),
            copy_dirs: vec!["images".to_string(), "fonts".to_string()],
            templates_dir: PathBuf::from("src/html"),
            templates_output: PathBuf::from("html"),
            minify_templates: true,
        }
    }
}

/// One entry of the language selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    /// Two-letter lowercase code, used in `?lang=` and the output file name.
    pub code: String,
    /// Option text shown in the selector.
    pub label: String,
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let languages = &self.site.languages;
        if languages.is_empty() {
            return Err(ConfigError::Validation(
                "site.languages must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for lang in languages {
            if lang.code.len() != 2 || !lang.code.bytes().all(|b| b.is_ascii_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "language code '{}' must be two lowercase letters",
                    lang.code
                )));
            }
            if !seen.insert(lang.code.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "language code '{}' is listed twice",
                    lang.code
                )));
            }
        }
        let base = self.site.base_url()?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Validation(
                "site.base_url must be an absolute http(s) URL".into(),
            ));
        }
        let root = &self.site.asset_root;
        if root.len() < 2 || !root.starts_with('/') || !root.ends_with('/') {
            return Err(ConfigError::Validation(
                "site.asset_root must start and end with '/' and name a directory".into(),
            ));
        }
        if self.site.page_timeout_secs == 0 || self.site.asset_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "site timeouts must be non-zero".into(),
            ));
        }
        self.text_encodings()?;
        if let Some(reason) = self.output_conflict() {
            return Err(ConfigError::Validation(reason));
        }
        Ok(())
    }

    /// Why wiping `output_root()` would destroy build inputs, if it would.
    ///
    /// The output must not be the project root, contain an input tree, or
    /// sit inside one. Paths are compared after resolving `.` and `..`.
    pub fn output_conflict(&self) -> Option<String> {
        let dir = &self.output_dir;
        if dir.as_os_str().is_empty() || dir == Path::new(".") {
            return Some(format!(
                "output_dir '{}' would wipe the project root",
                dir.display()
            ));
        }

        let output = normalize(&self.output_root());
        if normalize(&self.project_root).starts_with(&output) {
            return Some(format!(
                "output_dir '{}' contains the project root",
                dir.display()
            ));
        }

        let mut inputs = vec![("source_dir", self.source_root())];
        if self.assets.enabled {
            inputs.push(("assets.source_dir", self.assets_source()));
            inputs.push(("assets.templates_dir", self.templates_source()));
        }
        for (key, input) in inputs {
            let input = normalize(&input);
            if input.starts_with(&output) {
                return Some(format!("output_dir '{}' contains {key}", dir.display()));
            }
            if output.starts_with(&input) {
                return Some(format!("output_dir '{}' is inside {key}", dir.display()));
            }
        }
        None
    }

    /// Absolute (or `project_root`-relative) path of the source tree.
    pub fn source_root(&self) -> PathBuf {
        self.project_root.join(&self.source_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.project_root.join(&self.output_dir)
    }

    /// Where the cleaned mirror of the source tree is written.
    pub fn php_output(&self) -> PathBuf {
        self.output_root().join(&self.php_dir)
    }

    pub fn site_config_path(&self) -> PathBuf {
        self.project_root.join(&self.site_config)
    }

    pub fn assets_source(&self) -> PathBuf {
        self.project_root.join(&self.assets.source_dir)
    }

    pub fn assets_output(&self) -> PathBuf {
        self.output_root().join(&self.assets.output_dir)
    }

    pub fn templates_source(&self) -> PathBuf {
        self.project_root.join(&self.assets.templates_dir)
    }

    pub fn templates_output(&self) -> PathBuf {
        self.output_root().join(&self.assets.templates_output)
    }

    pub fn exclusions(&self) -> ExclusionSet {
        ExclusionSet::new(self.excluded.iter().cloned())
    }

    /// Configured decode attempts, parsed.
    pub fn text_encodings(&self) -> Result<Vec<TextEncoding>, ConfigError> {
        if self.encodings.is_empty() {
            return Err(ConfigError::Validation(
                "encodings must not be empty".into(),
            ));
        }
        self.encodings
            .iter()
            .map(|e| {
                e.parse()
                    .map_err(|err| ConfigError::Validation(format!("encodings: {err}")))
            })
            .collect()
    }

    /// Whether `path` is decoded and cleaned rather than copied.
    pub fn is_text_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                self.text_extensions
                    .iter()
                    .any(|t| ext.eq_ignore_ascii_case(t.as_str()))
            })
            .unwrap_or(false)
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (arrays included) replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the build config from `path`.
///
/// A missing file yields the validated stock defaults.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `distill.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# distill configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Every relative path below is resolved against this directory.
project_root = "."

# Development PHP tree to clean.
source_dir = "src/php"

# Output directory. Deleted and recreated on every run.
output_dir = "dist"

# The cleaned PHP tree is written to <output_dir>/<php_dir>.
php_dir = "php"

# Copied to <output_dir>/ when it exists.
site_config = "config.php"

# Third-party directories inside source_dir, copied verbatim and never cleaned.
vendor_dirs = ["PHPMailer"]

# Files left out of the build. Every include, use, and extends referencing
# them is removed from the remaining files.
excluded = ["LanguageClass.php", "LoggerClass.php", "MinifierClass.php"]

# Files with these extensions are decoded and cleaned; all others are copied.
text_extensions = ["php"]

# Decode attempts, in order. Supported: utf-8, latin-1.
encodings = ["utf-8", "latin-1"]

# ---------------------------------------------------------------------------
# Per-language pages
# ---------------------------------------------------------------------------
[site]
# Development page. Each language is fetched as <base_url>?lang=<code>.
base_url = "https://beyondsolutions.ddev.site/src/"

# Linked assets resolve against this path on the page's origin, and it is
# stripped from every link in the output.
asset_root = "/assets-root/"

# Prefix each page with a PHP header that starts the session and loads
# php/autoload.php.
bootstrap_header = true

# Skip TLS certificate checks for the development host.
accept_invalid_certs = true

# Request timeouts, in seconds.
page_timeout_secs = 60
asset_timeout_secs = 10

# One output file (index_<code>.php) per language, built in this order.
# The labels become the options of the language selector.
[[site.languages]]
code = "en"
label = "🇺🇸 English"

[[site.languages]]
code = "hu"
label = "🇭🇺 Magyar"

# ---------------------------------------------------------------------------
# Static assets
# ---------------------------------------------------------------------------
[assets]
# Run the asset stage after the source tree is cleaned.
enabled = true

# Asset tree. copy_dirs are copied as-is; css/*.css and js/*.js are
# minified to *.min.css and *.min.js. Missing directories are skipped.
source_dir = "src/assets"

# Assets are written to <output_dir>/<assets.output_dir>.
output_dir = "assets"

copy_dirs = ["images", "fonts"]

# Static HTML templates, written to <output_dir>/<templates_output> as
# *.min.html.
templates_dir = "src/html"
templates_output = "html"

# Set to false to write templates without minifying them.
minify_templates = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        BuildConfig::default().validate().unwrap();
    }

    #[test]
    fn default_paths() {
        let config = BuildConfig::default();
        assert_eq!(config.source_root(), Path::new("./src/php"));
        assert_eq!(config.php_output(), Path::new("./dist/php"));
        assert_eq!(config.site_config_path(), Path::new("./config.php"));
    }

    #[test]
    fn default_languages() {
        let codes: Vec<String> = BuildConfig::default()
            .site
            .languages
            .into_iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(codes, vec!["en", "hu"]);
    }

    #[test]
    fn default_exclusions() {
        let exclusions = BuildConfig::default().exclusions();
        assert!(exclusions.contains(Path::new("LanguageClass.php")));
        assert!(exclusions.contains(Path::new("LoggerClass.php")));
        assert!(exclusions.contains(Path::new("MinifierClass.php")));
        assert!(!exclusions.contains(Path::new("APIClass.php")));
    }

    #[test]
    fn text_file_detection_is_case_insensitive() {
        let config = BuildConfig::default();
        assert!(config.is_text_file(Path::new("a/b/index.php")));
        assert!(config.is_text_file(Path::new("LEGACY.PHP")));
        assert!(!config.is_text_file(Path::new("logo.png")));
        assert!(!config.is_text_file(Path::new("Makefile")));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.output_dir, Path::new("dist"));
        assert_eq!(config.site.page_timeout_secs, 60);
    }

    #[test]
    fn load_config_partial_override() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
output_dir = "build"

[site]
base_url = "http://localhost:8080/src/"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.output_dir, Path::new("build"));
        assert_eq!(config.site.base_url, "http://localhost:8080/src/");
        // Untouched keys keep their defaults
        assert_eq!(config.source_dir, Path::new("src/php"));
        assert_eq!(config.site.asset_root, "/assets-root/");
        assert_eq!(config.site.languages.len(), 2);
    }

    #[test]
    fn arrays_replace_rather_than_merge() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "excluded = [\"DebugClass.php\"]\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.excluded, vec!["DebugClass.php"]);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "output_dir = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[site]\nbase_ulr = \"http://x/\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str("[site]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[site]\ny = 5").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["site"]["x"].as_integer(), Some(1));
        assert_eq!(merged["site"]["y"].as_integer(), Some(5));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(value)).unwrap();
        let defaults = BuildConfig::default();
        assert_eq!(config.excluded, defaults.excluded);
        assert_eq!(config.site.languages, defaults.site.languages);
        assert_eq!(config.site.base_url, defaults.site.base_url);
        assert_eq!(config.assets.copy_dirs, defaults.assets.copy_dirs);
        assert_eq!(config.assets.templates_dir, defaults.assets.templates_dir);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn with_site(edit: impl FnOnce(&mut SiteConfig)) -> BuildConfig {
        let mut config = BuildConfig::default();
        edit(&mut config.site);
        config
    }

    #[test]
    fn validate_no_languages() {
        let config = with_site(|s| s.languages.clear());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_bad_language_code() {
        for code in ["EN", "eng", "e", "e1"] {
            let config = with_site(|s| s.languages[0].code = code.to_string());
            assert!(config.validate().is_err(), "{code} should be rejected");
        }
    }

    #[test]
    fn validate_duplicate_language() {
        let config = with_site(|s| s.languages[1].code = "en".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn validate_relative_base_url() {
        let config = with_site(|s| s.base_url = "/src/".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_asset_root_slashes() {
        for root in ["assets-root/", "/assets-root", "/"] {
            let config = with_site(|s| s.asset_root = root.to_string());
            assert!(config.validate().is_err(), "{root} should be rejected");
        }
    }

    #[test]
    fn validate_zero_timeout() {
        let config = with_site(|s| s.page_timeout_secs = 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_unknown_encoding() {
        let mut config = BuildConfig::default();
        config.encodings = vec!["utf-8".into(), "ebcdic".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ebcdic"));
    }

    fn with_output(dir: &str) -> (TempDir, BuildConfig) {
        let tmp = TempDir::new().unwrap();
        let config = BuildConfig {
            project_root: tmp.path().to_path_buf(),
            output_dir: PathBuf::from(dir),
            ..BuildConfig::default()
        };
        (tmp, config)
    }

    #[test]
    fn validate_output_dir_naming_project_root() {
        for dir in ["", ".", "./", "src/.."] {
            let (_tmp, config) = with_output(dir);
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::Validation(_)),
                "'{dir}' should be rejected"
            );
        }
    }

    #[test]
    fn validate_output_dir_above_project_root() {
        let (_tmp, config) = with_output("..");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("contains the project root"));
    }

    #[test]
    fn validate_output_dir_containing_source() {
        for dir in ["src", "src/php", "./src/../src"] {
            let (_tmp, config) = with_output(dir);
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("contains source_dir"),
                "'{dir}': {err}"
            );
        }
    }

    #[test]
    fn validate_output_dir_inside_source() {
        let (_tmp, config) = with_output("src/php/build");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("is inside source_dir"));
    }

    #[test]
    fn validate_output_dir_inside_assets() {
        let (_tmp, config) = with_output("src/assets/dist");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("is inside assets.source_dir"));
    }

    #[test]
    fn validate_sibling_output_dir() {
        for dir in ["dist", "build/site", "../elsewhere"] {
            let (_tmp, config) = with_output(dir);
            assert!(config.output_conflict().is_none(), "'{dir}' should be accepted");
        }
    }

    #[test]
    fn default_asset_paths() {
        let config = BuildConfig::default();
        assert_eq!(config.assets_source(), Path::new("./src/assets"));
        assert_eq!(config.assets_output(), Path::new("./dist/assets"));
        assert_eq!(config.templates_source(), Path::new("./src/html"));
        assert_eq!(config.templates_output(), Path::new("./dist/html"));
    }

    #[test]
    fn text_encodings_in_order() {
        let encodings = BuildConfig::default().text_encodings().unwrap();
        assert_eq!(encodings, vec![TextEncoding::Utf8, TextEncoding::Latin1]);
    }
}
