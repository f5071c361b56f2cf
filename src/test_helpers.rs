//! Shared test utilities.
//!
//! Provides an isolated copy of the fixture site, a tree listing helper,
//! the "no excluded statement left" assertion used by the cleaning tests,
//! and a [`StubTransport`] that serves canned HTTP responses.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (_tmp, config) = fixture_config();
//! SourceTreeCleaner::new(&config).unwrap().run().unwrap();
//! for path in all_files(&config.php_output()) {
//!     let text = std::fs::read_to_string(&path).unwrap();
//!     assert_no_excluded_statements(&text, &path);
//! }
//!
//! let stub = StubTransport::new().with("https://dev.test/src/?lang=en", 200, "<p>en</p>");
//! ```

use regex::RegexBuilder;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::fetch::{FetchError, FetchResponse, Transport};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return a default config
/// rooted there.
///
/// Tests get an isolated copy they can mutate (and build into) without
/// affecting other tests or the source fixtures.
pub fn fixture_config() -> (TempDir, BuildConfig) {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    let config = BuildConfig {
        project_root: tmp.path().to_path_buf(),
        ..BuildConfig::default()
    };
    (tmp, config)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Every regular file under `root`, sorted.
pub fn all_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

// =========================================================================
// Cleaning assertions
// =========================================================================

/// Assert `text` has no include/require, `use`, or `extends` statement naming
/// one of the default excluded modules. Case-insensitive.
pub fn assert_no_excluded_statements(text: &str, path: &Path) {
    let modules = r"(?:Language|Logger|Minifier)Class";
    let patterns = [
        format!(r#"\b(?:require|include)(?:_once)?\b[^;]*{modules}\.php"#),
        format!(r"^\s*use\s+[^;]*\b\d*{modules}\s*;"),
        format!(r"\bextends\s+\\?(?:\w+\\)*\d*{modules}\b"),
    ];
    for pattern in &patterns {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .unwrap();
        if let Some(m) = re.find(text) {
            panic!(
                "{} still references an excluded module: {:?}",
                path.display(),
                m.as_str()
            );
        }
    }
}

// =========================================================================
// Stub transport
// =========================================================================

/// In-memory [`Transport`]. Unknown URLs answer 404. Every request is
/// recorded with the timeout it was given.
#[derive(Default)]
pub struct StubTransport {
    responses: HashMap<String, FetchResponse>,
    timeouts: HashSet<String>,
    requests: RefCell<Vec<(String, Duration)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for `url`.
    pub fn with(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    /// Make requests to `url` fail with a timeout.
    pub fn timing_out(mut self, url: &str) -> Self {
        self.timeouts.insert(url.to_string());
        self
    }

    /// Requests made so far, in order.
    pub fn requests(&self) -> Vec<(String, Duration)> {
        self.requests.borrow().clone()
    }
}

impl Transport for StubTransport {
    fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let key = url.to_string();
        self.requests.borrow_mut().push((key.clone(), timeout));
        if self.timeouts.contains(&key) {
            return Err(FetchError::Timeout {
                url: key,
                after: timeout,
            });
        }
        Ok(self.responses.get(&key).cloned().unwrap_or(FetchResponse {
            status: 404,
            body: String::new(),
        }))
    }
}
