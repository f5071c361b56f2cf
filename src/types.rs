//! Shared types used across the build stages.
//!
//! The clean stage works on [`SourceFile`]s filtered through an
//! [`ExclusionSet`]; the page stages work on one [`PageVariant`] per
//! configured language.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::encoding::TextEncoding;

/// File names that are never copied to the output tree.
///
/// Matching is by bare file name, so `LanguageClass.php` is excluded wherever
/// it sits in the source tree. The stem of each name is the "module" whose
/// references the cleaning rules strip from every other file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a file at `path` is excluded.
    pub fn contains(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| self.names.contains(n.to_string_lossy().as_ref()))
            .unwrap_or(false)
    }

    /// Excluded file names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Module names: each excluded file name with its extension stripped.
    ///
    /// ```text
    /// LanguageClass.php → LanguageClass
    /// ```
    pub fn modules(&self) -> Vec<String> {
        self.names
            .iter()
            .map(|n| {
                Path::new(n)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| n.clone())
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A text file read from the source tree, held in memory for one pass.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the source root.
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub text: String,
    pub encoding: TextEncoding,
}

impl SourceFile {
    /// Bare file name, used to select file-specific rules.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One localized rendering of the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVariant {
    /// Two-letter language code (`en`, `hu`).
    pub lang: String,
    /// Page URL with the `lang` query parameter applied.
    pub url: Url,
    /// Output file name, see [`page_file_name`].
    pub file_name: String,
}

impl PageVariant {
    /// Build the variant for `lang` against the development page at `base`.
    ///
    /// Any `lang` already present in the base query is replaced so the
    /// request carries exactly one.
    pub fn new(base: &Url, lang: &str) -> Self {
        let mut url = base.clone();
        let kept: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(k, _)| k != "lang")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("lang", lang);
        }
        Self {
            lang: lang.to_string(),
            url,
            file_name: page_file_name(lang),
        }
    }
}

/// Output file name for a language: `index_<code>.php`.
pub fn page_file_name(lang: &str) -> String {
    format!("index_{lang}.php")
}

/// Kind of linked asset the inliner handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Style,
    Script,
}

impl AssetKind {
    /// Inlining order: stylesheets first, then scripts.
    pub const ALL: [AssetKind; 2] = [AssetKind::Style, AssetKind::Script];

    /// Element name of the inline block (`style` / `script`).
    pub fn tag(self) -> &'static str {
        match self {
            AssetKind::Style => "style",
            AssetKind::Script => "script",
        }
    }
}

/// A linked stylesheet or script found in a fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub kind: AssetKind,
    /// The attribute value exactly as it appears in the page.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_matches_file_name_anywhere() {
        let set = ExclusionSet::new(["LoggerClass.php"]);
        assert!(set.contains(Path::new("LoggerClass.php")));
        assert!(set.contains(Path::new("nested/deeper/LoggerClass.php")));
        assert!(!set.contains(Path::new("2LoggerClass.php")));
        assert!(!set.contains(Path::new("LoggerClass.php/other.php")));
    }

    #[test]
    fn exclusion_modules_strip_extension() {
        let set = ExclusionSet::new(["MinifierClass.php", "LanguageClass.php"]);
        assert_eq!(set.modules(), vec!["LanguageClass", "MinifierClass"]);
    }

    #[test]
    fn page_file_name_uses_language_suffix() {
        assert_eq!(page_file_name("en"), "index_en.php");
        assert_eq!(page_file_name("hu"), "index_hu.php");
    }

    #[test]
    fn page_variant_appends_lang() {
        let base = Url::parse("https://site.test/src/").unwrap();
        let variant = PageVariant::new(&base, "hu");
        assert_eq!(variant.url.as_str(), "https://site.test/src/?lang=hu");
        assert_eq!(variant.file_name, "index_hu.php");
    }

    #[test]
    fn page_variant_replaces_existing_lang() {
        let base = Url::parse("https://site.test/src/?lang=de&debug=1").unwrap();
        let variant = PageVariant::new(&base, "en");
        assert_eq!(variant.url.as_str(), "https://site.test/src/?debug=1&lang=en");
    }
}
