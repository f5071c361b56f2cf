//! Declarative text-rewrite rules and the engine that applies them.
//!
//! A [`RewriteRule`] is a regex, a replacement template and a [`RuleScope`].
//! A [`RuleSet`] keeps rules in insertion order and applies them in two
//! passes:
//!
//! ```text
//! 1. file-specific rules whose scope names the file, in order
//! 2. generic rules, in order
//! ```
//!
//! File-specific rules run first because the generic patterns are broader:
//! a generic inclusion rule would otherwise eat part of a multi-line
//! fragment that a file-specific rule needs to see whole.
//!
//! The same engine drives both source cleaning ([`RuleSet::cleaning`]) and
//! URL rewriting of fetched pages (see [`crate::rewrite`]).
//!
//! ## Cleaning rules
//!
//! Generic rules are generated from the [`ExclusionSet`], one pattern per
//! statement kind, each matching any excluded module case-insensitively:
//!
//! | Rule | Removes |
//! |------|---------|
//! | `include-excluded` | `require`/`include` (`_once` or not) of `…/<Module>.php`, including a numeric file prefix like `2LoggerClass.php` |
//! | `use-excluded` | `use Vendor\<Module>;` and `use <Module> as Alias;` |
//! | `extends-excluded` | the `extends <Module>` clause of a class declaration |
//!
//! File-specific rules handle two files whose leftovers the generic patterns
//! cannot express: `autoload.php` and `APIClass.php`.

use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use thiserror::Error;

use crate::types::ExclusionSet;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("invalid pattern for rule '{name}': {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Which files a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleScope {
    /// Every file.
    Generic,
    /// Only the file with exactly this name.
    File(String),
}

/// A single pattern → replacement rewrite.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    name: String,
    scope: RuleScope,
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    /// Build a rule whose replacement may reference capture groups (`${1}`).
    pub fn new(
        name: impl Into<String>,
        scope: RuleScope,
        pattern: &str,
        replacement: impl Into<String>,
        case_insensitive: bool,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .multi_line(true)
            .build()
            .map_err(|source| RuleError::Pattern {
                name: name.clone(),
                source,
            })?;
        Ok(Self {
            name,
            scope,
            pattern,
            replacement: replacement.into(),
        })
    }

    /// Build a rule whose replacement is inserted verbatim, `$` included.
    pub fn literal(
        name: impl Into<String>,
        scope: RuleScope,
        pattern: &str,
        replacement: &str,
        case_insensitive: bool,
    ) -> Result<Self, RuleError> {
        Self::new(
            name,
            scope,
            pattern,
            replacement.replace('$', "$$"),
            case_insensitive,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &RuleScope {
        &self.scope
    }

    pub fn applies_to(&self, file_name: &str) -> bool {
        match &self.scope {
            RuleScope::Generic => true,
            RuleScope::File(name) => name == file_name,
        }
    }

    /// Apply the rule to every non-overlapping match. Returns the new text
    /// and the number of matches replaced.
    pub fn apply<'t>(&self, text: &'t str) -> (Cow<'t, str>, usize) {
        let hits = self.pattern.find_iter(text).count();
        if hits == 0 {
            return (Cow::Borrowed(text), 0);
        }
        (
            self.pattern.replace_all(text, self.replacement.as_str()),
            hits,
        )
    }
}

/// Result of running a [`RuleSet`] over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// `(rule name, matches replaced)` for every rule that fired, in the
    /// order they ran.
    pub hits: Vec<(String, usize)>,
}

impl Rewritten {
    pub fn changed(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// An ordered collection of rewrite rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: RewriteRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// The standard source-cleaning rules for an exclusion set: the
    /// file-specific table followed by the generic patterns built from the
    /// excluded module names.
    pub fn cleaning(exclusions: &ExclusionSet) -> Result<Self, RuleError> {
        let mut set = Self::new(file_specific_rules()?);
        for rule in generic_rules(exclusions)? {
            set.push(rule);
        }
        Ok(set)
    }

    /// Apply the rules that match `file_name`: file-specific first, then
    /// generic, each group in insertion order.
    pub fn apply(&self, file_name: &str, text: &str) -> Rewritten {
        let specific = self
            .rules
            .iter()
            .filter(|r| matches!(&r.scope, RuleScope::File(n) if n == file_name));
        let generic = self
            .rules
            .iter()
            .filter(|r| r.scope == RuleScope::Generic);
        run(specific.chain(generic), text)
    }

    /// Apply only the generic rules, for documents that have no file name.
    pub fn apply_generic(&self, text: &str) -> Rewritten {
        run(
            self.rules.iter().filter(|r| r.scope == RuleScope::Generic),
            text,
        )
    }
}

fn run<'r>(rules: impl Iterator<Item = &'r RewriteRule>, text: &str) -> Rewritten {
    let mut current = text.to_string();
    let mut hits = Vec::new();
    for rule in rules {
        let (next, n) = rule.apply(&current);
        if n > 0 {
            current = next.into_owned();
            hits.push((rule.name.clone(), n));
        }
    }
    Rewritten {
        text: current,
        hits,
    }
}

const AUTOLOAD: &str = "autoload.php";
const API_CLASS: &str = "APIClass.php";

/// Leftover log retrieval in `APIClass.php`: the logger call was cut out of
/// the middle of the statement, leaving a dangling `);` and an assignment
/// glued to the following `if`.
const BROKEN_LOG_FRAGMENT: &str = r"// Initialize LoggerClass and fetch log messages\r?\n\s*\);\r?\n\s*\$logMessages = // Log retrieval disabledif";

const DISABLED_LOG_STUB: &str =
    "// Logging functionality removed\n        $logMessages = [];\n        if";

fn file_specific_rules() -> Result<Vec<RewriteRule>, RuleError> {
    let autoload = || RuleScope::File(AUTOLOAD.to_string());
    let api = || RuleScope::File(API_CLASS.to_string());
    Ok(vec![
        RewriteRule::new(
            "autoload-language-include",
            autoload(),
            r#"include_once\s*\$phpDirectory\s*\.\s*['"]/LanguageClass\.php['"]\s*;\s*"#,
            "",
            true,
        )?,
        RewriteRule::new(
            "autoload-language-guard",
            autoload(),
            r#"else if\s*\(basename\(\$file\)\s*!==\s*['"]LanguageClass\.php['"]\)"#,
            "else",
            true,
        )?,
        RewriteRule::new(
            "api-language-require",
            api(),
            r"require_once __DIR__ \. '/LanguageClass\.php';\s*",
            "",
            false,
        )?,
        RewriteRule::new(
            "api-minifier-require",
            api(),
            r"require_once __DIR__ \. '/MinifierClass\.php';\s*",
            "",
            false,
        )?,
        RewriteRule::literal(
            "api-log-stub",
            api(),
            BROKEN_LOG_FRAGMENT,
            DISABLED_LOG_STUB,
            false,
        )?,
    ])
}

fn generic_rules(exclusions: &ExclusionSet) -> Result<Vec<RewriteRule>, RuleError> {
    if exclusions.is_empty() {
        return Ok(Vec::new());
    }
    let modules = exclusions
        .modules()
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");

    let include = format!(
        r#"(?:^[ \t]*)?\b(?:require|include)(?:_once)?\b[^;'"\n]*['"](?:[^'"\n]*/)?\d*(?:{modules})\.php['"]\s*\)?\s*;[ \t]*(?:\r?\n)?"#
    );
    let import = format!(
        r"^[ \t]*use\s+[^;\n]*?\b\d*(?:{modules})(?:\s+as\s+\w+)?\s*;[ \t]*(?:\r?\n)?"
    );
    let extends = format!(r"\b(class\s+\w+)\s+extends\s+\\?(?:\w+\\)*\d*(?:{modules})\b");

    Ok(vec![
        RewriteRule::new("include-excluded", RuleScope::Generic, &include, "", true)?,
        RewriteRule::new("use-excluded", RuleScope::Generic, &import, "", true)?,
        RewriteRule::new("extends-excluded", RuleScope::Generic, &extends, "${1}", true)?,
    ])
}
