//! Development → production URL rewriting.
//!
//! Three substitutions over the whole document, in this order:
//!
//! | # | Development | Production |
//! |---|-------------|------------|
//! | 1 | `/assets-root/img/logo.svg` | `/img/logo.svg` |
//! | 2 | `action="?lang=hu"` | `action="index_hu.php"` |
//! | 3 | `?lang=hu` anywhere else | `index_hu.php` |
//!
//! Rule 2 runs before rule 3 so form targets keep their quoting intact; rule
//! 3 then catches links, redirects, and anything else that still carries a
//! bare language parameter.

use crate::rules::{RewriteRule, RuleError, RuleScope, RuleSet, Rewritten};
use crate::types::page_file_name;

pub struct UrlRewriter {
    rules: RuleSet,
}

impl UrlRewriter {
    /// `asset_root` is the development prefix to strip, e.g. `/assets-root/`.
    pub fn new(asset_root: &str) -> Result<Self, RuleError> {
        let target = page_file_name("${1}");
        let rules = RuleSet::new(vec![
            RewriteRule::new(
                "strip-asset-root",
                RuleScope::Generic,
                &format!(r#"{}([^"'\s()]+)"#, regex::escape(asset_root)),
                "/${1}",
                false,
            )?,
            RewriteRule::new(
                "form-action-lang",
                RuleScope::Generic,
                r#"action="\?lang=([a-z]{2})""#,
                format!(r#"action="{target}""#),
                false,
            )?,
            RewriteRule::new(
                "bare-lang",
                RuleScope::Generic,
                r"\?lang=([a-z]{2})\b",
                target,
                false,
            )?,
        ]);
        Ok(Self { rules })
    }

    pub fn rewrite(&self, html: &str) -> Rewritten {
        self.rules.apply_generic(html)
    }
}
