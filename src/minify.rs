//! HTML minification that leaves embedded PHP alone.
//!
//! Every `<?php … ?>` block is lifted out and replaced with [`PLACEHOLDER`]
//! before any whitespace is touched, then put back in order afterwards:
//!
//! ```text
//! <div>\n  <?php echo $x; ?>\n</div>
//!   extract    <div>\n  @@PHP_BLOCK@@\n</div>        blocks = ["<?php echo $x; ?>"]
//!   minify     <div> @@PHP_BLOCK@@ </div>
//!   reinsert   <div> <?php echo $x; ?> </div>
//! ```
//!
//! An opening `<?php` with no closing tag protects everything up to the end
//! of the document, the way PHP itself treats a file without `?>`.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

/// Token that stands in for a PHP block while the markup is minified.
pub const PLACEHOLDER: &str = "@@PHP_BLOCK@@";

static PHP_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?php.*?(?:\?>|\z)").expect("valid regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MinifyError {
    #[error("input already contains the placeholder token {}", PLACEHOLDER)]
    PlaceholderInInput,
    #[error("extracted {extracted} PHP blocks but found {slots} placeholders")]
    BlockCountMismatch { extracted: usize, slots: usize },
}

/// Replace each PHP block with [`PLACEHOLDER`], returning the blocks in
/// document order.
pub fn extract_blocks(html: &str) -> Result<(String, Vec<String>), MinifyError> {
    if html.contains(PLACEHOLDER) {
        return Err(MinifyError::PlaceholderInInput);
    }
    let blocks: Vec<String> = PHP_BLOCK
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect();
    let stripped = PHP_BLOCK.replace_all(html, PLACEHOLDER).into_owned();
    Ok((stripped, blocks))
}

/// Put `blocks` back, the i-th block into the i-th placeholder.
pub fn reinsert_blocks(html: &str, blocks: &[String]) -> Result<String, MinifyError> {
    let pieces: Vec<&str> = html.split(PLACEHOLDER).collect();
    let slots = pieces.len() - 1;
    if slots != blocks.len() {
        return Err(MinifyError::BlockCountMismatch {
            extracted: blocks.len(),
            slots,
        });
    }

    let capacity = html.len() + blocks.iter().map(String::len).sum::<usize>();
    let mut out = String::with_capacity(capacity);
    for (i, piece) in pieces.iter().enumerate() {
        out.push_str(piece);
        if let Some(block) = blocks.get(i) {
            out.push_str(block);
        }
    }
    Ok(out)
}

/// Minify markup outside PHP blocks:
///
/// 1. drop HTML comments (unless one swallowed a placeholder)
/// 2. remove whitespace between adjacent tags
/// 3. collapse remaining whitespace runs to one space and trim
fn minify_markup(html: &str) -> String {
    let html = COMMENT.replace_all(html, |caps: &Captures| {
        let comment = &caps[0];
        if comment.contains(PLACEHOLDER) {
            comment.to_string()
        } else {
            String::new()
        }
    });
    let html = BETWEEN_TAGS.replace_all(&html, "><");
    let html = WHITESPACE.replace_all(&html, " ");
    html.trim().to_string()
}

/// Minify `html`, keeping every PHP block byte-identical and in place.
pub fn minify_html(html: &str) -> Result<String, MinifyError> {
    let (stripped, blocks) = extract_blocks(html)?;
    reinsert_blocks(&minify_markup(&stripped), &blocks)
}
