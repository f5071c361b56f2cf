//! Language selector regeneration.
//!
//! The development page renders its own `<select id="language-selector">`
//! pointing at `?lang=` URLs. The production page gets a fresh one whose
//! options point at the static `index_<lang>.php` files, with the page's own
//! language preselected. Whatever the development markup contained is
//! discarded.

use maud::{Markup, html};
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

use crate::config::LanguageConfig;
use crate::types::page_file_name;

pub const SELECTOR_ID: &str = "language-selector";

static SELECTOR_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<select\b[^>]*\bid="language-selector"[^>]*>.*?</select>"#)
        .expect("valid regex")
});

/// Render the selector for a page in `current`.
pub fn render_selector(languages: &[LanguageConfig], current: &str) -> Markup {
    html! {
        select id=(SELECTOR_ID) name="lang" onchange="location = this.value;" {
            @for lang in languages {
                option value=(page_file_name(&lang.code)) selected[lang.code == current] {
                    (lang.label)
                }
            }
        }
    }
}

/// Replace every selector block in `html` with a freshly rendered one.
/// Pages without a selector are returned unchanged.
pub fn patch_selector(html: &str, languages: &[LanguageConfig], current: &str) -> String {
    let markup = render_selector(languages, current).into_string();
    SELECTOR_BLOCK
        .replace_all(html, NoExpand(&markup))
        .into_owned()
}
