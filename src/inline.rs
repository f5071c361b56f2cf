//! Asset inlining.
//!
//! Linked stylesheets and scripts are fetched and embedded in the page so
//! each language artifact is self-contained:
//!
//! ```text
//! <link rel="stylesheet" href="css/site.css">      ─┐
//! <link rel="stylesheet" href="css/print.css">     ─┴► <style>…site…print…</style>  before </head>
//! <script src="js/app.js"></script>                ──► <script>…app…</script>        before </body>
//! ```
//!
//! Each kind is handled in one pass, stylesheets first. References are
//! resolved against the asset root on the page's origin, so `css/site.css`
//! on `https://dev.test/src/?lang=en` becomes
//! `https://dev.test/assets-root/css/site.css`. Absolute references resolve
//! to themselves.
//!
//! A reference that fails to fetch is dropped from the inline block and its
//! tag is left in the page untouched; a failure never aborts the page.
//! References that were inlined have their `<link>`/`<script>` tag removed.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::fetch::{FetchError, Transport};
use crate::types::{AssetKind, AssetReference};

static STYLE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*?\.css)""#).expect("valid regex"));
static SCRIPT_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="([^"]*?\.js)""#).expect("valid regex"));

/// Every reference of `kind` in `html`, in document order.
pub fn find_references(html: &str, kind: AssetKind) -> Vec<AssetReference> {
    let pattern = match kind {
        AssetKind::Style => &STYLE_HREF,
        AssetKind::Script => &SCRIPT_SRC,
    };
    pattern
        .captures_iter(html)
        .map(|c| AssetReference {
            kind,
            url: c[1].to_string(),
        })
        .collect()
}

/// Outcome of inlining one page.
#[derive(Debug)]
pub struct Inlined {
    pub html: String,
    /// References embedded in the page.
    pub inlined: Vec<AssetReference>,
    /// References that could not be fetched, with the reason.
    pub dropped: Vec<(AssetReference, FetchError)>,
}

/// Fetches linked assets and embeds them in a page.
pub struct AssetInliner<'t, T: Transport + ?Sized> {
    transport: &'t T,
    asset_base: Url,
    timeout: Duration,
}

impl<'t, T: Transport + ?Sized> AssetInliner<'t, T> {
    /// `asset_root` is joined to the origin of `page_url`.
    pub fn new(
        transport: &'t T,
        page_url: &Url,
        asset_root: &str,
        timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            transport,
            asset_base: page_url.join(asset_root)?,
            timeout,
        })
    }

    /// Absolute URL of a reference.
    pub fn resolve(&self, reference: &AssetReference) -> Result<Url, url::ParseError> {
        self.asset_base.join(&reference.url)
    }

    /// Inline every style, then every script, reference in `html`.
    pub fn inline(&self, html: &str) -> Inlined {
        let mut result = Inlined {
            html: html.to_string(),
            inlined: Vec::new(),
            dropped: Vec::new(),
        };
        for kind in AssetKind::ALL {
            self.inline_kind(kind, &mut result);
        }
        result
    }

    fn inline_kind(&self, kind: AssetKind, result: &mut Inlined) {
        let mut bodies = Vec::new();
        let mut fetched = Vec::new();

        for reference in find_references(&result.html, kind) {
            let url = match self.resolve(&reference) {
                Ok(url) => url,
                Err(source) => {
                    debug!(url = %reference.url, error = %source, "asset reference does not resolve");
                    let url = reference.url.clone();
                    result
                        .dropped
                        .push((reference, FetchError::Unresolvable { url, source }));
                    continue;
                }
            };
            match self.transport.get_ok(&url, self.timeout) {
                Ok(body) => {
                    bodies.push(body);
                    fetched.push(reference);
                }
                Err(err) => {
                    debug!(%url, error = %err, "dropping asset");
                    result.dropped.push((reference, err));
                }
            }
        }

        if bodies.is_empty() {
            return;
        }

        let mut html = std::mem::take(&mut result.html);
        for reference in &fetched {
            html = remove_reference(&html, reference);
        }
        let block = format!("<{tag}>{}</{tag}>", bodies.join("\n"), tag = kind.tag());
        result.html = splice(&html, kind, &block);
        result.inlined.extend(fetched);
    }
}

/// Remove the tag that links `reference`. Other uses of the same URL stay.
fn remove_reference(html: &str, reference: &AssetReference) -> String {
    let url = regex::escape(&reference.url);
    let pattern = match reference.kind {
        AssetKind::Style => format!(r#"<link\b[^>]*\bhref="{url}"[^>]*>"#),
        AssetKind::Script => format!(r#"<script\b[^>]*\bsrc="{url}"[^>]*>\s*</script>"#),
    };
    match Regex::new(&pattern) {
        Ok(re) => re.replace(html, "").into_owned(),
        Err(_) => html.to_string(),
    }
}

/// Insert `block` before `</head>` (styles) or `</body>` (scripts), falling
/// back to the end of the document.
fn splice(html: &str, kind: AssetKind, block: &str) -> String {
    let anchor = match kind {
        AssetKind::Style => "</head>",
        AssetKind::Script => "</body>",
    };
    match html.find(anchor) {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + block.len());
            out.push_str(&html[..pos]);
            out.push_str(block);
            out.push_str(&html[pos..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(block);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StubTransport;

    const PAGE: &str = "https://dev.test/src/?lang=en";

    fn inliner(stub: &StubTransport) -> AssetInliner<'_, StubTransport> {
        AssetInliner::new(
            stub,
            &Url::parse(PAGE).unwrap(),
            "/assets-root/",
            Duration::from_secs(10),
        )
        .unwrap()
    }

    #[test]
    fn finds_references_in_document_order() {
        let html = r#"<link href="a.css"><a href="page.html">x</a><link href="/assets-root/b.css"><script src="c.js"></script>"#;
        let styles: Vec<String> = find_references(html, AssetKind::Style)
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(styles, vec!["a.css", "/assets-root/b.css"]);
        let scripts = find_references(html, AssetKind::Script);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].url, "c.js");
    }

    #[test]
    fn reference_does_not_span_attributes() {
        let html = r#"<a href="/home">Home</a> <link rel="stylesheet" href="site.css">"#;
        let refs = find_references(html, AssetKind::Style);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "site.css");
    }

    #[test]
    fn resolves_against_asset_root_on_page_origin() {
        let stub = StubTransport::new();
        let inl = inliner(&stub);
        let resolve = |url: &str| {
            inl.resolve(&AssetReference {
                kind: AssetKind::Style,
                url: url.to_string(),
            })
            .unwrap()
            .to_string()
        };
        assert_eq!(resolve("css/site.css"), "https://dev.test/assets-root/css/site.css");
        assert_eq!(resolve("/assets-root/x.css"), "https://dev.test/assets-root/x.css");
        assert_eq!(resolve("https://cdn.test/lib.css"), "https://cdn.test/lib.css");
    }

    #[test]
    fn styles_and_scripts_are_inlined_in_place() {
        let stub = StubTransport::new()
            .with("https://dev.test/assets-root/a.css", 200, "a{}")
            .with("https://dev.test/assets-root/b.css", 200, "b{}")
            .with("https://dev.test/assets-root/app.js", 200, "run();");
        let html = r#"<html><head><link rel="stylesheet" href="a.css"><link rel="stylesheet" href="b.css"></head><body><p>x</p><script src="app.js"></script></body></html>"#;

        let out = inliner(&stub).inline(html);
        assert_eq!(
            out.html,
            "<html><head><style>a{}\nb{}</style></head><body><p>x</p><script>run();</script></body></html>"
        );
        assert_eq!(out.inlined.len(), 3);
        assert!(out.dropped.is_empty());
    }

    #[test]
    fn failed_asset_is_dropped_and_its_tag_kept() {
        let stub = StubTransport::new()
            .with("https://dev.test/assets-root/ok.css", 200, "ok{}")
            .with("https://dev.test/assets-root/missing.css", 404, "");
        let html = r#"<head><link href="ok.css"><link href="missing.css"></head>"#;

        let out = inliner(&stub).inline(html);
        assert_eq!(
            out.html,
            r#"<head><link href="missing.css"><style>ok{}</style></head>"#
        );
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].0.url, "missing.css");
    }

    #[test]
    fn unresolvable_reference_is_dropped() {
        let stub = StubTransport::new().with("https://dev.test/assets-root/ok.css", 200, "ok{}");
        let html = r#"<head><link href="http://[oops.css"><link href="ok.css"></head>"#;

        let out = inliner(&stub).inline(html);
        assert_eq!(
            out.html,
            r#"<head><link href="http://[oops.css"><style>ok{}</style></head>"#
        );
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].0.url, "http://[oops.css");
        assert!(matches!(out.dropped[0].1, FetchError::Unresolvable { .. }));
        assert_eq!(stub.requests().len(), 1);
    }

    #[test]
    fn nothing_fetched_leaves_page_unchanged() {
        let stub = StubTransport::new().timing_out("https://dev.test/assets-root/slow.js");
        let html = r#"<body><script src="slow.js"></script></body>"#;
        let out = inliner(&stub).inline(html);
        assert_eq!(out.html, html);
        assert!(out.inlined.is_empty());
        assert_eq!(out.dropped.len(), 1);
    }

    #[test]
    fn assets_use_the_asset_timeout() {
        let stub = StubTransport::new().with("https://dev.test/assets-root/a.css", 200, "");
        inliner(&stub).inline(r#"<link href="a.css">"#);
        assert_eq!(stub.requests()[0].1, Duration::from_secs(10));
    }

    #[test]
    fn missing_anchor_appends_block() {
        let stub = StubTransport::new().with("https://dev.test/assets-root/a.js", 200, "go();");
        let out = inliner(&stub).inline(r#"<script src="a.js"></script><p>end</p>"#);
        assert_eq!(out.html, "<p>end</p><script>go();</script>");
    }

    #[test]
    fn dollar_signs_in_assets_survive() {
        let stub = StubTransport::new().with("https://dev.test/assets-root/a.js", 200, "$(run);");
        let out = inliner(&stub).inline(r#"<body><script src="a.js"></script></body>"#);
        assert_eq!(out.html, "<body><script>$(run);</script></body>");
    }
}
