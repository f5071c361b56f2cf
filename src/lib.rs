//! # Distill
//!
//! Production builder for a bilingual PHP website. The development site runs
//! on a local server with every debugging aid switched on; distill turns it
//! into a deployable `dist/` directory.
//!
//! # Architecture: Staged Pipeline
//!
//! ```text
//! 1. Clean   src/php/     →  dist/php/          (excluded modules stripped out)
//! 2. Assets  src/assets/  →  dist/assets/       (images and fonts copied, CSS/JS minified)
//!            src/html/    →  dist/html/         (templates minified)
//! 3. Pages   ?lang=xx     →  dist/index_xx.php  (one self-contained page per language)
//! ```
//!
//! Stage 3 runs once per configured language, sequentially. Each language
//! goes through the same post-processing chain:
//!
//! ```text
//! fetch → inline assets → rewrite URLs → patch selector → minify → write
//! ```
//!
//! A failure in stage 1 aborts the build. A failing asset is skipped and
//! reported. A failure for one language only costs that language's page.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`clean`] | Stage 1: mirrors the source tree, skipping excluded files and rewriting the rest |
//! | [`assets`] | Stage 2: copies images and fonts, minifies stylesheets, scripts, and templates |
//! | [`rules`] | Ordered regex rewrite rules and the cleaning rule table |
//! | [`encoding`] | UTF-8 then Latin-1 decoding of source files |
//! | [`fetch`] | `Transport` trait, the blocking HTTP client, and the page fetcher |
//! | [`inline`] | Embeds linked stylesheets and scripts into the page |
//! | [`rewrite`] | Development → production URL substitutions |
//! | [`selector`] | Regenerates the language selector with Maud |
//! | [`minify`] | Whitespace/comment minifier that protects `<?php … ?>` blocks |
//! | [`pipeline`] | Stage orchestration and the build report |
//! | [`config`] | `distill.toml` loading, merging, and validation |
//! | [`types`] | Shared domain types (`ExclusionSet`, `PageVariant`, `AssetReference`) |
//! | [`output`] | CLI output formatting: build summary and output tree |
//!
//! # Design Decisions
//!
//! ## Rules As Data
//!
//! Every text rewrite, for source cleaning and for URL rewriting alike, is a
//! named [`rules::RewriteRule`] evaluated by one small engine. The cleaning
//! report can then say which rule fired how often in which file, and adding a
//! rewrite never means touching the engine.
//!
//! Generic cleaning rules are generated from the excluded file names, so
//! excluding another module is a config change:
//!
//! ```toml
//! excluded = ["LanguageClass.php", "LoggerClass.php", "MinifierClass.php", "DebugBar.php"]
//! ```
//!
//! ## Network Behind A Trait
//!
//! Page and asset requests go through [`fetch::Transport`]. The binary uses a
//! blocking `reqwest` client; tests use an in-memory stub that records every
//! request and its timeout. Nothing else in the pipeline knows about HTTP.
//!
//! ## Positional PHP Protection
//!
//! The minifier swaps each PHP block for a shared placeholder and later
//! splits on that placeholder to put the blocks back in order. A page that
//! already contains the placeholder is rejected instead of being silently
//! scrambled.

pub mod assets;
pub mod clean;
pub mod config;
pub mod encoding;
pub mod fetch;
pub mod inline;
pub mod minify;
pub mod output;
pub mod pipeline;
pub mod rewrite;
pub mod rules;
pub mod selector;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
