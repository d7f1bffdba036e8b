//! The Markdown conversion seam. The pipeline only relies on a converter
//! being deterministic, wrapping bare inline content in block elements and
//! not inventing or dropping non-whitespace content. [`Commonmark`] is the
//! implementation used by the binary; tests substitute their own.

use pulldown_cmark::{html, Options, Parser};

/// Converts between Markdown and HTML.
pub trait Converter {
    /// Renders Markdown source as an HTML fragment.
    fn to_html(&self, markdown: &str) -> String;

    /// Reduces an HTML fragment to Markdown.
    fn to_markdown(&self, html: &str) -> String;
}

/// Renders with [`pulldown_cmark`] (tables, footnotes, strikethrough and
/// task lists enabled) and reduces HTML with `fast_html2md`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Commonmark;

impl Converter for Commonmark {
    fn to_html(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(markdown, options));
        out
    }

    fn to_markdown(&self, html: &str) -> String {
        html2md::rewrite_html(html, false)
    }
}
