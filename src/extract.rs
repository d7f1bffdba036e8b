//! Reads a mirrored page: its title, its main content and the asset
//! references inside it. Parsing goes through an html5ever DOM so attribute
//! rewriting never touches text that merely looks like a reference.

use kuchikikiki::NodeRef;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tendril::TendrilSink;

/// Selectors tried, in order, to locate the main content of a page.
const CONTENT_SELECTORS: &[&str] = &[".entry-content", "#content", "main", "article", "body"];

/// Link targets with these extensions are treated as downloadable assets.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip"];

/// Block-editor headings carry the page's own title.
const BLOCK_HEADINGS: &str = "h1.wp-block-heading, h2.wp-block-heading, h3.wp-block-heading, \
     h4.wp-block-heading, h5.wp-block-heading, h6.wp-block-heading";

/// A ` - Site Name` or ` | Site Name` tail on a `<title>`.
static SITE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-|]\s+.*$").expect("site suffix pattern is valid"));

static EMBED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/embed/([a-zA-Z0-9_-]+)").expect("embed pattern is valid")
});

static WATCH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"youtube\.com/watch\?v=([a-zA-Z0-9_-]+)").expect("watch pattern is valid")
});

/// A YouTube video mentioned by a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: String,
    pub title: String,

    /// Whether an embed for this video already sits in the main content.
    pub embedded: bool,
}

impl Video {
    /// A standard YouTube embed for the video.
    pub fn embed_html(&self) -> String {
        format!(
            "<iframe width=\"100%\" height=\"480\" src=\"https://www.youtube.com/embed/{}\" \
             title=\"{}\" frameborder=\"0\" allow=\"accelerometer; autoplay; clipboard-write; \
             encrypted-media; gyroscope; picture-in-picture; web-share\" \
             referrerpolicy=\"strict-origin-when-cross-origin\" allowfullscreen></iframe>",
            self.id,
            escape_attribute(&self.title),
        )
    }
}

pub struct Document {
    root: NodeRef,
    main: NodeRef,
}

impl Document {
    pub fn parse(html: &str) -> Document {
        let root = kuchikikiki::parse_html().one(html);
        let main = CONTENT_SELECTORS
            .iter()
            .find_map(|selector| root.select_first(selector).ok())
            .map(|element| element.as_node().clone())
            .unwrap_or_else(|| root.clone());
        Document { root, main }
    }

    /// The page's title: the first block-editor heading, else the first
    /// unclassed `<h1>`, else the first `<h2>`, else the `<title>` text with
    /// any site-name suffix removed.
    pub fn title(&self) -> Option<String> {
        self.heading_title().or_else(|| self.document_title())
    }

    fn heading_title(&self) -> Option<String> {
        if let Ok(heading) = self.root.select_first(BLOCK_HEADINGS) {
            return non_empty(heading.as_node().text_contents());
        }
        if let Ok(h1) = self.root.select_first("h1") {
            if h1.attributes.borrow().get("class").is_none() {
                return non_empty(h1.as_node().text_contents());
            }
        }
        let h2 = self.root.select_first("h2").ok()?;
        non_empty(h2.as_node().text_contents())
    }

    fn document_title(&self) -> Option<String> {
        let title = self.root.select_first("title").ok()?;
        let text = non_empty(title.as_node().text_contents())?;
        non_empty(SITE_SUFFIX.replace(&text, "").into_owned())
    }

    /// Distinct YouTube videos in the page, in order of appearance: embeds
    /// first, then `watch?v=` links written out in the page text.
    pub fn videos(&self) -> Vec<Video> {
        let embedded: BTreeSet<String> = attribute_values(&self.main, "iframe", "src")
            .iter()
            .filter_map(|src| capture(&EMBED_ID, src))
            .collect();

        let mut videos: Vec<Video> = Vec::new();
        let mut push = |id: String, title: String| {
            if !videos.iter().any(|video| video.id == id) {
                let embedded = embedded.contains(&id);
                videos.push(Video { id, title, embedded });
            }
        };

        if let Ok(iframes) = self.root.select("iframe") {
            for iframe in iframes {
                let attributes = iframe.attributes.borrow();
                let id = attributes.get("src").and_then(|src| capture(&EMBED_ID, src));
                if let Some(id) = id {
                    let title = attributes.get("title").unwrap_or_default().trim().to_owned();
                    push(id, title);
                }
            }
        }
        let text = self.root.text_contents();
        for captures in WATCH_ID.captures_iter(&text) {
            push(captures[1].to_owned(), "YouTube video".to_owned());
        }
        videos
    }

    /// Distinct asset references in the main content: every image source,
    /// plus link targets that contain one of `markers` or name a document.
    pub fn content_references(&self, markers: &[String]) -> BTreeSet<String> {
        let mut references = BTreeSet::new();
        references.extend(attribute_values(&self.main, "img", "src"));
        references.extend(
            attribute_values(&self.main, "a", "href")
                .into_iter()
                .filter(|href| contains_marker(href, markers) || is_document(href)),
        );
        references
    }

    /// Distinct stylesheet and theme references from `<link>` elements
    /// anywhere in the page.
    pub fn head_references(&self, markers: &[String]) -> BTreeSet<String> {
        attribute_values(&self.root, "link", "href")
            .into_iter()
            .filter(|href| contains_marker(href, markers) || has_extension(href, &["css"]))
            .collect()
    }

    /// Replaces `src`/`href` values in the main content that exactly equal a
    /// key of `replacements`. Returns the number of attributes changed.
    pub fn rewrite(&self, replacements: &BTreeMap<String, String>) -> usize {
        let mut rewritten = 0;
        for (tag, attribute) in [("img", "src"), ("a", "href")] {
            let elements = match self.main.select(tag) {
                Ok(elements) => elements,
                Err(()) => continue,
            };
            for element in elements {
                let mut attributes = element.attributes.borrow_mut();
                let replacement = attributes
                    .get(attribute)
                    .and_then(|value| replacements.get(value.trim()))
                    .cloned();
                if let Some(replacement) = replacement {
                    attributes.insert(attribute, replacement);
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    /// Serializes the children of the main content element.
    pub fn content_html(&self) -> String {
        self.main.children().map(|child| child.to_string()).collect()
    }
}

fn attribute_values(node: &NodeRef, tag: &str, attribute: &str) -> Vec<String> {
    match node.select(tag) {
        Ok(elements) => elements
            .filter_map(|element| {
                let attributes = element.attributes.borrow();
                let value = attributes
                    .get(attribute)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(str::to_owned);
                value
            })
            .collect(),
        Err(()) => Vec::new(),
    }
}

/// Collapses whitespace runs; `None` when nothing is left.
fn non_empty(text: String) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.is_empty() {
        true => None,
        false => Some(collapsed),
    }
}

fn capture(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .map(|captures| captures[1].to_owned())
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn contains_marker(reference: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| reference.contains(marker.as_str()))
}

fn is_document(reference: &str) -> bool {
    has_extension(reference, DOCUMENT_EXTENSIONS)
}

fn has_extension(reference: &str, extensions: &[&str]) -> bool {
    let path = reference
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    extensions
        .iter()
        .any(|extension| path.ends_with(&format!(".{}", extension)))
}

#[cfg(test)]
mod test {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
  <title>
    About   Us – Example
  </title>
  <link rel="stylesheet" href="/wp-content/themes/t/style.css?ver=2">
  <link rel="stylesheet" href="https://fonts.example.com/css2">
  <link rel="icon" href="/favicon.ico">
</head><body>
<header><img src="/logo.png"></header>
<div class="entry-content">
<p>Hello <a href="/wp-content/uploads/2020/01/form.docx">form</a>
and <a href="/guide.PDF">guide</a> and <a href="/about/">about</a>.</p>
<img src="/wp-content/uploads/2020/01/a.png" alt="a">
<p>/wp-content/uploads/2020/01/a.png as text</p>
</div>
</body></html>"#;

    fn markers() -> Vec<String> {
        vec!["wp-content/uploads".to_owned(), "wp-content/themes".to_owned()]
    }

    #[test]
    fn test_title() {
        assert_eq!(Some("About Us – Example".to_owned()), Document::parse(PAGE).title());
        assert_eq!(None, Document::parse("<p>x</p>").title());
    }

    #[test]
    fn test_content_references() {
        let references = Document::parse(PAGE).content_references(&markers());
        let wanted: BTreeSet<String> = [
            "/guide.PDF",
            "/wp-content/uploads/2020/01/a.png",
            "/wp-content/uploads/2020/01/form.docx",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(wanted, references);
    }

    #[test]
    fn test_head_references() {
        let references = Document::parse(PAGE).head_references(&markers());
        assert_eq!(
            vec!["/wp-content/themes/t/style.css?ver=2".to_owned()],
            references.into_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_rewrite_attributes_only() {
        let document = Document::parse(PAGE);
        let mut replacements = BTreeMap::new();
        replacements.insert(
            "/wp-content/uploads/2020/01/a.png".to_owned(),
            "/assets/wp-content/uploads/2020/01/a.png".to_owned(),
        );
        assert_eq!(1, document.rewrite(&replacements));

        let html = document.content_html();
        assert!(html.contains(r#"src="/assets/wp-content/uploads/2020/01/a.png""#), "{}", html);
        assert!(html.contains("<p>/wp-content/uploads/2020/01/a.png as text</p>"), "{}", html);
        assert!(!html.contains("logo.png"), "{}", html);
    }

    #[test]
    fn test_title_prefers_headings() {
        let block = r#"<html><head><title>Ignored</title></head><body>
<h1 class="site-title">Example Org</h1>
<h2>Second</h2>
<h3 class="wp-block-heading">Sunday   Meetings</h3></body></html>"#;
        assert_eq!(Some("Sunday Meetings".to_owned()), Document::parse(block).title());

        let classed_h1 = r#"<h1 class="site-title">Example Org</h1><h2>Contact</h2>"#;
        assert_eq!(Some("Contact".to_owned()), Document::parse(classed_h1).title());

        let plain_h1 = "<h1>Events</h1><h2>Contact</h2>";
        assert_eq!(Some("Events".to_owned()), Document::parse(plain_h1).title());
    }

    #[test]
    fn test_title_site_suffix_removed() {
        let page = "<html><head><title>Mid-year Retreat | Example Org</title></head></html>";
        assert_eq!(Some("Mid-year Retreat".to_owned()), Document::parse(page).title());

        let page = "<html><head><title>Contact - Example - Org</title></head></html>";
        assert_eq!(Some("Contact".to_owned()), Document::parse(page).title());
    }

    #[test]
    fn test_rewrite_padded_attribute() {
        let document = Document::parse(
            r#"<div class="entry-content"><img src=" /wp-content/uploads/a.png "></div>"#,
        );
        let references = document.content_references(&markers());
        assert_eq!(
            vec!["/wp-content/uploads/a.png".to_owned()],
            references.iter().cloned().collect::<Vec<_>>()
        );

        let replacements: BTreeMap<String, String> = references
            .into_iter()
            .map(|reference| {
                let relocated = format!("/assets{}", reference);
                (reference, relocated)
            })
            .collect();
        assert_eq!(1, document.rewrite(&replacements));
        assert_eq!(r#"<img src="/assets/wp-content/uploads/a.png">"#, document.content_html());
    }

    #[test]
    fn test_videos() {
        let page = r#"<html><body>
<aside><iframe src="https://www.youtube.com/embed/side_1?rel=0" title="Sidebar"></iframe></aside>
<div class="entry-content">
<iframe src="https://www.youtube.com/embed/abc-2" title="Sermon"></iframe>
<p>Also https://www.youtube.com/watch?v=abc-2 and https://www.youtube.com/watch?v=w3</p>
<iframe src="https://player.vimeo.com/video/9"></iframe>
</div></body></html>"#;
        let videos = Document::parse(page).videos();
        assert_eq!(
            vec![
                Video { id: "side_1".to_owned(), title: "Sidebar".to_owned(), embedded: false },
                Video { id: "abc-2".to_owned(), title: "Sermon".to_owned(), embedded: true },
                Video { id: "w3".to_owned(), title: "YouTube video".to_owned(), embedded: false },
            ],
            videos
        );
    }

    #[test]
    fn test_embed_html_escapes_title() {
        let video = Video { id: "w3".to_owned(), title: "Q&A \"live\"".to_owned(), embedded: false };
        let html = video.embed_html();
        assert!(html.starts_with("<iframe "), "{}", html);
        assert!(html.contains(r#"src="https://www.youtube.com/embed/w3""#), "{}", html);
        assert!(html.contains(r#"title="Q&amp;A &quot;live&quot;""#), "{}", html);
        assert!(html.ends_with("allowfullscreen></iframe>"), "{}", html);
    }

    #[test]
    fn test_body_fallback() {
        let document = Document::parse("<html><body><p>plain</p></body></html>");
        assert_eq!("<p>plain</p>", document.content_html());
    }
}
