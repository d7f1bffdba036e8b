use crate::frontmatter::{self, Fields};
use std::path::{Path, PathBuf};

/// A Markdown page read from the site directory.
#[derive(Debug, Clone)]
pub struct Page {
    /// The file the page was read from.
    pub source: PathBuf,

    /// Determines the output location; the source file stem.
    pub slug: String,

    /// The `title` front-matter field, or the slug when absent.
    pub title: String,

    /// All front-matter fields.
    pub fields: Fields,

    /// The Markdown body following the front matter.
    pub body: String,
}

impl Page {
    pub fn parse(source: &Path, text: &str) -> Page {
        let slug = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (fields, body) = frontmatter::parse(text);
        Page {
            source: source.to_owned(),
            title: fields.get("title").unwrap_or(&slug).to_owned(),
            body: body.to_owned(),
            fields,
            slug,
        }
    }
}
