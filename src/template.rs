//! A minimal layout engine: four named tokens are substituted literally in a
//! single pass. Substituted values are never rescanned, so page content that
//! happens to contain `{{ content }}` is emitted as-is. Any other `{{ ... }}`
//! text is left untouched.

use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*(content|page\.title|site\.title|site\.baseurl)\s*\}\}")
        .expect("token pattern is valid")
});

/// The runtime values for a single render.
#[derive(Debug, Default, Clone, Copy)]
pub struct Values<'a> {
    /// Replaces `{{ content }}`.
    pub content: &'a str,

    /// Replaces `{{ page.title }}`.
    pub page_title: &'a str,

    /// Replaces `{{ site.title }}`.
    pub site_title: &'a str,

    /// Replaces `{{ site.baseurl }}`.
    pub site_baseurl: &'a str,
}

impl Values<'_> {
    fn get(&self, name: &str) -> &str {
        match name {
            "content" => self.content,
            "page.title" => self.page_title,
            "site.title" => self.site_title,
            "site.baseurl" => self.site_baseurl,
            _ => "",
        }
    }
}

/// A parsed layout.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Template {
        Template { text: text.into() }
    }

    /// Reads a layout file. Invalid UTF-8 sequences are replaced rather than
    /// rejected.
    pub fn load(path: &Path) -> Result<Template> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Template::new(String::from_utf8_lossy(&bytes))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::Missing(path.to_owned()))
            }
            Err(err) => Err(Error::Read {
                path: path.to_owned(),
                err,
            }),
        }
    }

    /// The recognized tokens present in the layout, in order of appearance.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        TOKEN
            .captures_iter(&self.text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    }

    pub fn render(&self, values: &Values) -> String {
        TOKEN
            .replace_all(&self.text, |caps: &Captures| values.get(&caps[1]).to_owned())
            .into_owned()
    }
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a layout.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the layout file does not exist.
    #[error("layout not found: `{}`", .0.display())]
    Missing(PathBuf),

    /// Returned for other I/O errors reading the layout.
    #[error("reading layout `{}`: {err}", path.display())]
    Read { path: PathBuf, err: std::io::Error },
}
