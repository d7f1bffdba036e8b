//! Locates assets referenced by mirrored pages and copies them into the
//! site's asset tree.
//!
//! [`Resolver::resolve`] maps a reference (absolute URL, root-relative or
//! relative path) onto a file in the mirror. Mirroring tools often rename
//! downloads, so after the exact lookup it tries a fixed list of binary
//! extensions and finally any sibling sharing the file stem. Every step is
//! deterministic: extensions are tried in [`FALLBACK_EXTENSIONS`] order and
//! sibling candidates are sorted by name.
//!
//! [`Relocator::relocate`] copies a resolved file under the output asset
//! directory and returns the reference to substitute into the page.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Extensions tried, in order, when the exact file is missing.
pub const FALLBACK_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "pdf", "docx", "zip", "svg", "webp",
];

/// Maps asset references onto files in a mirrored tree.
pub struct Resolver<'a> {
    /// Root of the mirrored site.
    mirror_root: &'a Path,

    /// Host whose absolute URLs are served from the mirror. Empty means every
    /// absolute URL is external.
    source_domain: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(mirror_root: &'a Path, source_domain: &'a str) -> Resolver<'a> {
        Resolver {
            mirror_root,
            source_domain,
        }
    }

    /// Returns the mirrored file for `reference`, or `None` when the
    /// reference is external or nothing plausible exists.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let relative = self.mirror_relative(reference)?;
        let candidate = join_normalized(self.mirror_root, &relative)?;
        if candidate.is_file() {
            return Some(candidate);
        }

        for extension in FALLBACK_EXTENSIONS {
            let attempt = candidate.with_extension(extension);
            if attempt != candidate && attempt.is_file() {
                return Some(attempt);
            }
        }

        sibling_with_stem(&candidate)
    }

    /// Reduces `reference` to a path relative to the mirror root. Query
    /// strings and fragments are dropped and percent-escapes decoded.
    fn mirror_relative(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() || reference.starts_with('#') {
            return None;
        }

        let parsed = match reference.starts_with("//") {
            true => Url::parse(&format!("https:{}", reference)),
            false => Url::parse(reference),
        };
        let path = match parsed {
            Ok(url) => {
                if !matches!(url.scheme(), "http" | "https") {
                    return None;
                }
                match url.host_str() {
                    Some(host)
                        if !self.source_domain.is_empty()
                            && host.eq_ignore_ascii_case(self.source_domain) =>
                    {
                        url.path().to_owned()
                    }
                    _ => return None,
                }
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => reference
                .split(|c: char| c == '?' || c == '#')
                .next()
                .unwrap_or_default()
                .to_owned(),
            Err(_) => return None,
        };

        Some(match urlencoding::decode(&path) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => path,
        })
    }
}

/// Joins a `/`-separated path onto `root`, resolving `.` and `..` lexically.
/// `..` never climbs above `root`. Returns `None` for an empty path.
pub fn join_normalized(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.iter().fold(root.to_path_buf(), |p, s| p.join(s)))
}

// The lexicographically first file in `candidate`'s directory whose name is
// `{stem}.{anything}`.
fn sibling_with_stem(candidate: &Path) -> Option<PathBuf> {
    let parent = candidate.parent()?;
    let prefix = format!("{}.", candidate.file_stem()?.to_str()?);
    let mut matches: Vec<PathBuf> = fs::read_dir(parent)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(false, |name| name.starts_with(&prefix))
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// A file copied into the output asset tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocated {
    /// Where the file was written.
    pub path: PathBuf,

    /// The reference to substitute into page content, e.g.
    /// `/assets/wp-content/uploads/2020/01/a.png`.
    pub reference: String,
}

/// Copies resolved assets into the output asset directory under a
/// normalized layout.
pub struct Relocator<'a> {
    /// Root of the mirrored site. Destinations are computed from paths
    /// relative to it when possible.
    mirror_root: &'a Path,

    /// Directory receiving the copies (e.g. `site/assets`).
    asset_directory: &'a Path,

    /// Reference prefix matching `asset_directory` (e.g. `/assets`).
    url_prefix: &'a str,

    /// Ordered `/`-separated segment markers. The first marker found in a
    /// path decides its layout: everything from the marker on is kept.
    markers: &'a [String],
}

impl<'a> Relocator<'a> {
    pub fn new(
        mirror_root: &'a Path,
        asset_directory: &'a Path,
        url_prefix: &'a str,
        markers: &'a [String],
    ) -> Relocator<'a> {
        Relocator {
            mirror_root,
            asset_directory,
            url_prefix,
            markers,
        }
    }

    /// Computes the destination segments for `source`: from the first
    /// matching marker onward, or else the last three segments.
    pub fn destination(&self, source: &Path) -> Vec<String> {
        let relative = source.strip_prefix(self.mirror_root).unwrap_or(source);
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        for marker in self.markers {
            let marker: Vec<&str> = marker.split('/').filter(|s| !s.is_empty()).collect();
            if marker.is_empty() || marker.len() > segments.len() {
                continue;
            }
            if let Some(start) = segments
                .windows(marker.len())
                .position(|window| window.iter().zip(&marker).all(|(a, b)| a.as_str() == *b))
            {
                return segments[start..].to_vec();
            }
        }

        let start = segments.len().saturating_sub(3);
        segments[start..].to_vec()
    }

    /// Copies `source` to its destination, overwriting any previous copy, and
    /// returns the new location and reference.
    pub fn relocate(&self, source: &Path) -> Result<Relocated> {
        let segments = self.destination(source);
        let path = segments
            .iter()
            .fold(self.asset_directory.to_path_buf(), |p, s| p.join(s));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::CreateDirectory {
                path: parent.to_owned(),
                err,
            })?;
        }
        fs::copy(source, &path).map_err(|err| Error::Copy {
            from: source.to_owned(),
            to: path.clone(),
            err,
        })?;
        Ok(Relocated {
            reference: format!("{}/{}", self.url_prefix.trim_end_matches('/'), segments.join("/")),
            path,
        })
    }
}

/// The result of a fallible relocation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error copying an asset.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a destination directory can't be created.
    #[error("creating asset directory `{}`: {err}", path.display())]
    CreateDirectory { path: PathBuf, err: std::io::Error },

    /// Returned when the copy itself fails.
    #[error("copying `{}` to `{}`: {err}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        err: std::io::Error,
    },
}
