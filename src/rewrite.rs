//! Prefixes the site base path onto asset references so a site built for
//! `/` can be served from a subdirectory.

use regex::{Captures, Regex};
use std::borrow::Cow;

/// The reference prefix of the output asset tree.
pub const ASSET_ROOT: &str = "/assets/";

/// Rewrites `src`/`href` attributes that point into the asset root.
pub struct Rewriter {
    pattern: Regex,
    base_path: String,
}

impl Rewriter {
    /// `base_path` is the site's `baseurl`; a trailing slash is ignored.
    /// `asset_root` is the prefix an attribute value must start with to be
    /// rewritten (usually [`ASSET_ROOT`]).
    pub fn new(base_path: &str, asset_root: &str) -> Rewriter {
        let pattern = format!(r#"(\s(?:src|href)\s*=\s*["'])({})"#, regex::escape(asset_root));
        Rewriter {
            // The pattern is built from an escaped literal, so it always compiles.
            pattern: Regex::new(&pattern).expect("escaped asset root forms a valid pattern"),
            base_path: base_path.trim_end_matches('/').to_owned(),
        }
    }

    /// Returns `html` with matching attribute values prefixed. Borrows the
    /// input unchanged when the base path is empty or nothing matches.
    pub fn rewrite<'h>(&self, html: &'h str) -> Cow<'h, str> {
        if self.base_path.is_empty() {
            return Cow::Borrowed(html);
        }
        self.pattern.replace_all(html, |caps: &Captures| {
            format!("{}{}{}", &caps[1], self.base_path, &caps[2])
        })
    }
}
