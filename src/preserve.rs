//! Shields raw HTML fragments (embeds such as `<iframe>`) from the Markdown
//! converter. [`Filter::preserve`] swaps every fragment for an opaque
//! placeholder token before conversion and [`Filter::restore`] puts the
//! original fragments back afterwards.
//!
//! Converters treat a lone token as ordinary text, so it usually comes back
//! wrapped in a paragraph and occasionally in emphasis. Restoration therefore
//! walks an ordered list of [`Wrapper`]s and replaces the first wrapped form
//! it finds, falling back to the bare token.

use regex::Regex;
use std::sync::LazyLock;

/// Matches an iframe embed including its body, across newlines.
static EMBED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<iframe[^>]*>.*?</iframe>").expect("embed pattern is valid")
});

const MARKER: &str = "RAWHTMLBLOCK";

/// A markup form a converter may have wrapped around a placeholder token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wrapper {
    pub open: &'static str,
    pub close: &'static str,
}

impl Wrapper {
    pub const fn new(open: &'static str, close: &'static str) -> Wrapper {
        Wrapper { open, close }
    }

    fn wrap(&self, token: &str) -> String {
        format!("{}{}{}", self.open, token, self.close)
    }
}

/// The wrapped forms tried during restoration, in priority order. The
/// final entry is the bare token.
pub const WRAPPERS: &[Wrapper] = &[
    Wrapper::new("<p>", "</p>"),
    Wrapper::new("<p><strong>", "</strong></p>"),
    Wrapper::new("<p><em>", "</em></p>"),
    Wrapper::new("<strong>", "</strong>"),
    Wrapper::new("<em>", "</em>"),
    Wrapper::new("", ""),
];

/// Token-to-fragment pairs recorded by [`Filter::preserve`], in source order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Placeholders(Vec<(String, String)>);

impl Placeholders {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(t, f)| (t.as_str(), f.as_str()))
    }
}

/// The result of [`Filter::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub text: String,

    /// Tokens that could not be found in any wrapped form. They remain
    /// visible in `text`.
    pub missing: Vec<String>,
}

pub struct Filter<'a> {
    pattern: &'a Regex,
    wrappers: &'a [Wrapper],
}

impl Default for Filter<'static> {
    fn default() -> Self {
        Filter {
            pattern: &EMBED,
            wrappers: WRAPPERS,
        }
    }
}

impl<'a> Filter<'a> {
    pub fn new(pattern: &'a Regex, wrappers: &'a [Wrapper]) -> Filter<'a> {
        Filter { pattern, wrappers }
    }

    /// Replaces each fragment matching the filter's pattern, left to right,
    /// with a fresh token. Identical fragments get distinct tokens.
    pub fn preserve(&self, text: &str) -> (String, Placeholders) {
        let marker = unique_marker(text);
        let mut out = String::with_capacity(text.len());
        let mut placeholders = Vec::new();
        let mut last = 0;
        for m in self.pattern.find_iter(text) {
            let token = format!("{}{}{}", marker, placeholders.len(), marker);
            out.push_str(&text[last..m.start()]);
            out.push_str(&token);
            placeholders.push((token, m.as_str().to_owned()));
            last = m.end();
        }
        out.push_str(&text[last..]);
        (out, Placeholders(placeholders))
    }

    /// Substitutes every recorded fragment back into `text`, consuming the
    /// placeholders.
    pub fn restore(&self, text: &str, placeholders: Placeholders) -> Restored {
        let mut out = text.to_owned();
        let mut missing = Vec::new();
        for (token, fragment) in placeholders.0 {
            let found = self.wrappers.iter().find_map(|wrapper| {
                let form = wrapper.wrap(&token);
                out.find(&form).map(|start| start..start + form.len())
            });
            match found {
                Some(range) => out.replace_range(range, &fragment),
                None => missing.push(token),
            }
        }
        Restored { text: out, missing }
    }
}

// Picks a marker word absent from `text` so tokens can't collide with
// content.
fn unique_marker(text: &str) -> String {
    let mut marker = MARKER.to_owned();
    while text.contains(&marker) {
        marker.push('X');
    }
    marker
}
