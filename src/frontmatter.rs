//! Splits page sources into a metadata header and a body, and parses the
//! header's flat `key: value` lines. The same line dialect is used for the
//! site's `_config.yml` (see [`crate::config::SiteConfig`]).

use std::collections::HashMap;

/// The line that opens and closes a front-matter block.
pub const DELIMITER: &str = "---";

/// The parsed `key: value` pairs of a header. Keys are unique; the last
/// occurrence of a duplicate key wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fields(HashMap<String, String>);

impl Fields {
    /// Parses header text. Every line containing a colon is split on its
    /// first colon; key and value are trimmed and one layer of matching
    /// quotes is removed from the value. Lines without a colon and lines with
    /// an empty key are ignored.
    pub fn parse(header: &str) -> Fields {
        let mut fields = HashMap::new();
        for line in header.lines() {
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                fields.insert(key.to_owned(), unquote(value.trim()).to_owned());
            }
        }
        Fields(fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Splits `input` into `(header, body)`. The input must open with a
/// [`DELIMITER`] line and contain a second one; the header is the text
/// between them and the body is everything after the closing delimiter line.
/// Any other input yields an empty header and the whole input as the body.
pub fn split(input: &str) -> (&str, &str) {
    let mut lines = input.split_inclusive('\n');
    let header_start = match lines.next() {
        Some(first) if is_delimiter(first) => first.len(),
        _ => return ("", input),
    };

    let mut offset = header_start;
    for line in lines {
        if is_delimiter(line) {
            return (&input[header_start..offset], &input[offset + line.len()..]);
        }
        offset += line.len();
    }
    ("", input)
}

/// Splits `input` and parses its header in one step.
pub fn parse(input: &str) -> (Fields, &str) {
    let (header, body) = split(input);
    (Fields::parse(header), body)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
