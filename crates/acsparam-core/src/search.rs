// ── Keyword search ──
//
// A query is split on single spaces into keywords. A row matches when
// every keyword appears in its search text, in order, case-insensitively.
// Keywords are escaped before compilation so user input is always literal.

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::model::Parameter;

/// Compiled matcher for one search query.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    keywords: Vec<String>,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    /// No keywords: every row is visible.
    All,
    Pattern(Regex),
    /// Used only if the escaped pattern exceeds the regex size limit.
    Ordered(Vec<String>),
}

impl SearchFilter {
    pub fn new(query: &str) -> Self {
        let keywords: Vec<String> = query
            .split(' ')
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if keywords.is_empty() {
            return Self {
                keywords,
                matcher: Matcher::All,
            };
        }

        let pattern = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join(".*");

        let matcher = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => Matcher::Pattern(re),
            Err(e) => {
                warn!(error = %e, "search pattern rejected, matching keywords directly");
                Matcher::Ordered(keywords.iter().map(|k| k.to_lowercase()).collect())
            }
        };

        Self { keywords, matcher }
    }

    /// Whether this filter hides anything at all.
    pub fn is_active(&self) -> bool {
        !matches!(self.matcher, Matcher::All)
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Test a row's composite search text.
    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::All => true,
            Matcher::Pattern(re) => re.is_match(text),
            Matcher::Ordered(keywords) => {
                let haystack = text.to_lowercase();
                let mut rest = haystack.as_str();
                keywords.iter().all(|k| match rest.find(k.as_str()) {
                    Some(at) => {
                        rest = &rest[at + k.len()..];
                        true
                    }
                    None => false,
                })
            }
        }
    }

    /// Test a parameter row: its key plus its value text, if any.
    pub fn matches_parameter(&self, key: &str, parameter: &Parameter) -> bool {
        !self.is_active() || self.matches(&search_text(key, parameter))
    }
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self::new("")
    }
}

/// `"<key> <value>"`, or just the key when the parameter has no truthy value.
pub fn search_text<'a>(key: &'a str, parameter: &Parameter) -> Cow<'a, str> {
    match parameter.value_text() {
        Some(value) => Cow::Owned(format!("{key} {value}")),
        None => Cow::Borrowed(key),
    }
}
