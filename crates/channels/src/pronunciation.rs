//! Literal find/replace rules applied before text is spoken.

use std::borrow::Cow;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

/// An ordered set of literal `find -> replace` pairs.
///
/// Matching scans left to right without overlaps. When several pairs match
/// at the same position, the one listed first wins. Replaced text is never
/// rescanned.
#[derive(Debug, Clone, Default)]
pub struct Pronunciation {
    matcher: Option<Regex>,
    replacements: Vec<String>,
}

impl Pronunciation {
    /// Build from a flat `[find, replace, find, replace, ...]` list.
    ///
    /// An odd-length list is rejected. Pairs with an empty find text are
    /// skipped.
    pub fn new<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        if pairs.len() % 2 == 1 {
            return Err(Error::UnpairedPronunciation { len: pairs.len() });
        }

        let mut alternatives = Vec::with_capacity(pairs.len() / 2);
        let mut replacements = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks_exact(2) {
            let find = pair[0].as_ref();
            if find.is_empty() {
                continue;
            }
            // One capture group per pair; alternation order is priority order.
            alternatives.push(format!("({})", regex::escape(find)));
            replacements.push(pair[1].as_ref().to_owned());
        }

        if alternatives.is_empty() {
            return Ok(Self::default());
        }

        Ok(Self {
            matcher: Some(Regex::new(&alternatives.join("|"))?),
            replacements,
        })
    }

    /// Number of active pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Apply every pair to `text`.
    #[must_use]
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let Some(matcher) = &self.matcher else {
            return Cow::Borrowed(text);
        };
        matcher.replace_all(text, |caps: &Captures<'_>| {
            (1..caps.len())
                .find(|&group| caps.get(group).is_some())
                .and_then(|group| self.replacements.get(group - 1))
                .map_or("", String::as_str)
        })
    }
}
