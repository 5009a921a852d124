//! Keyword matching policy.
//!
//! Case-insensitive substring containment, nothing cleverer — operators
//! write keywords as literal phrases ("house cleaner", "pipe leak"). The
//! tie-break when several keywords hit the same post is load-bearing: the
//! first keyword in the caller-supplied ordering wins and becomes the
//! match's `matched_text`, and matching stops for that post. Which Match
//! row gets created under ambiguity depends on it.

use crate::types::Keyword;

/// Whether `post_text` contains `keyword_text`, case-insensitively.
/// Empty post text or empty keyword text never matches.
pub fn matches(post_text: &str, keyword_text: &str) -> bool {
    if post_text.is_empty() || keyword_text.is_empty() {
        return false;
    }
    post_text
        .to_lowercase()
        .contains(&keyword_text.to_lowercase())
}

/// First keyword in `keywords` that matches `post_text`. A post is
/// associated with at most one keyword per scrape.
pub fn first_match<'a>(post_text: &str, keywords: &'a [Keyword]) -> Option<&'a Keyword> {
    keywords.iter().find(|k| matches(post_text, &k.text))
}
