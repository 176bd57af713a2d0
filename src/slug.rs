//! Headline slugs and their disambiguation against stored rows.
//!
//! A base slug is the first three words of the headline, joined, lowercased,
//! reduced to `[a-z]` and cut to [`MAX_BASE_LEN`] characters. Collisions get
//! `-1`, `-2`, ... in the order headlines are processed.

use crate::store::{ArticleStore, StoreError};
use thiserror::Error;
use tracing::{debug, instrument};

/// Number of leading headline words that make up a base slug.
const SLUG_WORDS: usize = 3;

/// Longest base slug kept; `Global Climate Talks` becomes `globalclimate`.
pub const MAX_BASE_LEN: usize = 13;

/// Highest numeric suffix tried before giving up on a headline.
pub const MAX_SUFFIX: u32 = 1_000;

#[derive(Debug, Error)]
pub enum SlugError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no free slug for base {base:?} after {tried} suffixes")]
    Exhausted { base: String, tried: u32 },
}

/// Base slug for a headline; may be empty if the first words have no letters.
pub fn base_slug(headline: &str) -> String {
    headline
        .split_whitespace()
        .take(SLUG_WORDS)
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_lowercase)
        .take(MAX_BASE_LEN)
        .collect()
}

/// `base` for `n == 0`, `base-n` otherwise.
fn with_suffix(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{base}-{n}")
    }
}

/// First slug derived from `headline` that no stored row uses.
///
/// Each probe is a store round-trip. Store errors propagate; running past
/// `max_suffix` yields [`SlugError::Exhausted`].
#[instrument(level = "debug", skip(store))]
pub async fn ensure_unique_slug<S: ArticleStore>(
    store: &mut S,
    headline: &str,
    max_suffix: u32,
) -> Result<String, SlugError> {
    let base = base_slug(headline);

    for n in 0..=max_suffix {
        let candidate = with_suffix(&base, n);
        if !store.slug_exists(&candidate).await? {
            debug!(slug = %candidate, "Reserved slug");
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted {
        base,
        tried: max_suffix,
    })
}
