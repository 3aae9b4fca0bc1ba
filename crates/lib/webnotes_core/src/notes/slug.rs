//! Slug derivation.

use rand::{Rng, rng};

/// Longest slug derived from a title.
pub const MAX_SLUG_LEN: usize = 12;

/// Length of the random slug used when a title has nothing usable.
pub const FALLBACK_LEN: usize = 8;

/// Length of the last-resort random slug.
pub const RANDOM_SLUG_LEN: usize = 16;

/// Suffix lengths tried, in order, after the base slug collides.
pub const SUFFIX_LENS: [usize; 2] = [4, 8];

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Random lowercase base-32 token.
pub fn random_token(len: usize) -> String {
    let mut rng = rng();
    (0..len)
        .map(|_| char::from(BASE32_ALPHABET[rng.random_range(0..BASE32_ALPHABET.len())]))
        .collect()
}

/// Normalize a title into a slug base. May return an empty string.
///
/// Letters and digits are kept, whitespace, `_` and `-` become a single `-`,
/// everything else is dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.trim().to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if (c == '-' || c == '_' || c.is_whitespace())
            && !slug.is_empty()
            && !slug.ends_with('-')
        {
            slug.push('-');
        }
    }
    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// Slug for a new note: the slugified title, or a random token when the title
/// yields nothing.
pub fn derive_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        random_token(FALLBACK_LEN)
    } else {
        slug
    }
}

/// Slugs to try for a new note, in order, until one is free.
pub fn candidates(base: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(SUFFIX_LENS.len() + 2);
    out.push(base.to_string());
    for len in SUFFIX_LENS {
        out.push(format!("{base}-{}", random_token(len)));
    }
    out.push(random_token(RANDOM_SLUG_LEN));
    out
}
