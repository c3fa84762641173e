//! URL-safe identifiers derived from display names.
//!
//! A slug keeps lowercase ASCII letters and digits. Every other character is a
//! separator, runs of separators collapse into one hyphen, and hyphens at
//! either end are dropped. When a slug is already taken a numeric suffix is
//! appended (`leg-day`, `leg-day-2`, `leg-day-3`, ...).

use chrono::{DateTime, SecondsFormat, Utc};

/// Slug used when a seed contains no letters or digits at all.
pub const PLACEHOLDER: &str = "untitled";

/// Derive the base slug for `seed`.
pub fn derive_slug(seed: &str) -> String {
    let mut slug = String::with_capacity(seed.len());
    let mut pending_separator = false;

    for c in seed.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        slug
    }
}

/// Seed for a line's slug: the exercise name followed by the creation time.
pub fn line_seed(exercise_name: &str, timestamp: &DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        exercise_name,
        timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    )
}

/// Whether `slug` is `base` itself or `base` plus a numeric collision suffix.
pub fn matches_base(slug: &str, base: &str) -> bool {
    match slug.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

/// Find the first free slug for `base`, asking `is_taken` about each candidate.
pub fn unique_slug<E>(
    base: &str,
    mut is_taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !is_taken(base)? {
        return Ok(base.to_string());
    }

    let mut n: u64 = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}
