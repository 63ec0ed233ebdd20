// URL slugs for completed works

use chrono::NaiveDate;

/// Number of numeric suffixes tried before giving up on a unique slug
pub const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Lowercase `input`, keep alphanumerics (any script) and collapse every
/// other run of characters into a single `-`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Base slug for a work: brand, model and ISO date
pub fn work_slug(brand: &str, model: &str, work_date: NaiveDate) -> String {
    slugify(&format!("{} {} {}", brand, model, work_date.format("%Y-%m-%d")))
}

/// Candidate for the given collision attempt: the base itself, then `base-1`, `base-2`, ...
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
