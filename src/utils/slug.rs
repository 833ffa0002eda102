/// Turn a title into a URL slug: lowercase alphanumerics joined by single dashes.
///
/// Returns an empty string when the title has no alphanumeric characters.
#[must_use]
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Use the caller's slug if it has any content, otherwise derive one from the title.
#[must_use]
pub fn slug_or_title(slug: Option<&str>, title: &str) -> String {
    slug.map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| slugify(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Intro to Rust"), "intro-to-rust");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("  Ownership & Borrowing!! (Part 2) "), "ownership-borrowing-part-2");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slug_or_title() {
        assert_eq!(slug_or_title(None, "Async Rust"), "async-rust");
        assert_eq!(slug_or_title(Some("Custom Slug"), "Async Rust"), "custom-slug");
        assert_eq!(slug_or_title(Some("   "), "Async Rust"), "async-rust");
    }
}
