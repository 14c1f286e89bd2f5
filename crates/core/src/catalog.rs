//! Catalog rules: slugs, tags, prices and sort orders.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::CoreError;
use crate::types::Cents;

/// Maximum number of tags on one product.
pub const MAX_TAGS_PER_PRODUCT: usize = 20;

/// Maximum length of a single normalized tag.
pub const MAX_TAG_LENGTH: usize = 40;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

static SLUG_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Turn a display name into a URL slug.
///
/// `"Vitamin D3 + K2 (5000 IU)"` becomes `"vitamin-d3-k2-5000-iu"`.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Validate a caller-supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if SLUG_SHAPE.is_match(slug) && slug.len() <= 160 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid slug '{slug}'. Use lowercase letters, digits and single dashes"
        )))
    }
}

/// Normalize one tag: trimmed, lowercase, inner whitespace collapsed to `-`.
pub fn normalize_tag(tag: &str) -> String {
    tag.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Normalize a tag list, dropping empties and duplicates (first occurrence wins).
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, CoreError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let normalized = normalize_tag(tag);
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        if normalized.len() > MAX_TAG_LENGTH {
            return Err(CoreError::Validation(format!(
                "Tag '{normalized}' exceeds {MAX_TAG_LENGTH} characters"
            )));
        }
        out.push(normalized);
    }
    if out.len() > MAX_TAGS_PER_PRODUCT {
        return Err(CoreError::Validation(format!(
            "A product may have at most {MAX_TAGS_PER_PRODUCT} tags"
        )));
    }
    Ok(out)
}

pub fn validate_price(price_cents: Cents) -> Result<(), CoreError> {
    if price_cents < 0 {
        return Err(CoreError::Validation("Price must not be negative".into()));
    }
    Ok(())
}

pub fn validate_stock(stock: i32) -> Result<(), CoreError> {
    if stock < 0 {
        return Err(CoreError::Validation("Stock must not be negative".into()));
    }
    Ok(())
}

/// Validate an optional `[min, max]` price window from query parameters.
pub fn validate_price_range(min: Option<Cents>, max: Option<Cents>) -> Result<(), CoreError> {
    if let Some(min) = min {
        validate_price(min)?;
    }
    if let Some(max) = max {
        validate_price(max)?;
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(CoreError::Validation(
                "min_price must not exceed max_price".into(),
            ));
        }
    }
    Ok(())
}

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// SQL `ORDER BY` fragment. Always ends with `id` for a stable order.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price_cents ASC, id ASC",
            Self::PriceDesc => "price_cents DESC, id DESC",
            Self::Name => "name ASC, id ASC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Vitamin D3 + K2 (5000 IU)"), "vitamin-d3-k2-5000-iu");
        assert_eq!(slugify("  Omega-3  "), "omega-3");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_output_is_a_valid_slug() {
        let slug = slugify("Ashwagandha Root Extract");
        assert!(validate_slug(&slug).is_ok());
    }

    #[test]
    fn validate_slug_rejects_bad_shapes() {
        assert!(validate_slug("Has-Caps").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let tags = vec![
            " Sleep ".to_string(),
            "sleep".to_string(),
            "Immune   Support".to_string(),
            "".to_string(),
        ];
        assert_eq!(
            normalize_tags(&tags).unwrap(),
            vec!["sleep".to_string(), "immune-support".to_string()]
        );
    }

    #[test]
    fn too_many_tags_rejected() {
        let tags: Vec<String> = (0..=MAX_TAGS_PER_PRODUCT).map(|i| format!("t{i}")).collect();
        assert!(normalize_tags(&tags).is_err());
    }

    #[test]
    fn price_range_checks() {
        assert!(validate_price_range(Some(100), Some(200)).is_ok());
        assert!(validate_price_range(None, Some(200)).is_ok());
        assert!(validate_price_range(Some(300), Some(200)).is_err());
        assert!(validate_price_range(Some(-1), None).is_err());
    }

    #[test]
    fn negative_stock_rejected() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn sort_defaults_to_newest() {
        assert_eq!(ProductSort::default(), ProductSort::Newest);
        assert!(ProductSort::PriceAsc.order_by().starts_with("price_cents ASC"));
    }
}
