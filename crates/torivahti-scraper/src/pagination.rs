//! Listing pagination helpers.

/// Builds the listing URL for an explicit page index. Page 1 (or `None`)
/// is the bare listing URL; later pages get a `page=N` query parameter,
/// appended with `&` when the URL already carries a query string.
#[must_use]
pub fn listing_page_url(listing_url: &str, page: Option<u32>) -> String {
    match page {
        Some(p) if p > 1 => {
            let sep = if listing_url.contains('?') { '&' } else { '?' };
            format!("{listing_url}{sep}page={p}")
        }
        _ => listing_url.to_owned(),
    }
}

/// Number of listing pages needed to cover `num_products` items at
/// `products_per_page` per page (ceiling division).
#[must_use]
pub fn pages_needed(num_products: u32, products_per_page: u32) -> u32 {
    if products_per_page == 0 {
        return 0;
    }
    num_products.div_ceil(products_per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_is_bare_url() {
        assert_eq!(
            listing_page_url("https://example.com/search?sort=NEW", None),
            "https://example.com/search?sort=NEW"
        );
        assert_eq!(
            listing_page_url("https://example.com/search?sort=NEW", Some(1)),
            "https://example.com/search?sort=NEW"
        );
    }

    #[test]
    fn later_pages_append_with_ampersand_when_query_exists() {
        assert_eq!(
            listing_page_url("https://example.com/search?sort=NEW", Some(3)),
            "https://example.com/search?sort=NEW&page=3"
        );
    }

    #[test]
    fn later_pages_append_with_question_mark_otherwise() {
        assert_eq!(
            listing_page_url("https://example.com/search", Some(2)),
            "https://example.com/search?page=2"
        );
    }

    #[test]
    fn pages_needed_is_ceiling_division() {
        assert_eq!(pages_needed(100, 50), 2);
        assert_eq!(pages_needed(101, 50), 3);
        assert_eq!(pages_needed(1, 50), 1);
        assert_eq!(pages_needed(0, 50), 0);
    }
}
