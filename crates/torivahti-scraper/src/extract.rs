//! Pure field extraction from Tori.fi page text.
//!
//! The markup mixes embedded JSON, semantic HTML, and ad-hoc class names
//! across page variants, so every field carries an ordered list of candidate
//! patterns: structured embedded data first, semantic class/attribute hints
//! next, generic fallbacks last. The first pattern yielding a non-empty
//! match (after cleaning) wins. A field where every pattern misses is
//! recorded as a note in the record's `errors`, never as a hard failure.
//!
//! No I/O and no shared mutable state: safe to call concurrently.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use torivahti_core::ItemRecord;

use crate::clean::clean_text;

/// Item links on listing pages. Capture group 1 is the numeric id.
static ITEM_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href=["'][^"']*?/recommerce/forsale/item/(\d+)"#).expect("valid id regex")
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid title regex"));

static DESCRIPTION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"(?i)<meta\s+property="og:description"\s+content="([^"]*)""#,
        r#"(?i)<meta\s+name="description"\s+content="([^"]*)""#,
    ])
});

static LOCATION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"(?i)"location"\s*:\s*"([^"]+)""#,
        r"(?i)<span[^>]*location[^>]*>([^<]+)</span>",
        r#"(?i)class="[^"]*location[^"]*"[^>]*>([^<]+)<"#,
        r#"(?i)"address"[^}]*"locality"\s*:\s*"([^"]+)""#,
    ])
});

static SELLER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"(?i)"seller"[^}]*"name"\s*:\s*"([^"]+)""#,
        r#"(?i)"sellerName"\s*:\s*"([^"]+)""#,
        r"(?i)<span[^>]*seller[^>]*>([^<]+)</span>",
        r#"(?i)class="[^"]*seller[^"]*"[^>]*>([^<]+)<"#,
        r#"(?i)"advertiser"[^}]*"name"\s*:\s*"([^"]+)""#,
    ])
});

/// Image pattern tiers, highest confidence first: structured product-image
/// keys, then gallery attributes, then a generic embedded `"image"` key.
static IMAGE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r#"(?i)"mainImage"\s*:\s*"(https://[^"]+\.(?:jpg|jpeg|png|webp)[^"]*)""#,
        r#"(?i)"imageUrl"\s*:\s*"(https://[^"]+\.(?:jpg|jpeg|png|webp)[^"]*)""#,
        r#"(?i)"productImage"\s*:\s*"(https://[^"]+\.(?:jpg|jpeg|png|webp)[^"]*)""#,
        r#"(?i)data-src="(https://[^"]*(?:images|img)[^"]*\.(?:jpg|jpeg|png|webp)[^"]*)""#,
        r#"(?i)src="(https://[^"]*(?:images|img)[^"]*\.(?:jpg|jpeg|png|webp)[^"]*)""#,
        r#"(?i)"image"\s*:\s*"(https://[^"]+\.(?:jpg|jpeg|png|webp)[^"]*)""#,
    ])
});

static IMAGE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)(\?|$)").expect("valid ext regex"));

/// Ad/UI asset markers; any URL containing one of these is dropped.
const IMAGE_DENYLIST: &[&str] = &[
    "banner",
    "advertisement",
    "promo",
    "logo",
    "icon",
    "avatar",
    "thumbnail",
    "watermark",
    "overlay",
];

const TRUSTED_DOMAIN_HINTS: &[&str] = &["tori.fi", "tor.se", "images"];

pub const MAX_IMAGES: usize = 5;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid extraction regex"))
        .collect()
}

/// All item ids linked from a listing page, as a set (duplicates removed,
/// order not significant).
#[must_use]
pub fn extract_item_ids(html: &str) -> BTreeSet<String> {
    ITEM_ID_RE
        .captures_iter(html)
        .map(|c| c[1].to_owned())
        .collect()
}

/// Extracts a detail record for `item_id` from its page text.
///
/// Total function: every field that cannot be extracted leaves its slot
/// `None`/empty and appends a descriptive note to the record's `errors`;
/// the returned record is always well-formed.
#[must_use]
pub fn extract_item(html: &str, item_id: &str) -> ItemRecord {
    let mut record = ItemRecord::empty(item_id, Utc::now());
    let mut errors: Vec<String> = Vec::new();

    record.title = TITLE_RE
        .captures(html)
        .and_then(|c| clean_text(&c[1]));
    if record.title.is_none() {
        errors.push("Failed to extract title".to_owned());
    }

    record.description = first_match(&DESCRIPTION_RES, html);
    if record.description.is_none() {
        errors.push("Failed to extract description".to_owned());
    }

    record.location = first_match(&LOCATION_RES, html);
    if record.location.is_none() {
        errors.push("Failed to extract location".to_owned());
    }

    record.seller = first_match(&SELLER_RES, html);
    if record.seller.is_none() {
        errors.push(seller_failure_note(html));
    }

    record.images = extract_images(html);
    if record.images.is_empty() {
        errors.push("No images found".to_owned());
    }

    if !errors.is_empty() {
        record.errors = Some(errors);
    }
    record
}

/// First pattern whose match survives cleaning wins.
fn first_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(html).and_then(|c| clean_text(&c[1])))
}

/// Distinguishes "the seller block was there but we could not parse it"
/// from "the page hides seller info behind a login".
fn seller_failure_note(html: &str) -> String {
    let lower = html.to_lowercase();
    if lower.contains("logged") || lower.contains("profile") {
        "Seller info available but extraction failed (logged in user)".to_owned()
    } else {
        "Seller info not available (login required)".to_owned()
    }
}

/// Scans all pattern tiers, filters out ad/UI assets and untrusted hosts,
/// and deduplicates by exact URL preserving first-seen order, capped at
/// [`MAX_IMAGES`].
fn extract_images(html: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut images = Vec::new();

    for re in IMAGE_RES.iter() {
        for caps in re.captures_iter(html) {
            let url = &caps[1];
            if !is_acceptable_image_url(url) {
                continue;
            }
            if images.len() >= MAX_IMAGES {
                return images;
            }
            if seen.insert(url.to_owned()) {
                images.push(url.to_owned());
            }
        }
    }
    images
}

/// Image URL filter: https, trusted domain hint, allowed raster extension,
/// and no denylisted ad/UI substring.
#[must_use]
pub fn is_acceptable_image_url(url: &str) -> bool {
    if !url.starts_with("https://") {
        return false;
    }
    if !TRUSTED_DOMAIN_HINTS.iter().any(|hint| url.contains(hint)) {
        return false;
    }
    let lower = url.to_lowercase();
    if IMAGE_DENYLIST.iter().any(|term| lower.contains(term)) {
        return false;
    }
    IMAGE_EXT_RE.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_extraction_deduplicates() {
        let html = r#"
            <a href="/recommerce/forsale/item/111">one</a>
            <a href="/recommerce/forsale/item/222">two</a>
            <a href="/recommerce/forsale/item/111">one again</a>
        "#;
        let ids = extract_item_ids(html);
        assert_eq!(
            ids,
            BTreeSet::from(["111".to_owned(), "222".to_owned()])
        );
    }

    #[test]
    fn id_extraction_handles_absolute_urls_and_single_quotes() {
        let html = r"<a href='https://www.tori.fi/recommerce/forsale/item/987654'>x</a>";
        assert!(extract_item_ids(html).contains("987654"));
    }

    #[test]
    fn empty_page_yields_no_ids() {
        assert!(extract_item_ids("<html><body>nothing here</body></html>").is_empty());
    }

    #[test]
    fn title_spans_multiple_lines_and_is_cleaned() {
        let html = "<h1 class=\"heading\">\n  Hieno\n  <b>sohva</b>\n</h1>";
        let record = extract_item(html, "1");
        assert_eq!(record.title.as_deref(), Some("Hieno sohva"));
    }

    #[test]
    fn description_prefers_og_over_generic_meta() {
        let html = r#"
            <meta name="description" content="generic">
            <meta property="og:description" content="structured">
        "#;
        let record = extract_item(html, "1");
        assert_eq!(record.description.as_deref(), Some("structured"));
    }

    #[test]
    fn description_falls_back_to_generic_meta() {
        let html = r#"<meta name="description" content="only generic">"#;
        let record = extract_item(html, "1");
        assert_eq!(record.description.as_deref(), Some("only generic"));
    }

    #[test]
    fn location_from_embedded_json_key() {
        let html = r#"<script>{"location": "Tampere"}</script>"#;
        let record = extract_item(html, "1");
        assert_eq!(record.location.as_deref(), Some("Tampere"));
    }

    #[test]
    fn location_from_class_hint_when_json_absent() {
        let html = r#"<div class="item-location-row">Espoo<"#;
        let record = extract_item(html, "1");
        assert_eq!(record.location.as_deref(), Some("Espoo"));
    }

    #[test]
    fn seller_from_nested_json() {
        let html = r#"{"seller": {"id": 9, "name": "Matti M."}}"#;
        let record = extract_item(html, "1");
        assert_eq!(record.seller.as_deref(), Some("Matti M."));
    }

    #[test]
    fn missing_seller_notes_login_requirement() {
        let record = extract_item("<h1>t</h1>", "1");
        let errors = record.errors.expect("errors recorded");
        assert!(
            errors
                .iter()
                .any(|e| e.contains("login required")),
            "expected login-required note, got: {errors:?}"
        );
    }

    #[test]
    fn missing_seller_on_logged_in_page_notes_extraction_failure() {
        let record = extract_item("<h1>t</h1><div>profile</div>", "1");
        let errors = record.errors.expect("errors recorded");
        assert!(
            errors
                .iter()
                .any(|e| e.contains("extraction failed (logged in user)")),
            "expected logged-in note, got: {errors:?}"
        );
    }

    #[test]
    fn clean_extraction_leaves_errors_absent() {
        let html = r#"
            <h1>Sohva</h1>
            <meta property="og:description" content="Hyvä kunto">
            <script>{"location": "Helsinki", "seller": {"name": "Liisa"},
                     "mainImage": "https://images.tori.fi/a.jpg"}</script>
        "#;
        let record = extract_item(html, "42");
        assert!(record.errors.is_none(), "got: {:?}", record.errors);
        assert_eq!(record.id, "42");
        assert_eq!(
            record.url,
            "https://www.tori.fi/recommerce/forsale/item/42"
        );
    }

    #[test]
    fn garbage_page_yields_well_formed_record_with_notes() {
        let record = extract_item("\u{0}\u{1} not html at all", "77");
        assert_eq!(record.id, "77");
        assert!(record.title.is_none());
        assert!(record.images.is_empty());
        let errors = record.errors.expect("errors recorded");
        assert!(errors.len() >= 4, "got: {errors:?}");
    }

    #[test]
    fn image_filter_rejects_denylisted_and_untrusted() {
        assert!(is_acceptable_image_url(
            "https://images.tori.fi/item/photo.jpg"
        ));
        assert!(is_acceptable_image_url(
            "https://images.tori.fi/item/photo.webp?w=800"
        ));
        // Denylisted substrings.
        assert!(!is_acceptable_image_url(
            "https://images.tori.fi/banner.jpg"
        ));
        assert!(!is_acceptable_image_url(
            "https://images.tori.fi/user-avatar.png"
        ));
        // Untrusted host without any hint.
        assert!(!is_acceptable_image_url("https://evil.example/photo.jpg"));
        // Wrong scheme and extension.
        assert!(!is_acceptable_image_url("http://images.tori.fi/photo.jpg"));
        assert!(!is_acceptable_image_url("https://images.tori.fi/photo.svg"));
    }

    #[test]
    fn images_deduplicate_preserving_first_seen_order_capped_at_five() {
        let html = r#"
            {"mainImage": "https://images.tori.fi/1.jpg"}
            {"imageUrl": "https://images.tori.fi/2.jpg"}
            {"imageUrl": "https://images.tori.fi/1.jpg"}
            <img data-src="https://images.tori.fi/3.jpg">
            <img src="https://images.tori.fi/4.jpg">
            {"image": "https://images.tori.fi/5.jpg"}
            {"image": "https://images.tori.fi/6.jpg"}
        "#;
        let record = extract_item(html, "1");
        assert_eq!(
            record.images,
            vec![
                "https://images.tori.fi/1.jpg",
                "https://images.tori.fi/2.jpg",
                "https://images.tori.fi/3.jpg",
                "https://images.tori.fi/4.jpg",
                "https://images.tori.fi/5.jpg",
            ]
        );
    }

    #[test]
    fn near_duplicate_urls_with_query_strings_stay_distinct() {
        let html = r#"
            {"mainImage": "https://images.tori.fi/1.jpg"}
            {"imageUrl": "https://images.tori.fi/1.jpg?w=400"}
        "#;
        let record = extract_item(html, "1");
        assert_eq!(record.images.len(), 2);
    }
}
