//! Labeled-price extraction from valuation narratives.
//!
//! The model is prompted to answer with two labeled lines, each with an
//! optional euro suffix:
//!
//! ```text
//! HINTA_UUTENA: 50€
//! ARVO_NYT: 20€
//! ```
//!
//! Older prompts used a single `ARVO:` label; that format is still
//! accepted for the current value when `ARVO_NYT` is absent. A narrative
//! without any label is not an error — the prices are simply unknown.

use std::sync::LazyLock;

use regex::Regex;

static PRICE_NEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)HINTA_UUTENA:\s*(\d+)€?").expect("valid price regex"));
static PRICE_CURRENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ARVO_NYT:\s*(\d+)€?").expect("valid price regex"));
static PRICE_LEGACY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ARVO:\s*(\d+)€?").expect("valid price regex"));

/// Returns `(price_new, price_current)` parsed from `text`.
#[must_use]
pub fn parse_prices(text: &str) -> (Option<i64>, Option<i64>) {
    let price_new = capture_price(&PRICE_NEW_RE, text);
    let price_current =
        capture_price(&PRICE_CURRENT_RE, text).or_else(|| capture_price(&PRICE_LEGACY_RE, text));
    (price_new, price_current)
}

fn capture_price(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text).and_then(|c| c[1].parse::<i64>().ok())
}
