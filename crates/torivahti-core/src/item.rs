//! Domain types for discovered listings and their valuations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base URL for per-item detail pages; the numeric id is appended.
pub const ITEM_URL_BASE: &str = "https://www.tori.fi/recommerce/forsale/item/";

/// Builds the canonical detail-page URL for an item id.
#[must_use]
pub fn item_url(id: &str) -> String {
    format!("{ITEM_URL_BASE}{id}")
}

/// One discovered listing. Created once on first discovery; thereafter only
/// mutated in place (`image_files` populated, `valuation` attached). The
/// `id` is the unique key and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub seller: Option<String>,
    /// Up to 5 unique image URLs in first-seen order.
    #[serde(default)]
    pub images: Vec<String>,
    /// Locally stored filenames; at most one per entry in `images`, fewer
    /// when downloads fail.
    #[serde(default)]
    pub image_files: Vec<String>,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Human-readable extraction-failure notes; absent when extraction was
    /// clean.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<ValuationResult>,
}

impl ItemRecord {
    /// A fresh record for `id` with every extractable field absent.
    /// Used both as the starting point for extraction and as the
    /// well-formed fallback when extraction blows up entirely.
    #[must_use]
    pub fn empty(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_owned(),
            url: item_url(id),
            title: None,
            description: None,
            location: None,
            seller: None,
            images: Vec::new(),
            image_files: Vec::new(),
            discovered_at: now,
            updated_at: now,
            errors: None,
            valuation: None,
        }
    }

    /// An item needs valuation until a valuation attempt has settled:
    /// no valuation at all, or one still marked pending.
    #[must_use]
    pub fn needs_valuation(&self) -> bool {
        match &self.valuation {
            None => true,
            Some(v) => v.status == ValuationStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuationStatus {
    Completed,
    Error,
    Pending,
}

/// Outcome of one valuation attempt against the text-generation API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    pub status: ValuationStatus,
    /// Free-form valuation narrative; present only when completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Estimated price when new, parsed from the `HINTA_UUTENA:` label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_new: Option<i64>,
    /// Estimated current value, parsed from the `ARVO_NYT:` label (or the
    /// legacy `ARVO:` label).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_current: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Failure description; present only when status is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValuationResult {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ValuationStatus::Error,
            text: None,
            price_new: None,
            price_current: None,
            model: None,
            timestamp: Utc::now(),
            message: Some(message.into()),
        }
    }
}
