use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Rejection of a settings update. The stored settings are untouched when
/// any of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("poll_interval_seconds must be >= 10 (got {0})")]
    PollIntervalTooShort(u64),

    #[error("request_timeout_seconds must be >= 1 (got {0})")]
    RequestTimeoutTooShort(u64),

    #[error("products_per_page must be >= 1")]
    ProductsPerPageZero,

    #[error("max_images_per_item must be <= {max} (got {got})")]
    TooManyImagesPerItem { got: usize, max: usize },

    #[error("valuation_interval_minutes must be >= 1")]
    ValuationIntervalZero,

    #[error("listing_url must not be empty")]
    EmptyListingUrl,
}
