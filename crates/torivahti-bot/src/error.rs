use thiserror::Error;

/// Failures of a whole poll cycle. Per-item failures inside a cycle are
/// logged and skipped; only a failure that makes the cycle itself useless
/// (the listing fetch, or persisting) surfaces here.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Fetch(#[from] torivahti_scraper::FetchError),

    #[error(transparent)]
    Store(#[from] torivahti_store::StoreError),
}
