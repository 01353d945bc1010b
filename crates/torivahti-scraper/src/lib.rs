pub mod clean;
pub mod client;
pub mod error;
pub mod extract;
pub mod pagination;

pub use client::{FetchPolicy, ToriClient};
pub use error::FetchError;
pub use extract::{extract_item, extract_item_ids};
pub use pagination::{listing_page_url, pages_needed};
