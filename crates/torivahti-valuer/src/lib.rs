pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;

pub use client::Valuer;
pub use error::ValuerError;
pub use parse::parse_prices;
pub use prompt::{GiveawayPromptBuilder, PromptBuilder};
