pub mod bot;
pub mod error;

pub use bot::{Bot, FetchPagesOutcome, PollOutcome, TriggerOutcome};
pub use error::BotError;
