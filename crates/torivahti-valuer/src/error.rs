use thiserror::Error;

/// Internal failure taxonomy for the valuation client. These never cross
/// the crate boundary as `Err`: [`crate::Valuer::valuate`] converts them
/// into a `ValuationResult` with error status so a bad API response can
/// never kill the valuation cycle.
#[derive(Debug, Error)]
pub enum ValuerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from valuation API: {body}")]
    Status { status: u16, body: String },

    #[error("valuation API response had no message content")]
    EmptyResponse,

    #[error("malformed valuation API response: {0}")]
    Deserialize(#[from] serde_json::Error),
}
