use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed")]
    Connect { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response from {url} is not a decodable image")]
    InvalidImage { url: String },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Classifies a `reqwest` failure into the timeout/connect/other
    /// taxonomy, keeping the offending URL in the message.
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_owned(),
            }
        } else if err.is_connect() {
            FetchError::Connect {
                url: url.to_owned(),
            }
        } else {
            FetchError::Http(err)
        }
    }
}
