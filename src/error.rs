use thiserror::Error;

/// Errors that can occur while relaying webhook events
/// Ledger mutations are never retried internally; failures propagate to the
/// HTTP boundary after admission has already been recorded
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("ledger API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("ledger request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),

    #[error("split {journal_id} has type '{split_type}' which cannot be inverted")]
    AmbiguousSplitType { journal_id: u64, split_type: String },

    #[error("claim journal IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("claim journal entry could not be decoded: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
