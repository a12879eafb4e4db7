use thiserror::Error;

/// Failures surfaced by fetches, races and resolvers.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any network call.
    #[error("invalid zipcode: {0:?}")]
    Validation(String),

    /// Connection-level failure inside a single fetch attempt.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The provider answered with a non-success status code.
    #[error("{url} responded with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// The provider answered successfully but reported no data.
    #[error("{provider} could not find {subject}")]
    NotFound { provider: &'static str, subject: String },

    #[error("invalid API key provided for {provider}")]
    InvalidCredential { provider: &'static str },

    #[error("failed to parse {provider} response: {source}")]
    Decode {
        provider: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Error> },

    /// Every race candidate failed; carries the last error received.
    #[error("all {attempted} sources failed, last was {source_name}: {last}")]
    AllCandidatesFailed {
        attempted: usize,
        source_name: String,
        last: Box<Error>,
    },

    #[error("no candidates to race")]
    NoCandidates,
}

impl Error {
    /// Whether the fetch layer may try the same operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Status { .. })
    }

    pub fn is_deadline(&self) -> bool {
        matches!(self, Error::DeadlineExceeded)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
