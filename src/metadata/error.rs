pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned when fetching a value from the metadata server.
///
/// [`FetchError::Unreachable`] is the expected outcome outside of Compute Engine
/// and callers usually translate it into "not in cloud". It is only returned when
/// no connection could be made. The other variants mean a server was there but
/// its answer is missing or cannot be trusted.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("metadata server unreachable while fetching `{path}`: {source}")]
    Unreachable {
        path: String,
        #[source]
        source: BoxError,
    },
    #[error("request for `{path}` failed after connecting: {source}")]
    Request {
        path: String,
        #[source]
        source: BoxError,
    },
    #[error("metadata server answered `{path}` with status {code}")]
    Status { path: String, code: u16 },
    #[error("malformed metadata response for `{path}`: {reason}")]
    Malformed { path: String, reason: String },
}

impl FetchError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
