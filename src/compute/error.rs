#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to `{url}` failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("resource `{resource}` not found")]
    NotFound { resource: String },
    #[error("`{url}` answered with status {code}: {body}")]
    Status { url: String, code: u16, body: String },
    #[error("failed to decode response from `{url}`: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid payload from `{url}`: {reason}")]
    InvalidPayload { url: String, reason: String },
    #[error(transparent)]
    Resource(#[from] crate::resource::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
