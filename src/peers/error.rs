use super::SubscriptionId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("listener {id} failed: {message}")]
    Listener { id: SubscriptionId, message: String },
    #[error("failed to refresh peers: {0}")]
    Refresh(#[from] crate::compute::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
