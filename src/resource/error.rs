#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid instance url: {0}")]
    InvalidInstanceUrl(String),
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),
}
pub type Result<T> = std::result::Result<T, Error>;
