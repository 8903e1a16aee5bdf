use std::time::Duration;

use crate::metadata::FetchError;

/// Errors that may occur during environment detection.
///
/// An unreachable metadata server is not an error: it means the process is not
/// running on Compute Engine and detection completes with a local identity.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to query the metadata server: {0}")]
    Transport(#[source] FetchError),
    #[error("failed to run `{command}`: {source}")]
    HostnameCommand {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    HostnameStatus {
        command: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("`{command}` did not finish within {timeout:?}")]
    HostnameTimeout {
        command: &'static str,
        timeout: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
