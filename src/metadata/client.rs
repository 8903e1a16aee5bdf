use std::time::Duration;

use reqwest::StatusCode;

use super::{FetchError, Result};

/// Host name of the metadata server as resolved from inside a VM.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR: &str = "Google";

// Outside of the cloud the connect attempt is what fails, so keep it short.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    /// Creates a client for the metadata server at `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(host: &str) -> std::result::Result<Self, reqwest::Error> {
        Self::with_base_url(format!("http://{host}/computeMetadata/v1"))
    }

    /// Creates a client that resolves metadata paths relative to `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> std::result::Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Ok(Self { client, base_url })
    }

    /// Fetches the metadata value at `path` and returns its non-blank lines.
    ///
    /// # Errors
    ///
    /// * [`FetchError::Unreachable`] if no connection could be made.
    /// * [`FetchError::Request`] if the request failed or timed out after connecting.
    /// * [`FetchError::Status`] if the server answered with anything but `200 OK`.
    /// * [`FetchError::Malformed`] if the response lacks the `Metadata-Flavor: Google`
    ///   header or its body cannot be read.
    pub async fn fetch_lines(&self, path: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        log::trace!("Fetching metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .send()
            .await
            .map_err(|source| {
                if source.is_connect() {
                    FetchError::Unreachable {
                        path: path.to_owned(),
                        source: Box::new(source),
                    }
                } else {
                    FetchError::Request {
                        path: path.to_owned(),
                        source: Box::new(source),
                    }
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                path: path.to_owned(),
                code: status.as_u16(),
            });
        }

        let flavor = response
            .headers()
            .get(METADATA_FLAVOR_HEADER)
            .and_then(|value| value.to_str().ok());
        if flavor != Some(METADATA_FLAVOR) {
            return Err(FetchError::Malformed {
                path: path.to_owned(),
                reason: format!("unexpected {METADATA_FLAVOR_HEADER} header {flavor:?}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::Malformed {
                path: path.to_owned(),
                reason: err.to_string(),
            })?;

        Ok(non_blank_lines(&body))
    }
}

fn non_blank_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect()
}
