use std::sync::Arc;

use crate::metadata::{self, MetadataClient};

use super::checks::{first_value, project_id_from_env, short_hostname};
use super::{Error, Result};

pub(super) const PROJECT_ID_PATH: &str = "project/project-id";

/// The ambient facts environment detection is derived from.
pub trait EnvironmentProbe: Send + Sync {
    /// Resolves the project id from the ambient credential context. Returns an
    /// empty string if no project is configured and the metadata server is
    /// unreachable.
    fn default_project_id(&self) -> impl Future<Output = Result<String>> + Send;

    /// Fetches the non-blank lines of the metadata value at `path`.
    fn fetch_metadata(
        &self,
        path: &str,
    ) -> impl Future<Output = metadata::Result<Vec<String>>> + Send;

    /// Returns the short host name of the local machine.
    fn local_hostname(&self) -> impl Future<Output = Result<String>> + Send;
}

impl<T: EnvironmentProbe> EnvironmentProbe for Arc<T> {
    fn default_project_id(&self) -> impl Future<Output = Result<String>> + Send {
        (**self).default_project_id()
    }

    fn fetch_metadata(
        &self,
        path: &str,
    ) -> impl Future<Output = metadata::Result<Vec<String>>> + Send {
        (**self).fetch_metadata(path)
    }

    fn local_hostname(&self) -> impl Future<Output = Result<String>> + Send {
        (**self).local_hostname()
    }
}

/// Probes the real environment: process environment variables, the metadata
/// server and the `hostname` command.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    metadata: MetadataClient,
}

impl SystemProbe {
    pub fn new(metadata: MetadataClient) -> Self {
        Self { metadata }
    }
}

impl EnvironmentProbe for SystemProbe {
    async fn default_project_id(&self) -> Result<String> {
        if let Some(project) = project_id_from_env(|key| std::env::var(key).ok()) {
            log::debug!("Using project `{}` from the environment", project);
            return Ok(project);
        }

        match self.metadata.fetch_lines(PROJECT_ID_PATH).await {
            Ok(lines) => Ok(first_value(lines).unwrap_or_default()),
            Err(err) if err.is_unreachable() => {
                log::debug!("No default project available: {}", err);
                Ok(String::new())
            }
            Err(err) => Err(Error::Transport(err)),
        }
    }

    async fn fetch_metadata(&self, path: &str) -> metadata::Result<Vec<String>> {
        self.metadata.fetch_lines(path).await
    }

    async fn local_hostname(&self) -> Result<String> {
        short_hostname().await
    }
}
