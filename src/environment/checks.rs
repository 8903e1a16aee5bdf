use std::time::Duration;

use super::{Error, Result};

/// Environment variables consulted, in order, for the default project id.
pub const PROJECT_ENV_VARS: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

const HOSTNAME_COMMAND: &str = "hostname";
const HOSTNAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the first non-blank project id set in [`PROJECT_ENV_VARS`].
///
/// # Arguments
///
/// * `lookup` - Resolves an environment variable by name, e.g. `|key| std::env::var(key).ok()`.
pub fn project_id_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    PROJECT_ENV_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

/// Returns the first line of a metadata value, trimmed, or `None` if there is none.
pub fn first_value(lines: Vec<String>) -> Option<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_owned())
        .find(|line| !line.is_empty())
}

/// Returns the short host name of the local machine as reported by `hostname -s`.
///
/// # Errors
///
/// * [`Error::HostnameCommand`] if the command cannot be spawned.
/// * [`Error::HostnameStatus`] if it exits unsuccessfully.
/// * [`Error::HostnameTimeout`] if it does not finish in time.
pub async fn short_hostname() -> Result<String> {
    let output = tokio::time::timeout(
        HOSTNAME_TIMEOUT,
        tokio::process::Command::new(HOSTNAME_COMMAND)
            .arg("-s")
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| Error::HostnameTimeout {
        command: HOSTNAME_COMMAND,
        timeout: HOSTNAME_TIMEOUT,
    })?
    .map_err(|source| Error::HostnameCommand {
        command: HOSTNAME_COMMAND,
        source,
    })?;

    if !output.status.success() {
        return Err(Error::HostnameStatus {
            command: HOSTNAME_COMMAND,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_owned())
}
