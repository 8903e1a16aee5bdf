use crate::resource::{InstanceRef, last_segment};

use super::checks::first_value;
use super::probe::EnvironmentProbe;
use super::{Error, Result};

pub(crate) const INSTANCE_NAME_PATH: &str = "instance/name";
pub(crate) const ZONE_PATH: &str = "instance/zone";
pub(crate) const PRIVATE_IP_PATH: &str = "instance/network-interfaces/0/ip";
pub(crate) const PUBLIC_IP_PATH: &str = "instance/network-interfaces/0/access-configs/0/external-ip";

/// Available runtime environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Running on a Compute Engine VM.
    ComputeEngine,
    /// Running anywhere else, e.g. a developer machine.
    Local,
}

/// Who and where this process is.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Identity {
    project_id: String,
    instance_name: String,
    zone: String,
    private_ip: String,
    public_ip: Option<String>,
    in_cloud: bool,
}

impl Identity {
    fn local(project_id: String, hostname: String) -> Self {
        Self {
            project_id,
            instance_name: hostname,
            zone: String::new(),
            private_ip: String::new(),
            public_ip: None,
            in_cloud: false,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The VM name, or the local host name when not running in the cloud.
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// The zone name, empty when not running in the cloud.
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn private_ip(&self) -> &str {
        &self.private_ip
    }

    pub fn public_ip(&self) -> Option<&str> {
        self.public_ip.as_deref()
    }

    pub fn in_cloud(&self) -> bool {
        self.in_cloud
    }

    pub fn environment(&self) -> RuntimeEnvironment {
        if self.in_cloud {
            RuntimeEnvironment::ComputeEngine
        } else {
            RuntimeEnvironment::Local
        }
    }

    /// Returns this process' own instance as a group member key.
    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef::new(&self.project_id, &self.zone, &self.instance_name)
    }
}

/// Detects whether the process runs on Compute Engine and resolves its identity.
///
/// The sequence is:
///
/// 1. Resolve the default project id.
/// 2. Fetch `instance/name`. An empty answer or an unreachable metadata server
///    means the process is not in the cloud; the local host name is used instead.
/// 3. In the cloud, fetch the zone (keeping its trailing path segment), the
///    private IP and the public IP of the first network interface.
///
/// A missing public IP is not an error; VMs without an external access config
/// simply have none.
///
/// # Errors
///
/// * [`Error::Transport`] if the metadata server answers with an error status or
///   a malformed response.
/// * Hostname errors if the local host name cannot be determined off-cloud.
pub async fn detect_identity<P: EnvironmentProbe>(probe: &P) -> Result<Identity> {
    let project_id = probe.default_project_id().await?;

    let instance_name = match probe.fetch_metadata(INSTANCE_NAME_PATH).await {
        Ok(lines) => first_value(lines),
        Err(err) if err.is_unreachable() => {
            log::debug!("Metadata server unreachable: {}", err);
            None
        }
        Err(err) => return Err(Error::Transport(err)),
    };

    let Some(instance_name) = instance_name else {
        let hostname = probe.local_hostname().await?;
        log::debug!("Not on Compute Engine, local hostname is `{}`", hostname);
        return Ok(Identity::local(project_id, hostname));
    };

    let zone_path = fetch_value(probe, ZONE_PATH).await?;
    let zone = last_segment(&zone_path).to_owned();
    let private_ip = fetch_value(probe, PRIVATE_IP_PATH).await?;
    let public_ip = match probe.fetch_metadata(PUBLIC_IP_PATH).await {
        Ok(lines) => first_value(lines),
        Err(err) => {
            log::debug!("No public IP: {}", err);
            None
        }
    };

    Ok(Identity {
        project_id,
        instance_name,
        zone,
        private_ip,
        public_ip,
        in_cloud: true,
    })
}

async fn fetch_value<P: EnvironmentProbe>(probe: &P, path: &str) -> Result<String> {
    let lines = probe
        .fetch_metadata(path)
        .await
        .map_err(Error::Transport)?;
    Ok(first_value(lines).unwrap_or_default())
}
