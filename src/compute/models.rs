//! Wire formats of the Compute Engine v1 REST API, reduced to the fields this
//! crate reads, plus the domain types built from them.
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NamedItem {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ZoneItem {
    pub name: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct InstanceWithNamedPorts {
    pub instance: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct InstanceGroupResource {
    #[serde(default)]
    pub size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InstanceResource {
    pub id: String,
    pub creation_timestamp: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NetworkInterface {
    #[serde(rename = "networkIP")]
    pub network_ip: Option<String>,
    #[serde(default)]
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AccessConfig {
    #[serde(rename = "natIP")]
    pub nat_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
}

/// Details of a single VM instance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InstanceDetail {
    pub id: u64,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub status: String,
}

impl InstanceDetail {
    pub fn is_running(&self) -> bool {
        self.status == "RUNNING"
    }
}

impl TryFrom<InstanceResource> for InstanceDetail {
    type Error = String;

    fn try_from(value: InstanceResource) -> Result<Self, Self::Error> {
        let id = value
            .id
            .parse::<u64>()
            .map_err(|err| format!("invalid instance id {:?}: {}", value.id, err))?;
        let created_at = DateTime::parse_from_rfc3339(&value.creation_timestamp).map_err(|err| {
            format!(
                "invalid creation timestamp {:?}: {}",
                value.creation_timestamp, err
            )
        })?;

        let nic = value.network_interfaces.into_iter().next();
        let (private_ip, public_ip) = match nic {
            Some(nic) => {
                let public_ip = nic
                    .access_configs
                    .into_iter()
                    .next()
                    .and_then(|config| config.nat_ip);
                (nic.network_ip, public_ip)
            }
            None => (None, None),
        };

        Ok(Self {
            id,
            private_ip,
            public_ip,
            created_at,
            status: value.status,
        })
    }
}
