//! Value types identifying Compute Engine resources.
//!
//! Every type here is a plain key: equality and hashing are structural, so two
//! references to the same VM compare equal no matter where they came from
//! (metadata server, group listing, or a user-supplied name).
use std::fmt;
use std::str::FromStr;

mod error;
mod utils;

pub use error::{Error, Result};
pub use utils::last_segment;

/// Prefix of fully qualified Compute Engine v1 resource URLs.
pub const COMPUTE_URL_PREFIX: &str = "https://www.googleapis.com/compute/v1";

/// A VM instance, identified by project, zone and name.
///
/// # Examples
///
/// ```
/// # use gce_toolbox::resource::InstanceRef;
/// let url = "https://www.googleapis.com/compute/v1/projects/p1/zones/us-east1-b/instances/vm-1";
/// let instance: InstanceRef = url.parse().unwrap();
/// assert_eq!(instance, InstanceRef::new("p1", "us-east1-b", "vm-1"));
/// assert_eq!(instance.to_url(), url);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct InstanceRef {
    project: String,
    zone: String,
    name: String,
}

impl InstanceRef {
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }

    /// Creates an `InstanceRef` whose name is checked against the Compute Engine
    /// naming rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `name` is empty, longer than 63 bytes, or
    /// contains anything other than lowercase letters, digits and `-`.
    pub fn try_new(
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if !utils::is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }
        Ok(Self::new(project, zone, name))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fully qualified resource URL of this instance.
    pub fn to_url(&self) -> String {
        format!(
            "{COMPUTE_URL_PREFIX}/projects/{}/zones/{}/instances/{}",
            self.project, self.zone, self.name
        )
    }
}

impl FromStr for InstanceRef {
    type Err = Error;

    /// Parses a full or partial instance URL ending in
    /// `projects/{project}/zones/{zone}/instances/{name}`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim_end_matches('/').split('/').collect();
        let n = parts.len();
        if n < 6
            || parts[n - 6] != "projects"
            || parts[n - 4] != "zones"
            || parts[n - 2] != "instances"
        {
            return Err(Error::InvalidInstanceUrl(s.to_owned()));
        }

        let (project, zone, name) = (parts[n - 5], parts[n - 3], parts[n - 1]);
        if project.is_empty() || zone.is_empty() || name.is_empty() {
            return Err(Error::InvalidInstanceUrl(s.to_owned()));
        }

        Ok(Self::new(project, zone, name))
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.zone, self.name)
    }
}

/// A managed instance group, identified by project, zone and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct GroupRef {
    project: String,
    zone: String,
    name: String,
}

impl GroupRef {
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            name: name.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.zone, self.name)
    }
}

/// A Compute Engine zone and the region it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Zone {
    name: String,
    region: String,
}

impl Zone {
    /// Creates a zone from its name and its region, which may be given as a
    /// resource URL.
    pub fn new(name: impl Into<String>, region: &str) -> Self {
        Self {
            name: name.into(),
            region: last_segment(region).to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}
