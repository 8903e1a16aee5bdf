//! Access to the Compute Engine API.
//!
//! The environment monitor only depends on [`GroupLister`]; everything that
//! changes resources lives behind [`ComputeAdmin`]. [`RestComputeClient`]
//! implements both against the public v1 REST API.
mod client;
mod error;
mod models;
mod pager;
mod rest;

pub use client::{ComputeAdmin, GroupLister, group_members, project_zones, zone_groups};
pub use error::{Error, Result};
pub use models::InstanceDetail;
pub use pager::{Page, paginate};
pub use rest::{DEFAULT_COMPUTE_ENDPOINT, RestComputeClient};
