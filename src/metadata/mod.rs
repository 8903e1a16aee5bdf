//! Client for the Compute Engine metadata server.
//!
//! The metadata server is only reachable from inside a VM, which makes a failed
//! connection the cheapest "am I in the cloud?" check available.
mod client;
mod error;

pub use client::{DEFAULT_METADATA_HOST, MetadataClient};
pub use error::{BoxError, FetchError, Result};
