//! GCE Toolbox: detects whether the process runs on a Compute Engine VM and keeps
//! track of the managed instance group it belongs to.
//!
//! This library provides environment detection through the metadata server,
//! instance group peer tracking with change notifications, administrative
//! group and instance operations, and a small status API.
use std::sync::Arc;

use environment::RuntimeEnvironment;

pub mod api;
pub mod compute;
pub mod config;
pub mod environment;
pub mod error;
pub mod metadata;
pub mod monitor;
pub mod peers;
pub mod resource;
pub mod toolbox;

#[cfg(test)]
mod testutil;

/// Runs the GCE Toolbox application.
///
/// Detects the runtime environment, starts refreshing the instance group peers
/// and serves the status API.
///
/// # Returns
///
/// Only returns if something fails; the API server runs until the process is
/// stopped.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration (see [`config::Config::from_env`]).
/// - Failure to build the HTTP clients.
/// - Environment detection failures other than "not in the cloud".
/// - Failure to bind the API listen address.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {:?}", config);

    let probe = environment::SystemProbe::new(metadata::MetadataClient::new(
        &config.metadata_host,
    )?);
    let compute = compute::RestComputeClient::new(
        config.compute_endpoint.clone(),
        config.access_token.clone(),
    )?;

    let monitor = Arc::new(monitor::EnvironmentMonitor::new(probe, compute.clone()));
    let identity = monitor.detect().await?;
    match identity.environment() {
        RuntimeEnvironment::ComputeEngine => log::info!(
            "Detected Compute Engine instance `{}` in {}/{} (private ip {}, public ip {})",
            identity.instance_name(),
            identity.project_id(),
            identity.zone(),
            identity.private_ip(),
            identity.public_ip().unwrap_or("none"),
        ),
        RuntimeEnvironment::Local => log::info!(
            "Detected local environment on `{}`",
            identity.instance_name()
        ),
    }
    let in_cloud = identity.in_cloud();
    let project = identity.project_id().to_owned();

    monitor.subscribe(|count| log::info!("Instance group now has {} peers", count));
    let status = monitor.start_auto_refresh(config.refresh_interval).await?;
    log::debug!("Auto refresh: {:?}", status);

    let toolbox = in_cloud.then(|| Arc::new(toolbox::Toolbox::new(compute, project)));
    let state = api::ApiState::new(Arc::clone(&monitor), toolbox);
    api::APIServer::new(state).listen(config.listen_addr).await?;

    Ok(())
}
