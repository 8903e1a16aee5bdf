/// Entry point for the GCE Toolbox.
///
/// This binary detects whether it runs on a Compute Engine VM, tracks the peers
/// of its managed instance group and serves a status API about both.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid configuration or a
/// metadata server answering with errors).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info GCE_ACCESS_TOKEN="$(gcloud auth print-access-token)" cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    gce_toolbox::run().await
}
