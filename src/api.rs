use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::ToSocketAddrs;

use crate::compute::{ComputeAdmin, GroupLister};
use crate::environment::EnvironmentProbe;
use crate::monitor::EnvironmentMonitor;
use crate::resource::GroupRef;
use crate::toolbox::Toolbox;

mod models;

/// Shared state of the status API.
pub struct ApiState<P, C> {
    monitor: Arc<EnvironmentMonitor<P, C>>,
    toolbox: Option<Arc<Toolbox<C>>>,
}

impl<P, C> Clone for ApiState<P, C> {
    fn clone(&self) -> Self {
        Self {
            monitor: Arc::clone(&self.monitor),
            toolbox: self.toolbox.clone(),
        }
    }
}

impl<P, C> ApiState<P, C> {
    /// `toolbox` is only available on Compute Engine; without it `/groups`
    /// answers 404.
    pub fn new(monitor: Arc<EnvironmentMonitor<P, C>>, toolbox: Option<Arc<Toolbox<C>>>) -> Self {
        Self { monitor, toolbox }
    }
}

async fn identity<P, C>(State(state): State<ApiState<P, C>>) -> Response
where
    P: EnvironmentProbe + 'static,
    C: GroupLister + ComputeAdmin + 'static,
{
    match state.monitor.identity() {
        Some(identity) => (StatusCode::OK, Json(identity)).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(models::ErrorResponse::new("environment not detected yet")),
        )
            .into_response(),
    }
}

async fn peers<P, C>(State(state): State<ApiState<P, C>>) -> Response
where
    P: EnvironmentProbe + 'static,
    C: GroupLister + ComputeAdmin + 'static,
{
    let members = state
        .monitor
        .peers()
        .map(|peers| peers.to_vec())
        .unwrap_or_default();
    let body = models::PeersResponse {
        count: state.monitor.peer_count(),
        group: state.monitor.group().cloned(),
        members,
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn groups<P, C>(State(state): State<ApiState<P, C>>) -> Response
where
    P: EnvironmentProbe + 'static,
    C: GroupLister + ComputeAdmin + 'static,
{
    let Some(toolbox) = state.toolbox else {
        return (
            StatusCode::NOT_FOUND,
            Json(models::ErrorResponse::new("not running on Compute Engine")),
        )
            .into_response();
    };

    match toolbox.all_groups().await {
        Ok(groups) => {
            let mut groups: Vec<GroupRef> = groups.into_values().collect();
            groups.sort_by(|a, b| a.name().cmp(b.name()));
            (StatusCode::OK, Json(groups)).into_response()
        }
        Err(err) => {
            log::error!("Failed to list instance groups: {}", err);
            (
                StatusCode::BAD_GATEWAY,
                Json(models::ErrorResponse::new("failed to list instance groups")),
            )
                .into_response()
        }
    }
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new<P, C>(state: ApiState<P, C>) -> Self
    where
        P: EnvironmentProbe + 'static,
        C: GroupLister + ComputeAdmin + 'static,
    {
        let router = axum::Router::new()
            .route("/identity", get(identity::<P, C>))
            .route("/peers", get(peers::<P, C>))
            .route("/groups", get(groups::<P, C>))
            .with_state(state);
        Self { router }
    }

    /// Serves the API until the server fails.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Status API listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::testutil::{FakeCompute, FakeProbe, members};

    const ZONE: &str = "us-east1-b";

    type TestState = ApiState<Arc<FakeProbe>, Arc<FakeCompute>>;

    fn state(with_toolbox: bool) -> TestState {
        let compute = Arc::new(
            FakeCompute::new()
                .with_zone(crate::resource::Zone::new(ZONE, "us-east1"))
                .with_group(
                    GroupRef::new("p1", ZONE, "web"),
                    members("p1", ZONE, &["vm-1", "web-1"]),
                )
                .with_group(GroupRef::new("p1", ZONE, "batch"), Vec::new()),
        );
        let probe = Arc::new(FakeProbe::in_cloud(
            "p1",
            "projects/p1/zones/us-east1-b",
            "vm-1",
            "10.0.0.2",
        ));
        let monitor = Arc::new(EnvironmentMonitor::new(probe, Arc::clone(&compute)));
        let toolbox = with_toolbox.then(|| Arc::new(Toolbox::new(compute, "p1")));
        ApiState::new(monitor, toolbox)
    }

    async fn get_json(state: TestState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = APIServer::new(state)
            .router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_identity_before_detection() {
        let (status, body) = get_json(state(false), "/identity").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_identity_after_detection() {
        let state = state(false);
        state.monitor.detect().await.unwrap();

        let (status, body) = get_json(state, "/identity").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["instance_name"], "vm-1");
        assert_eq!(body["zone"], ZONE);
        assert_eq!(body["in_cloud"], true);
        assert!(body["public_ip"].is_null());
    }

    #[tokio::test]
    async fn test_peers() {
        let state = state(false);
        state.monitor.detect().await.unwrap();

        let (status, body) = get_json(state, "/peers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["group"]["name"], "web");
        assert_eq!(body["members"][1]["name"], "web-1");
    }

    #[tokio::test]
    async fn test_peers_before_detection() {
        let (status, body) = get_json(state(false), "/peers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert!(body["group"].is_null());
        assert_eq!(body["members"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_groups_without_toolbox() {
        let (status, _) = get_json(state(false), "/groups").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_groups_sorted_by_name() {
        let (status, body) = get_json(state(true), "/groups").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|group| group["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["batch", "web"]);
    }
}
