use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::resource::{GroupRef, InstanceRef, Zone};

use super::models::{
    InstanceGroupResource, InstanceResource, InstanceWithNamedPorts, ListResponse, NamedItem,
    Operation, ZoneItem,
};
use super::pager::Page;
use super::{ComputeAdmin, Error, GroupLister, InstanceDetail, Result};

/// Base URL of the public Compute Engine v1 REST API.
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Compute Engine client speaking the v1 REST API.
///
/// Authentication is limited to an optional, externally obtained bearer token.
#[derive(Debug, Clone)]
pub struct RestComputeClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl RestComputeClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            access_token,
        })
    }

    fn zone_url(&self, project: &str, zone: &str) -> String {
        format!("{}/projects/{}/zones/{}", self.base_url, project, zone)
    }

    fn group_url(&self, group: &GroupRef) -> String {
        format!(
            "{}/instanceGroups/{}",
            self.zone_url(group.project(), group.zone()),
            group.name()
        )
    }

    fn manager_url(&self, group: &GroupRef) -> String {
        format!(
            "{}/instanceGroupManagers/{}",
            self.zone_url(group.project(), group.zone()),
            group.name()
        )
    }

    fn instance_url(&self, instance: &InstanceRef) -> String {
        format!(
            "{}/instances/{}",
            self.zone_url(instance.project(), instance.zone()),
            instance.name()
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, url: &str) -> Result<T> {
        let response = builder.send().await.map_err(|source| Error::Transport {
            url: url.to_owned(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                resource: url.to_owned(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                url: url.to_owned(),
                code: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|source| Error::Decode {
            url: url.to_owned(),
            source,
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        self.send(self.request(Method::GET, url).query(query), url)
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T> {
        self.send(self.request(Method::POST, url).query(query).json(body), url)
            .await
    }

    async fn operation<B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<()> {
        let operation: Operation = self.post(url, query, body).await?;
        log::debug!(
            "Started operation `{}` ({}) for {}",
            operation.name,
            operation.status,
            url
        );
        Ok(())
    }
}

fn page_query(page_token: Option<String>) -> Vec<(&'static str, String)> {
    page_token
        .map(|token| vec![("pageToken", token)])
        .unwrap_or_default()
}

fn empty_body() -> serde_json::Value {
    serde_json::json!({})
}

impl GroupLister for RestComputeClient {
    async fn list_groups(
        &self,
        project: &str,
        zone: &str,
        page_token: Option<String>,
    ) -> Result<Page<GroupRef>> {
        let url = format!("{}/instanceGroups", self.zone_url(project, zone));
        let response: ListResponse<NamedItem> = self.get(&url, &page_query(page_token)).await?;
        let items = response
            .items
            .into_iter()
            .map(|item| GroupRef::new(project, zone, item.name))
            .collect();

        Ok(Page::new(items, response.next_page_token))
    }

    async fn list_group_instances(
        &self,
        group: &GroupRef,
        page_token: Option<String>,
    ) -> Result<Page<InstanceRef>> {
        let url = format!("{}/listInstances", self.group_url(group));
        let response: ListResponse<InstanceWithNamedPorts> = self
            .post(&url, &page_query(page_token), &empty_body())
            .await?;
        let items = response
            .items
            .into_iter()
            .map(|item| item.instance.parse::<InstanceRef>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(items, response.next_page_token))
    }
}

impl ComputeAdmin for RestComputeClient {
    async fn list_zones(&self, project: &str, page_token: Option<String>) -> Result<Page<Zone>> {
        let url = format!("{}/projects/{}/zones", self.base_url, project);
        let response: ListResponse<ZoneItem> = self.get(&url, &page_query(page_token)).await?;
        let items = response
            .items
            .into_iter()
            .map(|item| Zone::new(item.name, &item.region))
            .collect();

        Ok(Page::new(items, response.next_page_token))
    }

    async fn group_size(&self, group: &GroupRef) -> Result<u32> {
        let resource: InstanceGroupResource = self.get(&self.group_url(group), &[]).await?;
        Ok(resource.size)
    }

    async fn instance_detail(&self, instance: &InstanceRef) -> Result<InstanceDetail> {
        let url = self.instance_url(instance);
        let resource: InstanceResource = self.get(&url, &[]).await?;
        InstanceDetail::try_from(resource).map_err(|reason| Error::InvalidPayload { url, reason })
    }

    async fn resize_group(&self, group: &GroupRef, size: u32) -> Result<()> {
        let url = format!("{}/resize", self.manager_url(group));
        self.operation(&url, &[("size", size.to_string())], &empty_body())
            .await
    }

    async fn remove_group_instance(&self, group: &GroupRef, instance: &InstanceRef) -> Result<()> {
        let url = format!("{}/deleteInstances", self.manager_url(group));
        let body = serde_json::json!({ "instances": [instance.to_url()] });
        self.operation(&url, &[], &body).await
    }

    async fn start_instance(&self, instance: &InstanceRef) -> Result<()> {
        let url = format!("{}/start", self.instance_url(instance));
        self.operation(&url, &[], &empty_body()).await
    }

    async fn stop_instance(&self, instance: &InstanceRef) -> Result<()> {
        let url = format!("{}/stop", self.instance_url(instance));
        self.operation(&url, &[], &empty_body()).await
    }

    async fn create_instance_from_template(
        &self,
        instance: &InstanceRef,
        template: &str,
    ) -> Result<()> {
        let url = format!(
            "{}/instances",
            self.zone_url(instance.project(), instance.zone())
        );
        let template = if template.contains('/') {
            template.to_owned()
        } else {
            format!(
                "projects/{}/global/instanceTemplates/{}",
                instance.project(),
                template
            )
        };
        let body = serde_json::json!({ "name": instance.name() });
        self.operation(&url, &[("sourceInstanceTemplate", template)], &body)
            .await
    }
}
