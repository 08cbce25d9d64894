//! ARM management REST implementation of [`MediaClient`].

use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use liveops_core::config::MediaConfig;
use liveops_core::{
    AccountScope, Asset, Channel, ChannelState, Error, LiveOutputRecord, Result,
    StreamingLocatorRecord,
};

use crate::wire::{
    AssetProperties, AsyncOperation, ErrorResponse, ListStreamingLocatorsResponse,
    LiveEventProperties, LiveOutputProperties, Page, Resource, StreamingLocatorProperties,
};
use crate::MediaClient;

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Media client backed by the ARM management API.
pub struct ArmMediaClient {
    client: Client,
    endpoint: String,
    api_version: String,
    access_token: Option<String>,
    lro_poll_interval: Duration,
    lro_max_wait: Duration,
}

impl ArmMediaClient {
    pub fn new(config: &MediaConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build media HTTP client with timeout: {e}");
                Client::new()
            });

        Self {
            client,
            endpoint: config.arm_endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            access_token: config.access_token.clone(),
            lro_poll_interval: config.lro_poll_interval(),
            lro_max_wait: config.lro_max_wait(),
        }
    }

    fn url(&self, scope: &AccountScope, path: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Media/mediaservices/{}{}?api-version={}",
            self.endpoint,
            scope.subscription_id,
            scope.resource_group,
            scope.account_name,
            path,
            self.api_version
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| Error::remote(operation, None, e.to_string()))
    }

    /// GET a resource, mapping 404 to `None`.
    async fn get_resource<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
    ) -> Result<Option<T>> {
        let response = self.send(operation, self.request(Method::GET, url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(failure(operation, response).await);
        }

        parse_json(operation, response).await.map(Some)
    }

    /// Issue a mutating request and wait for any long-running operation it
    /// starts.
    async fn mutate(&self, operation: &str, builder: RequestBuilder) -> Result<()> {
        let response = self.send(operation, builder).await?;
        let status = response.status();

        if status == StatusCode::ACCEPTED {
            return self.wait_for_operation(operation, response.headers()).await;
        }
        if !status.is_success() {
            return Err(failure(operation, response).await);
        }

        Ok(())
    }

    /// Follow an accepted long-running operation until it finishes.
    async fn wait_for_operation(&self, operation: &str, headers: &HeaderMap) -> Result<()> {
        let async_url = header_str(headers, ASYNC_OPERATION_HEADER);
        let location_url = header_str(headers, LOCATION.as_str());

        let (url, via_status_resource) = match (async_url, location_url) {
            (Some(url), _) => (url, true),
            (None, Some(url)) => (url, false),
            (None, None) => {
                tracing::debug!(operation, "Accepted without a status URL; treating as complete");
                return Ok(());
            }
        };

        let started = Instant::now();
        loop {
            tokio::time::sleep(self.lro_poll_interval).await;

            let response = self.send(operation, self.request(Method::GET, &url)).await?;
            let status = response.status();

            if via_status_resource {
                if !status.is_success() {
                    return Err(failure(operation, response).await);
                }
                let op: AsyncOperation = parse_json(operation, response).await?;
                match op.status.as_str() {
                    "Succeeded" => return Ok(()),
                    "Failed" | "Canceled" | "Cancelled" => {
                        let detail = op
                            .error
                            .map(|e| e.describe())
                            .unwrap_or_else(|| op.status.clone());
                        return Err(Error::remote(operation, None, detail));
                    }
                    other => {
                        tracing::trace!(operation, status = %other, "Operation in progress");
                    }
                }
            } else if status != StatusCode::ACCEPTED {
                if status.is_success() {
                    return Ok(());
                }
                return Err(failure(operation, response).await);
            }

            if started.elapsed() >= self.lro_max_wait {
                return Err(Error::Timeout {
                    what: operation.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
        }
    }
}

#[async_trait::async_trait]
impl MediaClient for ArmMediaClient {
    async fn get_channel(&self, scope: &AccountScope, name: &str) -> Result<Option<Channel>> {
        let operation = "get live event";
        let url = self.url(scope, &format!("/liveEvents/{name}"));
        let Some(resource) = self
            .get_resource::<Resource<LiveEventProperties>>(operation, &url)
            .await?
        else {
            return Ok(None);
        };

        let state = resource
            .properties
            .resource_state
            .ok_or_else(|| Error::remote(operation, None, "response has no resourceState"))?
            .parse::<ChannelState>()
            .map_err(|e| Error::remote(operation, None, e.to_string()))?;

        Ok(Some(Channel {
            name: resource.name,
            state,
        }))
    }

    async fn list_outputs(
        &self,
        scope: &AccountScope,
        channel: &str,
    ) -> Result<Vec<LiveOutputRecord>> {
        let operation = "list live outputs";
        let mut next = Some(self.url(scope, &format!("/liveEvents/{channel}/liveOutputs")));
        let mut outputs = Vec::new();

        while let Some(url) = next.take() {
            let page: Page<Resource<LiveOutputProperties>> = self
                .get_resource(operation, &url)
                .await?
                .ok_or_else(|| Error::remote(operation, Some(404), format!("live event {channel} not found")))?;

            for output in page.value {
                let asset_name = output.properties.asset_name.ok_or_else(|| {
                    Error::remote(
                        operation,
                        None,
                        format!("live output {} has no assetName", output.name),
                    )
                })?;
                outputs.push(LiveOutputRecord {
                    name: output.name,
                    asset_name,
                });
            }
            next = page.next_link;
        }

        Ok(outputs)
    }

    async fn get_asset(&self, scope: &AccountScope, name: &str) -> Result<Option<Asset>> {
        let url = self.url(scope, &format!("/assets/{name}"));
        let resource = self
            .get_resource::<Resource<AssetProperties>>("get asset", &url)
            .await?;

        Ok(resource.map(|r| Asset {
            name: r.name,
            container: r.properties.container,
        }))
    }

    async fn list_locators_for_asset(
        &self,
        scope: &AccountScope,
        asset: &str,
    ) -> Result<Vec<String>> {
        let operation = "list streaming locators";
        let url = self.url(scope, &format!("/assets/{asset}/listStreamingLocators"));
        let response = self.send(operation, self.request(Method::POST, &url)).await?;
        if !response.status().is_success() {
            return Err(failure(operation, response).await);
        }

        let body: ListStreamingLocatorsResponse = parse_json(operation, response).await?;
        Ok(body
            .streaming_locators
            .into_iter()
            .filter_map(|l| l.name)
            .collect())
    }

    async fn get_locator(
        &self,
        scope: &AccountScope,
        name: &str,
    ) -> Result<Option<StreamingLocatorRecord>> {
        let url = self.url(scope, &format!("/streamingLocators/{name}"));
        let resource = self
            .get_resource::<Resource<StreamingLocatorProperties>>("get streaming locator", &url)
            .await?;

        Ok(resource.map(|r| StreamingLocatorRecord {
            name: r.name,
            streaming_policy_name: r.properties.streaming_policy_name,
        }))
    }

    async fn delete_output(
        &self,
        scope: &AccountScope,
        channel: &str,
        output: &str,
    ) -> Result<()> {
        let url = self.url(scope, &format!("/liveEvents/{channel}/liveOutputs/{output}"));
        self.mutate("delete live output", self.request(Method::DELETE, &url))
            .await
    }

    async fn delete_asset(&self, scope: &AccountScope, name: &str) -> Result<()> {
        let url = self.url(scope, &format!("/assets/{name}"));
        self.mutate("delete asset", self.request(Method::DELETE, &url))
            .await
    }

    async fn delete_policy(&self, scope: &AccountScope, name: &str) -> Result<()> {
        let url = self.url(scope, &format!("/streamingPolicies/{name}"));
        self.mutate("delete streaming policy", self.request(Method::DELETE, &url))
            .await
    }

    async fn stop_channel(&self, scope: &AccountScope, name: &str) -> Result<()> {
        let url = self.url(scope, &format!("/liveEvents/{name}/stop"));
        let builder = self
            .request(Method::POST, &url)
            .json(&serde_json::json!({ "removeOutputsOnStop": false }));
        self.mutate("stop live event", builder).await
    }

    async fn delete_channel(&self, scope: &AccountScope, name: &str) -> Result<()> {
        let url = self.url(scope, &format!("/liveEvents/{name}"));
        self.mutate("delete live event", self.request(Method::DELETE, &url))
            .await
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn parse_json<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| Error::remote(operation, None, format!("invalid response body: {e}")))
}

/// Build a remote error from a non-success response, preferring the ARM
/// error message when the body carries one.
async fn failure(operation: &str, response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.describe())
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {body}")
            }
        });
    Error::remote(operation, Some(status.as_u16()), message)
}
