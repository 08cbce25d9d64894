//! Cosmos DB (SQL API) metadata store over the REST interface.
//!
//! Requests are signed with the account master key: an HMAC-SHA256 over the
//! lowercased verb, resource type and date plus the resource link, base64
//! encoded and URL-encoded into the `authorization` header.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use sha2::Sha256;

use liveops_core::config::CosmosConfig;
use liveops_core::{metadata_id, ChannelIdentity, ChannelMetadata, Error, Result};

use crate::MetadataStore;

/// REST API version sent with every request. Collections are created
/// without a partition key, which this version still permits.
const API_VERSION: &str = "2017-02-22";

/// Metadata store backed by a Cosmos DB collection.
pub struct CosmosStore {
    client: Client,
    endpoint: String,
    key: Vec<u8>,
    database: String,
    collection: String,
}

impl CosmosStore {
    /// Build a store from configuration.
    ///
    /// Returns `Ok(None)` when endpoint or key is not configured and
    /// [`Error::Config`] when the key is not valid base64.
    pub fn from_config(config: &CosmosConfig) -> Result<Option<Self>> {
        let endpoint = config.endpoint.as_deref().unwrap_or("").trim();
        let key = config.key.as_deref().unwrap_or("").trim();
        if endpoint.is_empty() || key.is_empty() {
            return Ok(None);
        }

        let key = BASE64
            .decode(key)
            .map_err(|e| Error::Config(format!("store.cosmos.key is not valid base64: {e}")))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build Cosmos HTTP client with timeout: {e}");
                Client::new()
            });

        Ok(Some(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            database: config.database.clone(),
            collection: config.collection.clone(),
        }))
    }

    fn database_link(&self) -> String {
        format!("dbs/{}", self.database)
    }

    fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.collection)
    }

    fn document_link(&self, id: &str) -> String {
        format!("{}/docs/{}", self.collection_link(), id)
    }

    /// Build a signed request. `path` is the URL path below the endpoint;
    /// `resource_link` is the link the signature covers.
    fn request(
        &self,
        method: Method,
        path: &str,
        resource_type: &str,
        resource_link: &str,
    ) -> Result<RequestBuilder> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let token = auth_token(&self.key, &method, resource_type, resource_link, &date)?;

        Ok(self
            .client
            .request(method, format!("{}/{}", self.endpoint, path))
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION))
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| Error::store(format!("{operation}: {e}")))
    }

    /// Create the document. `Ok(false)` means the collection (or database)
    /// does not exist.
    async fn create_document(&self, record: &ChannelMetadata) -> Result<bool> {
        let link = self.collection_link();
        let builder = self
            .request(Method::POST, &format!("{link}/docs"), "docs", &link)?
            .json(record);
        let response = self.send("create document", builder).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(failure("create document", response).await),
        }
    }

    /// Create database and collection, tolerating ones that already exist.
    async fn ensure_collection(&self) -> Result<()> {
        let builder = self
            .request(Method::POST, "dbs", "dbs", "")?
            .json(&serde_json::json!({ "id": self.database }));
        let response = self.send("create database", builder).await?;
        if !response.status().is_success() && response.status() != StatusCode::CONFLICT {
            return Err(failure("create database", response).await);
        }

        let db_link = self.database_link();
        let builder = self
            .request(Method::POST, &format!("{db_link}/colls"), "colls", &db_link)?
            .json(&serde_json::json!({ "id": self.collection }));
        let response = self.send("create collection", builder).await?;
        if !response.status().is_success() && response.status() != StatusCode::CONFLICT {
            return Err(failure("create collection", response).await);
        }

        tracing::info!(
            database = %self.database,
            collection = %self.collection,
            "Created Cosmos metadata collection"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl MetadataStore for CosmosStore {
    fn name(&self) -> &'static str {
        "cosmos"
    }

    async fn upsert(&self, record: &ChannelMetadata) -> Result<bool> {
        let link = self.document_link(&record.id);
        let builder = self.request(Method::PUT, &link, "docs", &link)?.json(record);
        let response = self.send("replace document", builder).await?;

        match response.status() {
            status if status.is_success() => return Ok(true),
            StatusCode::NOT_FOUND => {}
            _ => return Err(failure("replace document", response).await),
        }

        if self.create_document(record).await? {
            return Ok(true);
        }

        self.ensure_collection().await?;
        if self.create_document(record).await? {
            Ok(true)
        } else {
            Err(Error::store(format!(
                "collection {} not found after creation",
                self.collection_link()
            )))
        }
    }

    async fn delete(&self, identity: &ChannelIdentity) -> Result<bool> {
        let link = self.document_link(&metadata_id(identity));
        let builder = self.request(Method::DELETE, &link, "docs", &link)?;
        let response = self.send("delete document", builder).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => {
                tracing::debug!(channel = %identity.channel_name, "Metadata document already absent");
                Ok(true)
            }
            _ => Err(failure("delete document", response).await),
        }
    }

    async fn get(&self, identity: &ChannelIdentity) -> Result<Option<ChannelMetadata>> {
        let link = self.document_link(&metadata_id(identity));
        let builder = self.request(Method::GET, &link, "docs", &link)?;
        let response = self.send("read document", builder).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<ChannelMetadata>()
                .await
                .map(Some)
                .map_err(|e| Error::store(format!("read document: invalid body: {e}"))),
            _ => Err(failure("read document", response).await),
        }
    }
}

/// Compute the URL-encoded master-key authorization token.
pub(crate) fn auth_token(
    key: &[u8],
    method: &Method,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        method.as_str().to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| Error::Internal(format!("invalid HMAC key: {e}")))?;
    mac.update(payload.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(urlencoding::encode(&format!("type=master&ver=1.0&sig={signature}")).into_owned())
}

async fn failure(operation: &str, response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        Error::store(format!("{operation}: {status}"))
    } else {
        Error::store(format!("{operation}: {status}: {body}"))
    }
}
