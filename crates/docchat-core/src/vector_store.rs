//! Similarity search against a hosted Pinecone index.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{ApiKey, IndexSettings};
use crate::error::ServiceError;

pub const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
const PINECONE_API_VERSION: &str = "2024-07";
const SERVICE: &str = "pinecone";

/// A stored vector returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl VectorMatch {
    /// The `text` metadata field, if present and a string.
    pub fn text(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("text"))
            .and_then(Value::as_str)
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Nearest `top_k` neighbours of `vector`, best first, with metadata.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, ServiceError>;
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Deserialize)]
struct IndexSummary {
    name: String,
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub dimension: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

/// Control-plane client: lists, creates and describes indexes.
#[derive(Clone)]
pub struct PineconeClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
}

impl PineconeClient {
    pub fn new(api_key: ApiKey) -> Self {
        Self::with_base_url(api_key, PINECONE_CONTROL_URL)
    }

    pub fn with_base_url(api_key: ApiKey, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_indexes(&self) -> Result<Vec<String>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/indexes", self.base_url))
            .header("Api-Key", self.api_key.expose())
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .send()
            .await?;

        let list: IndexList = check_status(response).await?.json().await?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    pub async fn create_index(&self, settings: &IndexSettings) -> Result<(), ServiceError> {
        let request = CreateIndexRequest {
            name: &settings.name,
            dimension: settings.dimension,
            metric: &settings.metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &settings.cloud,
                    region: &settings.region,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.base_url))
            .header("Api-Key", self.api_key.expose())
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&request)
            .send()
            .await?;

        // Someone else created it between our list and create.
        if response.status() == StatusCode::CONFLICT {
            debug!(index = %settings.name, "index already exists");
            return Ok(());
        }

        check_status(response).await?;
        info!(
            index = %settings.name,
            dimension = settings.dimension,
            metric = %settings.metric,
            "created index"
        );
        Ok(())
    }

    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription, ServiceError> {
        let response = self
            .client
            .get(format!("{}/indexes/{}", self.base_url, name))
            .header("Api-Key", self.api_key.expose())
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .send()
            .await?;

        let description: IndexDescription = check_status(response).await?.json().await?;
        if description.host.trim().is_empty() {
            return Err(ServiceError::MalformedResponse {
                service: SERVICE,
                detail: format!("index '{}' has no host", name),
            });
        }
        Ok(description)
    }

    /// Create the index if it is absent, then connect to its data plane.
    pub async fn ensure_index(&self, settings: &IndexSettings) -> Result<PineconeIndex, ServiceError> {
        let existing = self.list_indexes().await?;
        if !existing.iter().any(|name| name == &settings.name) {
            self.create_index(settings).await?;
        }

        let description = self.describe_index(&settings.name).await?;
        if let Some(dimension) = description.dimension {
            if dimension != settings.dimension {
                warn!(
                    index = %settings.name,
                    expected = settings.dimension,
                    actual = dimension,
                    "index dimension differs from configured dimension"
                );
            }
        }

        Ok(PineconeIndex {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            name: description.name,
            host_url: host_url(&description.host),
        })
    }
}

/// Data-plane handle for one index.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    api_key: ApiKey,
    name: String,
    host_url: String,
}

impl PineconeIndex {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl VectorStore for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, ServiceError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_values: true,
            include_metadata: true,
        };

        debug!(index = %self.name, top_k, "querying index");

        let response = self
            .client
            .post(format!("{}/query", self.host_url))
            .header("Api-Key", self.api_key.expose())
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&request)
            .send()
            .await?;

        let result: QueryResponse = check_status(response).await?.json().await?;
        debug!(index = %self.name, matches = result.matches.len(), "query returned");
        Ok(result.matches)
    }
}

fn host_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(%status, "pinecone request failed");
    Err(ServiceError::Status {
        service: SERVICE,
        status,
        body,
    })
}
