//! Pinecone vector database integration.
//!
//! Talks to an index's data-plane host directly over HTTPS:
//!
//! - `POST {host}/query` for similarity search with metadata
//! - `POST {host}/vectors/upsert` for writes
//!
//! Both requests carry the `Api-Key` and `X-Pinecone-API-Version` headers.

use super::vectorstore::VectorStore;
use crate::types::{AppError, IndexRecord, Result, SearchMatch};
use crate::utils::toml_config::PineconeConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Pinecone index client.
pub struct PineconeStore {
    client: Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
    api_version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    vectors: &'a [IndexRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

impl PineconeStore {
    pub fn new(api_key: String, host: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            host: normalize_host(&host.into()),
            namespace: None,
            api_version: "2024-07".to_string(),
        }
    }

    pub fn from_config(config: &PineconeConfig, api_key: String) -> Self {
        let mut store = Self::new(api_key, config.index_host.clone());
        store.namespace = config.namespace.clone().filter(|ns| !ns.is_empty());
        store.api_version = config.api_version.clone();
        store
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("Pinecone request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStore(format!(
                "Pinecone returned {}: {}",
                status, text
            )));
        }

        Ok(response)
    }
}

/// Accept a bare host or a full URL and drop any trailing slash.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn provider_name(&self) -> &'static str {
        "pinecone"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>> {
        let body = QueryBody {
            vector,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = self
            .post("/query", &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid Pinecone response: {}", e)))?;

        tracing::debug!(matches = response.matches.len(), "Pinecone query complete");
        Ok(response.matches)
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let body = UpsertBody {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };

        let response: UpsertResponse = self
            .post("/vectors/upsert", &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Invalid Pinecone response: {}", e)))?;

        Ok(response.upserted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("programs-abc.svc.pinecone.io"),
            "https://programs-abc.svc.pinecone.io"
        );
        assert_eq!(
            normalize_host("http://localhost:5081/"),
            "http://localhost:5081"
        );
    }

    #[test]
    fn test_query_body_shape() {
        let vector = [0.1_f32, 0.2];
        let body = QueryBody {
            vector: &vector,
            top_k: 5,
            include_metadata: true,
            namespace: None,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["topK"], 5);
        assert_eq!(json["includeMetadata"], true);
        assert!(json.get("namespace").is_none());
    }
}
