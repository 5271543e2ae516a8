//! HTTP client for the document API
//!
//! Implements [`DocumentSource`] over the backend's REST endpoints:
//!
//! | Method | Path | Returns |
//! |--------|------|---------|
//! | GET | `/documents` | document list (bare array or `{"documents": [...]}`) |
//! | GET | `/documents/{id}` | one document |
//! | GET | `/health` | 2xx when the API is up |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::polling::DocumentSource;
use crate::types::Document;

/// Response body of GET /documents
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocumentList {
    Bare(Vec<Document>),
    Wrapped { documents: Vec<Document> },
}

impl DocumentList {
    fn into_documents(self) -> Vec<Document> {
        match self {
            DocumentList::Bare(documents) => documents,
            DocumentList::Wrapped { documents } => documents,
        }
    }
}

/// HTTP client for the document API
pub struct DocumentClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl DocumentClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one document
    pub async fn get_document(&self, id: &str) -> Result<Document> {
        let url = self.document_url(id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Decode(e.to_string()))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(Error::NotFound(id.to_string()))
        } else {
            Err(api_error(response).await)
        }
    }

    /// Fetch every document
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let url = format!("{}/documents", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if response.status().is_success() {
            let list: DocumentList = response
                .json()
                .await
                .map_err(|e| Error::Decode(e.to_string()))?;
            Ok(list.into_documents())
        } else {
            Err(api_error(response).await)
        }
    }

    /// Check if the API is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.http_client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/documents/{}", self.base_url, urlencoding::encode(id))
    }
}

#[async_trait]
impl DocumentSource for DocumentClient {
    async fn fetch_status(&self, id: &str) -> Result<Document> {
        self.get_document(id).await
    }

    async fn fetch_all(&self) -> Result<Vec<Document>> {
        self.list_documents().await
    }
}

/// Turn a non-success response into [`Error::Api`].
async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    Error::Api { status, message }
}
