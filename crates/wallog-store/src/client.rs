//! OData-style Web API implementation of [`RemoteStore`].

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::CachedToken;
use crate::batch::{build_batch_body, parse_batch_response, BatchOperation, BatchOutcome};
use crate::error::{StoreError, StoreResult};
use crate::query::{QueryPage, QuerySpec};
use crate::record::RecordData;
use crate::traits::RemoteStore;

/// Connection settings for the Web API endpoint.
#[derive(Debug, Clone)]
pub struct WebApiConfig {
    /// Service root, e.g. `https://org.example.com/api/data/v9.2`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl WebApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: 30,
        }
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn validate(&self) -> StoreResult<()> {
        if self.base_url.is_empty() {
            return Err(StoreError::invalid_configuration("base_url is empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(StoreError::invalid_configuration(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// `reqwest`-backed [`RemoteStore`] for the shard Web API.
pub struct WebApiStore {
    config: WebApiConfig,
    http: Client,
    token: CachedToken,
}

impl WebApiStore {
    pub fn new(config: WebApiConfig, token: CachedToken) -> StoreResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                StoreError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http,
            token,
        })
    }

    /// The configured service root.
    #[must_use]
    pub fn service_root(&self) -> &str {
        &self.config.base_url
    }

    async fn get_page(&self, url: &str, query: &[(String, String)], page_size_hint: Option<u32>) -> StoreResult<QueryPage> {
        let bearer = self.token.bearer().await?;

        let mut request = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(hint) = page_size_hint {
            request = request.header("Prefer", format!("odata.maxpagesize={hint}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::connection_failed_with_source("query request failed", e))?;

        let response = check_status(response).await?;
        let envelope: QueryEnvelope = response
            .json()
            .await
            .map_err(|e| StoreError::malformed_response(format!("query body: {e}")))?;

        let mut items = Vec::with_capacity(envelope.value.len());
        for row in envelope.value {
            match RecordData::from_value(row) {
                Some(record) => items.push(record),
                // A corrupt row must not abort the scan.
                None => warn!(url, "Skipping non-object row in query result"),
            }
        }

        Ok(QueryPage {
            items,
            next_link: envelope.next_link,
            total_count: envelope.count,
        })
    }
}

#[async_trait]
impl RemoteStore for WebApiStore {
    async fn query(&self, collection: &str, spec: &QuerySpec) -> StoreResult<QueryPage> {
        let url = format!("{}/{collection}", self.config.base_url);

        let mut query: Vec<(String, String)> = Vec::new();
        if !spec.select.is_empty() {
            query.push(("$select".to_string(), spec.select.join(",")));
        }
        if let Some(filter) = &spec.filter {
            query.push(("$filter".to_string(), filter.render()));
        }
        if let Some(order_by) = &spec.order_by {
            query.push(("$orderby".to_string(), order_by.clone()));
        }
        if let Some(top) = spec.top {
            query.push(("$top".to_string(), top.to_string()));
        }
        if spec.include_count {
            query.push(("$count".to_string(), "true".to_string()));
        }

        debug!(collection, "Querying collection");
        self.get_page(&url, &query, spec.page_size_hint).await
    }

    async fn query_next(&self, next_link: &str) -> StoreResult<QueryPage> {
        // Continuation tokens are absolute URLs; pass them through as-is.
        self.get_page(next_link, &[], None).await
    }

    async fn fetch_by_id(
        &self,
        collection: &str,
        id: &str,
        select: Option<&[String]>,
    ) -> StoreResult<RecordData> {
        let bearer = self.token.bearer().await?;
        let url = format!("{}/{collection}({id})", self.config.base_url);

        let mut request = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .header(header::ACCEPT, "application/json");
        if let Some(columns) = select {
            if !columns.is_empty() {
                request = request.query(&[("$select", columns.join(","))]);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::connection_failed_with_source("fetch request failed", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(collection, id));
        }

        let response = check_status(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::malformed_response(format!("record body: {e}")))?;

        RecordData::from_value(body)
            .ok_or_else(|| StoreError::malformed_response("record body is not a JSON object"))
    }

    async fn submit_batch(&self, operations: &[BatchOperation]) -> StoreResult<BatchOutcome> {
        let bearer = self.token.bearer().await?;

        let boundary = format!("batch_{}", Uuid::new_v4());
        let body = build_batch_body(&boundary, &self.config.base_url, operations);

        debug!(operations = operations.len(), "Submitting batch");

        let response = self
            .http
            .post(format!("{}/$batch", self.config.base_url))
            .bearer_auth(bearer)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/mixed; boundary={boundary}"),
            )
            .header(header::ACCEPT, "application/json")
            .header("Prefer", "odata.continue-on-error")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::connection_failed_with_source("batch request failed", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::malformed_response(format!("batch body: {e}")))?;

        // A non-2xx batch status is a reportable outcome, not a
        // transport error: the pipeline decides what it means for the
        // chunk.
        Ok(BatchOutcome {
            ok: status.is_success(),
            status: status.as_u16(),
            responses: parse_batch_response(&text),
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = remote_error_message(&body).unwrap_or(body);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(StoreError::authentication_failed(format!(
            "{status}: {message}"
        )))
    } else if status.is_server_error() {
        Err(StoreError::unavailable(status.as_u16(), message))
    } else {
        Err(StoreError::rejected(status.as_u16(), message))
    }
}

fn remote_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_normalizes_trailing_slash() {
        let config = WebApiConfig::new("https://host/api/data/v9.2/");
        assert_eq!(config.base_url, "https://host/api/data/v9.2");
    }

    #[test]
    fn test_config_rejects_non_http() {
        let config = WebApiConfig::new("ftp://host");
        assert!(config.validate().is_err());
        assert!(WebApiConfig::new("").validate().is_err());
    }

    #[test]
    fn test_remote_error_message_extraction() {
        let body = r#"{"error":{"code":"0x0","message":"Attribute does not exist"}}"#;
        assert_eq!(
            remote_error_message(body).as_deref(),
            Some("Attribute does not exist")
        );
        assert_eq!(remote_error_message("plain text"), None);
    }
}
