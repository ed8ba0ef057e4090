//! Blocking HTTP implementation of [`DatasetTransport`].
//!
//! Every JSON endpoint answers with an envelope: success bodies are objects with a `data`
//! key, error bodies may carry `errorMessage` / `errorMessageDisplay`. [`handle_response`]
//! maps status codes and envelopes onto [`TransportError`].

use std::fmt;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use serde_json::json;
use tracing::{debug, error};

use crate::error::TransportError;

use super::config::{ClientConfig, API_KEY_ENV_VAR};
use super::{dashboard_url, CreateDatasetResponse, DatasetTransport, TriggerIngestResponse};

const OCTET_STREAM: &str = "application/octet-stream";

/// Transport speaking to the hosted API over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    api_key: String,
    base_url: String,
    client: Client,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport from `config`.
    ///
    /// Fails with [`TransportError::Authentication`] when no API key is configured.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let api_key = config.api_key.ok_or_else(|| {
            TransportError::Authentication(format!(
                "No API key found. Set one with the environment variable '{API_KEY_ENV_VAR}' \
                 or ClientConfig::with_api_key"
            ))
        })?;
        // The upload redirect is followed by hand, without the bearer token.
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            api_key,
            base_url: config.base_url,
            client,
        })
    }

    /// Build a transport from [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, TransportError> {
        Self::new(ClientConfig::from_env())
    }

    fn full_url(&self, url_path: &str) -> String {
        format!("{}/{url_path}", self.base_url)
    }

    fn post_json(&self, url_path: &str, content: &serde_json::Value) -> Result<serde_json::Value, TransportError> {
        let response = self
            .client
            .post(self.full_url(url_path))
            .bearer_auth(&self.api_key)
            .json(content)
            .send()?;
        let data = check_response(response, "POST", true)?;
        data.ok_or_else(|| TransportError::Server("Malformed server response.".to_string()))
    }

    /// PUT raw bytes via the redirect the API answers with.
    ///
    /// The first request carries an empty body so the payload is only sent once, to the
    /// storage endpoint named in the `Location` header.
    fn put_bytes(&self, url_path: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let response = self
            .client
            .put(self.full_url(url_path))
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(Vec::<u8>::new())
            .send()?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let target = match location {
            Some(location) if status.is_redirection() => response
                .url()
                .join(&location)
                .map_err(|e| TransportError::Server(format!("Invalid redirect location '{location}': {e}")))?,
            _ => {
                let body = response.text().unwrap_or_default();
                error!(%status, body = %body, "expected a redirect for data upload");
                return Err(TransportError::Server(format!(
                    "Expected redirect but got: {}",
                    status.as_u16()
                )));
            }
        };

        let response = self
            .client
            .put(target)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(data)
            .send()?;
        check_response(response, "PUT", false)?;
        Ok(())
    }
}

impl DatasetTransport for HttpTransport {
    /// Wraps: `POST /dataset`
    fn create_dataset(
        &self,
        name: &str,
        embedding_column: Option<&str>,
    ) -> Result<CreateDatasetResponse, TransportError> {
        let data = self.post_json("dataset", &json!({"name": name, "embeddingColumn": embedding_column}))?;
        let dataset_id = data.get("datasetId").and_then(|v| v.as_str());
        let row_limit = data
            .get("rowLimit")
            .and_then(|v| v.as_u64())
            .and_then(|n| usize::try_from(n).ok());
        match (dataset_id, row_limit) {
            (Some(dataset_id), Some(row_limit)) => Ok(CreateDatasetResponse {
                dataset_id: dataset_id.to_string(),
                row_limit,
            }),
            _ => Err(TransportError::Server(format!("Malformed response: {data}"))),
        }
    }

    /// Wraps: `PUT /dataset/{id}/source?format=parquet`
    fn upload_dataset_data(&self, dataset_id: &str, data: Vec<u8>) -> Result<(), TransportError> {
        debug!(dataset_id, bytes = data.len(), "uploading dataset source data");
        self.put_bytes(&format!("dataset/{dataset_id}/source?format=parquet"), data)
    }

    /// Wraps: `POST /dataset/{id}/ingest`
    fn trigger_dataset_ingest(&self, dataset_id: &str) -> Result<TriggerIngestResponse, TransportError> {
        let data = self.post_json(&format!("dataset/{dataset_id}/ingest"), &json!({}))?;
        match data.get("ingestionJobId").and_then(|v| v.as_str()) {
            Some(job_id) => Ok(TriggerIngestResponse {
                ingest_job_id: job_id.to_string(),
            }),
            None => Err(TransportError::Server(format!("Malformed response: {data}"))),
        }
    }

    fn dataset_dashboard_url(&self, dataset_id: &str) -> String {
        dashboard_url(&self.base_url, dataset_id)
    }
}

fn check_response(
    response: Response,
    method: &str,
    expect_json: bool,
) -> Result<Option<serde_json::Value>, TransportError> {
    let status = response.status().as_u16();
    let url_path = response.url().path().to_string();
    let body = response.text()?;
    handle_response(status, &body, method, &url_path, expect_json)
}

/// Map a response onto the API's envelope contract.
///
/// - 401/403: [`TransportError::Authentication`]; 404: [`TransportError::NotFound`];
///   other 4xx: [`TransportError::BadRequest`]; anything else outside 2xx:
///   [`TransportError::Server`].
/// - The error message is `errorMessageDisplay`, else `errorMessage`, else a generic
///   description of the request.
/// - With `expect_json`, a 2xx body must be a JSON object with a `data` key, whose value is
///   returned; otherwise `Ok(None)`.
pub fn handle_response(
    status: u16,
    body: &str,
    method: &str,
    url_path: &str,
    expect_json: bool,
) -> Result<Option<serde_json::Value>, TransportError> {
    let parsed: Option<serde_json::Value> = match serde_json::from_str(body) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!("response did not contain json: {e}");
            None
        }
    };

    let error_message = parsed.as_ref().and_then(|v| {
        let non_empty = |key: &str| v.get(key).and_then(|m| m.as_str()).filter(|m| !m.is_empty());
        non_empty("errorMessageDisplay").or_else(|| non_empty("errorMessage"))
    });
    let message = error_message
        .map(str::to_string)
        .unwrap_or_else(|| format!("Got '{status}' from {method} to {url_path}"));

    match status {
        401 | 403 => {
            error!(status, body, "authentication error response");
            return Err(TransportError::Authentication(message));
        }
        404 => return Err(TransportError::NotFound(message)),
        400..=499 => return Err(TransportError::BadRequest(message)),
        200..=299 => {}
        // 1xx and 3xx are not expected from the API either.
        _ => {
            error!(status, body, "server error response");
            return Err(TransportError::Server(message));
        }
    }

    if !expect_json {
        return Ok(None);
    }
    match parsed {
        Some(serde_json::Value::Object(mut map)) if map.contains_key("data") => Ok(map.remove("data")),
        _ => {
            error!(body, "malformed response");
            Err(TransportError::Server("Malformed server response.".to_string()))
        }
    }
}
