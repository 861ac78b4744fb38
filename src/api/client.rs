use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::error::QueryError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, QueryError>> + Send>>;

const SCRAPE_AND_SUMMARIZE_PATH: &str = "scrape_and_summarize/";
const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, query: &str) -> Result<ByteStream, QueryError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    message: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_url.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:8000".to_string(),
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn request_url(&self) -> String {
        format!(
            "{}/{SCRAPE_AND_SUMMARIZE_PATH}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Send the query and hand back the NDJSON body as a byte stream.
    ///
    /// Non-2xx responses are read in full to extract the server's error
    /// message and never reach the caller as a stream.
    pub async fn create_stream(&self, query: &str) -> Result<ByteStream, QueryError> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(query);
            }
        }

        let request_url = self.request_url();
        let payload = json!({ "user_query": query });

        if debug_payload_enabled() {
            emit_debug_payload(&request_url, &payload);
        }

        let response = self
            .http
            .post(&request_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_request_error(error, &request_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = http_error_message(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), %message, "backend rejected query");
            return Err(QueryError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(NDJSON_CONTENT_TYPE) {
            tracing::debug!(content_type, "unexpected content type for progress stream");
        }

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }

    /// `GET <base-url>/`: the backend answers with `{"message": "..."}`.
    pub async fn health_check(&self) -> Result<String, QueryError> {
        let request_url = format!("{}/", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&request_url)
            .send()
            .await
            .map_err(|error| map_request_error(error, &request_url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| map_request_error(error, &request_url))?;
        if !status.is_success() {
            return Err(QueryError::Http {
                status: status.as_u16(),
                message: http_error_message(status.as_u16(), &body),
            });
        }

        Ok(health_message(&body))
    }
}

/// Error text for a non-2xx response: the body's `error` field when present,
/// otherwise a message carrying the status code.
pub fn http_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {status}"))
}

fn health_message(body: &str) -> String {
    match serde_json::from_str::<HealthBody>(body) {
        Ok(HealthBody {
            message: Some(message),
        }) => message,
        _ => body.trim().to_string(),
    }
}

/// Loopback and unspecified addresses, plus `localhost`. The parser has
/// already lowercased the host.
fn is_local_backend(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified()),
        None => false,
    }
}

fn map_request_error(error: reqwest::Error, request_url: &str) -> QueryError {
    let local = match error.url() {
        Some(url) => is_local_backend(url),
        None => Url::parse(request_url).is_ok_and(|url| is_local_backend(&url)),
    };
    if error.is_connect() && local {
        return QueryError::transport(format!(
            "cannot reach local backend '{request_url}': {error}. Start the backend or set WEBSCOUT_API_URL."
        ));
    }
    if error.is_connect() {
        return QueryError::transport(format!("cannot reach backend '{request_url}': {error}"));
    }
    if error.is_timeout() {
        return QueryError::transport(format!("request to '{request_url}' timed out: {error}"));
    }
    QueryError::transport(error.to_string())
}
