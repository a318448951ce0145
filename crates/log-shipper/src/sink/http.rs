// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP log sink.
//!
//! Batches are POSTed as a JSON document to
//! `{endpoint}/v1/groups/{group}/streams/{stream}/events`:
//!
//! ```json
//! {
//!   "log_group": "log-shipper",
//!   "log_stream": "default",
//!   "events": [{"timestamp": 1656581409123, "message": "line 1\n"}]
//! }
//! ```
//!
//! Bodies are optionally zstd-compressed. A failed request is reported to the
//! caller and never retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::SinkError;
use crate::event::LogEvent;
use crate::sink::Sink;

const API_KEY_HEADER: &str = "X-Api-Key";

/// Connection and destination settings for [`HttpSink`].
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Base URL of the sink, e.g. `https://logs.example.com`.
    pub endpoint: String,
    pub log_group: String,
    pub log_stream: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub https_proxy: Option<String>,
    pub use_compression: bool,
    pub compression_level: i32,
}

#[derive(Serialize)]
struct PutEventsRequest<'a> {
    log_group: &'a str,
    log_stream: &'a str,
    events: &'a [LogEvent],
}

#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    stream_url: Url,
    events_url: Url,
    headers: HeaderMap,
    log_group: String,
    log_stream: String,
    compression_level: Option<i32>,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self, SinkError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| SinkError::Endpoint(e.to_string()))?;
        let stream_url = stream_url(&endpoint, &config.log_group, &config.log_stream)?;
        let mut events_url = stream_url.clone();
        events_url
            .path_segments_mut()
            .map_err(|()| SinkError::Endpoint(config.endpoint.clone()))?
            .push("events");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let value =
                HeaderValue::from_str(api_key).map_err(|_| SinkError::Header(API_KEY_HEADER))?;
            headers.insert(API_KEY_HEADER, value);
        }
        if config.use_compression {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("zstd"));
        }

        Ok(HttpSink {
            client: get_client(&config),
            stream_url,
            events_url,
            headers,
            log_group: config.log_group,
            log_stream: config.log_stream,
            compression_level: config.use_compression.then_some(config.compression_level),
        })
    }

    fn encode(&self, events: &[LogEvent]) -> Result<Vec<u8>, SinkError> {
        let body = serde_json::to_vec(&PutEventsRequest {
            log_group: &self.log_group,
            log_stream: &self.log_stream,
            events,
        })
        .map_err(|e| SinkError::Payload(e.to_string()))?;

        match self.compression_level {
            Some(level) => zstd::stream::encode_all(body.as_slice(), level)
                .map_err(|e| SinkError::Payload(format!("zstd: {e}"))),
            None => Ok(body),
        }
    }
}

#[async_trait]
impl Sink for HttpSink {
    /// Creates the destination stream. An already existing stream is fine.
    async fn provision(&self) -> Result<(), SinkError> {
        let mut headers = self.headers.clone();
        headers.remove(CONTENT_ENCODING);
        let resp = self
            .client
            .put(self.stream_url.clone())
            .headers(headers)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            info!(
                "Created log stream {}/{}",
                self.log_group, self.log_stream
            );
            return Ok(());
        }
        if status == StatusCode::CONFLICT {
            debug!(
                "Log stream {}/{} already exists",
                self.log_group, self.log_stream
            );
            return Ok(());
        }
        Err(SinkError::Status {
            status,
            body: resp.text().await.unwrap_or_default(),
        })
    }

    async fn submit(&self, events: &[LogEvent]) -> Result<(), SinkError> {
        let body = self.encode(events)?;
        let resp = self
            .client
            .post(self.events_url.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::FORBIDDEN {
            error!("Request was denied by the log sink: access denied. Please verify that your API key is valid.");
        }
        Err(SinkError::Status {
            status,
            body: resp.text().await.unwrap_or_default(),
        })
    }
}

fn stream_url(endpoint: &Url, group: &str, stream: &str) -> Result<Url, SinkError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|()| SinkError::Endpoint(endpoint.to_string()))?
        .pop_if_empty()
        .extend(["v1", "groups", group, "streams", stream]);
    Ok(url)
}

/// Builds the client, falling back to a direct connection when the proxy
/// setting cannot be used.
fn get_client(config: &HttpSinkConfig) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to parse proxy configuration: {e}, falling back to direct connection");
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!("Failed to build HTTP client without proxy: {inner}, using reqwest defaults");
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &HttpSinkConfig, allow_proxy: bool) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(proxy) = &config.https_proxy {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }
    }
    builder.build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config(endpoint: String, use_compression: bool) -> HttpSinkConfig {
        HttpSinkConfig {
            endpoint,
            log_group: "test-task-group-1".to_string(),
            log_stream: "test-task-stream-1".to_string(),
            api_key: Some("mock-api-key".to_string()),
            timeout: Duration::from_secs(5),
            https_proxy: None,
            use_compression,
            compression_level: 6,
        }
    }

    const EVENTS_PATH: &str = "/v1/groups/test-task-group-1/streams/test-task-stream-1/events";
    const STREAM_PATH: &str = "/v1/groups/test-task-group-1/streams/test-task-stream-1";

    #[tokio::test]
    async fn test_submit_posts_json_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", EVENTS_PATH)
            .match_header("X-Api-Key", "mock-api-key")
            .match_header("Content-Type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "log_group": "test-task-group-1",
                "log_stream": "test-task-stream-1",
                "events": [
                    {"timestamp": 1, "message": "0\n"},
                    {"timestamp": 2, "message": "1\n"},
                ],
            })))
            .with_status(200)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url(), false)).unwrap();
        sink.submit(&[
            LogEvent::new(1, "0\n".to_string()),
            LogEvent::new(2, "1\n".to_string()),
        ])
        .await
        .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_compresses_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", EVENTS_PATH)
            .match_header("Content-Encoding", "zstd")
            .with_status(200)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url(), true)).unwrap();
        let events = [LogEvent::new(1, "compressed".to_string())];
        let body = sink.encode(&events).unwrap();
        let decoded: serde_json::Value =
            serde_json::from_slice(&zstd::stream::decode_all(body.as_slice()).unwrap()).unwrap();
        assert_eq!(decoded["events"][0]["message"], "compressed");

        sink.submit(&events).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_reports_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", EVENTS_PATH)
            .with_status(503)
            .with_body("throttled")
            .expect(1)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url(), false)).unwrap();
        let err = sink
            .submit(&[LogEvent::new(1, "x".to_string())])
            .await
            .unwrap_err();

        match err {
            SinkError::Status { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "throttled");
            }
            other => panic!("unexpected error {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_provision_creates_stream() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", STREAM_PATH)
            .with_status(201)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url(), true)).unwrap();
        sink.provision().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_provision_accepts_existing_stream() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", STREAM_PATH)
            .with_status(409)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url(), false)).unwrap();
        assert!(sink.provision().await.is_ok());
    }

    #[tokio::test]
    async fn test_provision_fails_on_denied() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", STREAM_PATH)
            .with_status(403)
            .create_async()
            .await;

        let sink = HttpSink::new(config(server.url(), false)).unwrap();
        assert!(matches!(
            sink.provision().await,
            Err(SinkError::Status { status: StatusCode::FORBIDDEN, .. })
        ));
    }

    #[test]
    fn test_endpoint_with_base_path() {
        let endpoint = Url::parse("https://logs.example.com/ingest/").unwrap();
        let url = stream_url(&endpoint, "group a", "s").unwrap();
        assert_eq!(
            url.as_str(),
            "https://logs.example.com/ingest/v1/groups/group%20a/streams/s"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        assert!(matches!(
            HttpSink::new(config("not a url".to_string(), false)),
            Err(SinkError::Endpoint(_))
        ));
    }
}
