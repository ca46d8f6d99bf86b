use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{
    error::RequestError,
    model::{TransportRequest, TransportResponse},
};

use super::{CancelHandle, Transport};

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, RequestError> {
        let TransportRequest {
            method,
            url,
            query,
            headers,
            body,
            timeout,
        } = request;

        let mut builder = self.http.request(method.into(), &url).timeout(timeout);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let res = builder
            .send()
            .await
            .map_err(|e| classify(e, &url, timeout))?;

        let status = res.status().as_u16();
        let headers: BTreeMap<String, String> = res
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let text = res.text().await.map_err(|e| classify(e, &url, timeout))?;
        tracing::trace!(%url, status, body = %truncate_body(&text), "response received");

        Ok(TransportResponse {
            status,
            headers,
            data: decode_body(&text),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancelHandle,
    ) -> Result<TransportResponse, RequestError> {
        let url = request.url.clone();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RequestError::Cancelled { url }),
            result = self.execute(request) => result,
        }
    }
}

fn classify(err: reqwest::Error, url: &str, timeout: Duration) -> RequestError {
    if err.is_timeout() {
        RequestError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        RequestError::Transport {
            url: url.to_string(),
            source: err,
        }
    }
}

/// JSON when it parses, the raw text otherwise, `null` when empty.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
