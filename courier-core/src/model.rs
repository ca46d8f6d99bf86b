use std::{collections::BTreeMap, convert::TryFrom, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{config::ClientConfig, error::RequestError, interceptor::Interceptors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    pub const fn all() -> &'static [Method] {
        &[
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Patch,
            Method::Delete,
            Method::Head,
            Method::Options,
        ]
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Method {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.to_uppercase();

        Method::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown HTTP method '{value}'. Supported methods: GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS."
                )
            })
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Everything the caller says about one outbound request.
///
/// `data` is the payload regardless of method: for GET it is moved onto the
/// query string before any interceptor sees the descriptor. A descriptor
/// without a URL goes to the client's base address and is not tracked, so it
/// cannot be cancelled by URL.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: Option<String>,
    pub method: Method,
    pub data: Option<Value>,
    pub params: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub interceptors: Interceptors,
}

impl RequestDescriptor {
    pub fn new(method: Method) -> Self {
        Self {
            url: None,
            method,
            data: None,
            params: None,
            headers: BTreeMap::new(),
            timeout: None,
            interceptors: Interceptors::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get).url(url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post).url(url)
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize `payload` into `data`.
    pub fn json<T: Serialize>(self, payload: &T) -> Result<Self, RequestError> {
        Ok(self.data(serde_json::to_value(payload)?))
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn intercept_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestDescriptor) -> anyhow::Result<RequestDescriptor> + Send + Sync + 'static,
    {
        self.interceptors = self.interceptors.on_request(hook);
        self
    }

    pub fn intercept_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(TransportResponse) -> anyhow::Result<TransportResponse> + Send + Sync + 'static,
    {
        self.interceptors = self.interceptors.on_response(hook);
        self
    }

    /// The URL this request is tracked under, if any. Empty URLs are untracked.
    pub fn tracked_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// GET carries its payload as query parameters instead of a body.
    pub(crate) fn remap_payload(&mut self) {
        if self.method == Method::Get {
            if let Some(data) = self.data.take() {
                self.params = Some(data);
            }
        }
    }
}

/// A fully resolved request, as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl TransportRequest {
    pub(crate) fn resolve(
        descriptor: &RequestDescriptor,
        config: &ClientConfig,
    ) -> Result<Self, RequestError> {
        let url = join_url(&config.base_url, descriptor.url.as_deref().unwrap_or_default())?;

        let query = match &descriptor.params {
            Some(params) => flatten_params(params)?,
            None => Vec::new(),
        };

        let mut headers = config.headers.clone();
        headers.extend(descriptor.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let body = match descriptor.method {
            Method::Get => None,
            _ => descriptor.data.clone(),
        };

        Ok(Self {
            method: descriptor.method,
            url,
            query,
            headers,
            body,
            timeout: descriptor.timeout.unwrap_or_else(|| config.timeout()),
        })
    }
}

fn join_url(base: &str, url: &str) -> Result<String, RequestError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(url.to_string());
    }

    match (base.is_empty(), url.is_empty()) {
        (true, true) => Err(RequestError::InvalidRequest(
            "request has no URL and the client has no base address".into(),
        )),
        (true, false) => Ok(url.to_string()),
        (false, true) => Ok(base.to_string()),
        (false, false) => Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        )),
    }
}

fn flatten_params(params: &Value) -> Result<Vec<(String, String)>, RequestError> {
    let map = match params {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => map,
        other => {
            return Err(RequestError::InvalidRequest(format!(
                "query parameters must be an object, got {other}"
            )));
        }
    };

    Ok(map
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect())
}

/// The transport-level response envelope. Callers of `Client::dispatch`
/// only ever see `data`; interceptors see the whole envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub data: Value,
}

impl TransportResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Service-level body shape: `{ "statusCode": .., "desc": .., "result": .. }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub status_code: i64,
    pub desc: String,
    pub result: T,
}
