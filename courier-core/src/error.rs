use std::time::Duration;

use thiserror::Error;

/// Every way a dispatched request can fail.
///
/// Cancellation is its own variant so callers can tell a deliberate
/// `cancel_*` apart from a network failure. `Status` keeps the raw code and
/// body next to the translated message.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("interceptor failed: {0:#}")]
    Interceptor(anyhow::Error),

    #[error("failed to decode response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled { .. })
    }

    /// HTTP status of a non-2xx response, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_distinguishable() {
        let err = RequestError::Cancelled {
            url: "https://example.test/a".into(),
        };
        assert!(err.is_cancelled());
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("was cancelled"));
    }

    #[test]
    fn status_error_keeps_code_and_body() {
        let err = RequestError::Status {
            status: 404,
            message: crate::status::translate(404),
            body: serde_json::json!({ "error": "missing" }),
        };
        assert!(!err.is_cancelled());
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), crate::status::translate(404));

        let RequestError::Status { body, .. } = err else {
            panic!("expected status error");
        };
        assert_eq!(body["error"], "missing");
    }

    #[test]
    fn interceptor_error_shows_context_chain() {
        let inner = anyhow::anyhow!("missing token").context("auth hook");
        let err = RequestError::Interceptor(inner);
        let msg = err.to_string();
        assert!(msg.contains("auth hook"));
        assert!(msg.contains("missing token"));
    }
}
