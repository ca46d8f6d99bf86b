//! Request/response hooks and the order they are composed in.
//!
//! Request path: built-in pass-through, instance hook, per-request hook.
//! Response path (success only): per-request hook, instance hook, built-in
//! envelope unwrap. The unwrap always runs last so callers never see the
//! transport envelope.

use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::{
    error::RequestError,
    model::{RequestDescriptor, TransportResponse},
};

pub type RequestHook =
    Arc<dyn Fn(RequestDescriptor) -> anyhow::Result<RequestDescriptor> + Send + Sync>;

pub type ResponseHook =
    Arc<dyn Fn(TransportResponse) -> anyhow::Result<TransportResponse> + Send + Sync>;

/// A request hook and a response hook. Unset hooks are the identity.
#[derive(Clone)]
pub struct Interceptors {
    request: RequestHook,
    response: ResponseHook,
}

impl Default for Interceptors {
    fn default() -> Self {
        Self {
            request: Arc::new(Ok::<RequestDescriptor, anyhow::Error>),
            response: Arc::new(Ok::<TransportResponse, anyhow::Error>),
        }
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors").finish_non_exhaustive()
    }
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestDescriptor) -> anyhow::Result<RequestDescriptor> + Send + Sync + 'static,
    {
        self.request = Arc::new(hook);
        self
    }

    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(TransportResponse) -> anyhow::Result<TransportResponse> + Send + Sync + 'static,
    {
        self.response = Arc::new(hook);
        self
    }

    fn apply_request(&self, descriptor: RequestDescriptor) -> Result<RequestDescriptor, RequestError> {
        (self.request)(descriptor).map_err(RequestError::Interceptor)
    }

    fn apply_response(&self, response: TransportResponse) -> Result<TransportResponse, RequestError> {
        (self.response)(response).map_err(RequestError::Interceptor)
    }
}

/// Slot for preprocessing shared by every client. Currently forwards as-is.
fn pass_through(descriptor: RequestDescriptor) -> RequestDescriptor {
    tracing::trace!(url = ?descriptor.url, method = %descriptor.method, "request pass-through");
    descriptor
}

fn unwrap_envelope(response: TransportResponse) -> Value {
    response.data
}

pub(crate) fn run_request_chain(
    instance: &Interceptors,
    per_request: &Interceptors,
    descriptor: RequestDescriptor,
) -> Result<RequestDescriptor, RequestError> {
    let descriptor = pass_through(descriptor);
    let descriptor = instance.apply_request(descriptor)?;
    per_request.apply_request(descriptor)
}

pub(crate) fn run_response_chain(
    instance: &Interceptors,
    per_request: &Interceptors,
    response: TransportResponse,
) -> Result<Value, RequestError> {
    let response = per_request.apply_response(response)?;
    let response = instance.apply_response(response)?;
    Ok(unwrap_envelope(response))
}
