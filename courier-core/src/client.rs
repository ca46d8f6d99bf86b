//! Request dispatch and cancellation for one client instance.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::ClientConfig,
    error::RequestError,
    interceptor::{self, Interceptors},
    model::{RequestDescriptor, TransportRequest},
    registry::InFlightRegistry,
    status,
    transport::{HttpTransport, Transport},
};

/// A managed HTTP client.
///
/// Owns its in-flight registry, so two clients never see or cancel each
/// other's requests. Instance interceptors are fixed once the client is in
/// use; wrap it in an `Arc` to dispatch from several tasks.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    interceptors: Interceptors,
    registry: InFlightRegistry,
}

impl Client {
    /// Client backed by `reqwest`. The deadline is applied per request by the transport.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::with_transport(config, Arc::new(HttpTransport::new())))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            interceptors: Interceptors::default(),
            registry: InFlightRegistry::new(),
        }
    }

    pub fn with_interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request and resolve with its unwrapped payload.
    ///
    /// A request with a URL is tracked from just before the transport call
    /// until it settles, whatever the outcome, and can be cancelled by that
    /// URL in the meantime.
    pub async fn dispatch(&self, mut descriptor: RequestDescriptor) -> Result<Value, RequestError> {
        descriptor.remap_payload();

        let per_request = descriptor.interceptors.clone();
        let descriptor =
            interceptor::run_request_chain(&self.interceptors, &per_request, descriptor)?;
        let request = TransportRequest::resolve(&descriptor, &self.config)?;

        let cancel = self.transport.cancel_handle();
        let _registration = descriptor
            .tracked_url()
            .map(|url| self.registry.register(url, cancel.clone()));

        let method = request.method;
        let url = request.url.clone();
        let response = match self.transport.send(request, cancel).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%method, %url, error = %err, "request failed");
                return Err(err);
            }
        };

        if !response.is_success() {
            tracing::warn!(%method, %url, status = response.status, "request returned error status");
            return Err(RequestError::Status {
                status: response.status,
                message: status::translate(response.status),
                body: response.data,
            });
        }

        interceptor::run_response_chain(&self.interceptors, &per_request, response)
    }

    /// `dispatch`, then decode the payload into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<T, RequestError> {
        let payload = self.dispatch(descriptor).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Cancel the first in-flight request tracked under `url`. Unknown URLs are ignored.
    pub fn cancel_one(&self, url: &str) {
        self.registry.cancel_one(url);
    }

    pub fn cancel_many<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            self.registry.cancel_one(url.as_ref());
        }
    }

    pub fn cancel_all(&self) {
        self.registry.cancel_all();
    }

    /// URLs currently in flight, in registration order.
    pub fn in_flight(&self) -> Vec<String> {
        self.registry.urls()
    }

    pub fn in_flight_len(&self) -> usize {
        self.registry.len()
    }
}
