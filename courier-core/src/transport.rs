use std::fmt::Debug;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::RequestError,
    model::{TransportRequest, TransportResponse},
};

pub mod http;

pub use http::HttpTransport;

/// Capability to cancel one request. Clones share the same underlying token.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// The network primitive the client wraps.
///
/// Implementations must settle with `RequestError::Cancelled` once the handle
/// passed to `send` fires.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new()
    }

    async fn send(
        &self,
        request: TransportRequest,
        cancel: CancelHandle,
    ) -> Result<TransportResponse, RequestError>;
}
