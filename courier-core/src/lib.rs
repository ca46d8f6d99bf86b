//! Core library for the `courier` request layer.
//!
//! This crate defines:
//! - A `Client` that dispatches requests through interceptors to a transport
//! - In-flight tracking by URL with cooperative cancellation
//! - Error taxonomy and status-code translation
//! - Configuration handling
//!
//! It is used by `courier-cli`, but any caller that needs cancellable,
//! intercepted HTTP requests can embed it.

pub mod client;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod model;
pub mod registry;
pub mod status;
pub mod transport;

pub use client::Client;
pub use config::{ClientConfig, Config, WeatherCredentials};
pub use error::RequestError;
pub use interceptor::Interceptors;
pub use model::{ApiEnvelope, Method, RequestDescriptor, TransportRequest, TransportResponse};
pub use transport::{CancelHandle, HttpTransport, Transport};
