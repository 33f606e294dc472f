//! Client configuration.
//!
//! [`ClientConfig`] lists every setting a [`Client`](crate::Client) accepts,
//! each with its default. [`ClientBuilder`](crate::ClientBuilder) is the
//! fluent front for it.

use std::sync::Arc;

use http::StatusCode;
use httpfetch_core::{DecoderRegistry, SharedDecoder};

use crate::{ApiMessage, ErrorFactory, FetchHook, Middleware, RoundTrip};

/// Settings for a [`Client`](crate::Client).
///
/// | Field | Default |
/// |-------|---------|
/// | `base_url` | required |
/// | `transport` | [`HyperTransport::new()`](crate::transport::HyperTransport::new) |
/// | `middleware` | none, the transport is called directly |
/// | `decoder` | none, the registry is keyed by `Content-Type` |
/// | `registry` | [`DecoderRegistry::with_defaults()`] |
/// | `error_threshold` | `400 Bad Request` |
/// | `error_factory` | [`ApiMessage::factory()`] |
/// | `fetch_hooks` | none, an [`ErrorStatus`](crate::ErrorStatus) hook is installed |
///
/// `error_threshold` and `error_factory` only apply to the default hook.
/// Configuring `fetch_hooks` replaces it.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL that request URIs are resolved against.
    pub base_url: String,
    /// Round-trip primitive at the bottom of the middleware chain.
    pub transport: Option<Arc<dyn RoundTrip>>,
    /// Middleware, outermost first.
    pub middleware: Vec<Arc<dyn Middleware>>,
    /// Decoder used for every response instead of the registry.
    pub decoder: Option<SharedDecoder>,
    /// Decoders keyed by media type.
    pub registry: Arc<DecoderRegistry>,
    /// Lowest status reified into [`ClientError::Status`](crate::ClientError::Status).
    pub error_threshold: StatusCode,
    /// Builds the payload that error bodies are decoded into.
    pub error_factory: ErrorFactory,
    /// Hooks run over every successful fetch, in order.
    pub fetch_hooks: Vec<Arc<dyn FetchHook>>,
}

impl ClientConfig {
    /// Default settings for `base_url`.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            transport: None,
            middleware: Vec::new(),
            decoder: None,
            registry: Arc::new(DecoderRegistry::with_defaults()),
            error_threshold: StatusCode::BAD_REQUEST,
            error_factory: ApiMessage::factory(),
            fetch_hooks: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("transport", &self.transport.is_some())
            .field("middleware_count", &self.middleware.len())
            .field("decoder", &self.decoder.is_some())
            .field("registry", &self.registry)
            .field("error_threshold", &self.error_threshold)
            .field("fetch_hook_count", &self.fetch_hooks.len())
            .finish()
    }
}
