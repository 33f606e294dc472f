//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;

use http::StatusCode;
use httpfetch_core::{Decoder, DecoderRegistry};

use crate::{Client, ClientConfig, ClientError, ErrorFactory, FetchHook, Middleware, RoundTrip};

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use httpfetch::{ClientBuilder, Retry, SetHeader, Timeout};
///
/// let client = ClientBuilder::new("https://api.example.com/v1/")
///     .with_middleware(SetHeader::new("content-type", "application/json"))
///     .with_middleware(Retry::new(3))
///     .with_middleware(Timeout::new(Duration::from_secs(2)))
///     .build()?;
/// # Ok::<(), httpfetch::ClientError>(())
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with the given base URL.
    ///
    /// Request URIs are resolved against it like links in a document, so a
    /// base path only carries over to relative paths if it ends with `/`.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            config: ClientConfig::new(base_url),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Use a custom round-trip primitive instead of [`HyperTransport`].
    ///
    /// [`HyperTransport`]: crate::transport::HyperTransport
    pub fn transport<T: RoundTrip + 'static>(mut self, transport: T) -> Self {
        self.config.transport = Some(Arc::new(transport));
        self
    }

    /// Use a shared round-trip primitive.
    pub fn shared_transport(mut self, transport: Arc<dyn RoundTrip>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Add middleware to the client.
    ///
    /// Middleware is applied in the order it's added: the first one added
    /// sees the request first and the response last.
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.config.middleware.push(Arc::new(middleware));
        self
    }

    /// Decode every response with `decoder`, ignoring `Content-Type`.
    pub fn decoder<D: Decoder + 'static>(mut self, decoder: D) -> Self {
        self.config.decoder = Some(Arc::new(decoder));
        self
    }

    /// Look decoders up in `registry`.
    pub fn registry(mut self, registry: Arc<DecoderRegistry>) -> Self {
        self.config.registry = registry;
        self
    }

    /// Set the lowest status treated as an error.
    ///
    /// Default: `400 Bad Request`.
    pub fn error_threshold(mut self, status: StatusCode) -> Self {
        self.config.error_threshold = status;
        self
    }

    /// Set the factory for error payloads.
    ///
    /// Default: [`ApiMessage`](crate::ApiMessage).
    pub fn error_factory(mut self, factory: ErrorFactory) -> Self {
        self.config.error_factory = factory;
        self
    }

    /// Add a hook run over every successful fetch.
    ///
    /// Any hook replaces the default error-status hook; add an
    /// [`ErrorStatus`](crate::ErrorStatus) explicitly to keep it.
    pub fn with_fetch_hook<H: FetchHook + 'static>(mut self, hook: H) -> Self {
        self.config.fetch_hooks.push(Arc::new(hook));
        self
    }

    /// Get the configuration built so far.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the client.
    ///
    /// Fails with [`ClientError::Resolution`] if the base URL is malformed,
    /// or with the transport's error if the default transport can't be built.
    pub fn build(self) -> Result<Client, ClientError> {
        Client::from_config(self.config)
    }
}
