//! The fetch client.
//!
//! [`Client`] resolves each request against its base URL, sends it through
//! the configured middleware and transport, buffers the response body once
//! and runs the fetch hooks. The result is a [`Fetch`] the caller decodes.

use std::sync::Arc;

use bytes::Bytes;
use http::Uri;
use http_body_util::BodyExt;
use httpfetch_core::{Decode, DecoderRegistry};
use url::Url;

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::builder::ClientBuilder;
use crate::fetch::BodyDecoder;
use crate::transport::{HyperTransport, ResponseBody};
use crate::{
    CallContext, ClientConfig, ClientError, ErrorStatus, Fetch, FetchHook, MiddlewareTransport,
    Request, RoundTrip, chain,
};

/// HTTP client running requests through a middleware pipeline.
///
/// Cloning is cheap; clones share the transport, middleware and registry.
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use httpfetch::{ApiMessage, Client};
///
/// #[derive(serde::Deserialize, Default)]
/// struct User {
///     name: String,
/// }
///
/// # async fn run() -> Result<(), httpfetch::ClientError> {
/// let client = Client::new("https://api.example.com/v1/")?;
///
/// let mut user = User::default();
/// let request = http::Request::get("/users/42").body(Bytes::new()).unwrap();
/// match client.execute(request, &mut user).await {
///     Ok(()) => println!("user: {}", user.name),
///     Err(err) => match err.payload::<ApiMessage>() {
///         Some(msg) => eprintln!("server said: {}", msg.message),
///         None => eprintln!("failed: {err}"),
///     },
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    transport: Arc<dyn RoundTrip>,
    decoder: BodyDecoder,
    hooks: Arc<[Arc<dyn FetchHook>]>,
    registry: Arc<DecoderRegistry>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("decoder", &self.decoder)
            .field("hook_count", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new ClientBuilder with the given base URL.
    ///
    /// This is a convenience method equivalent to `ClientBuilder::new(base_url)`.
    pub fn builder<S: Into<String>>(base_url: S) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Create a client with default settings.
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self, ClientError> {
        ClientBuilder::new(base_url).build()
    }

    /// Create a client with default settings, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the base URL is malformed or the default transport can't be
    /// built.
    pub fn must<S: Into<String>>(base_url: S) -> Self {
        match Self::new(base_url) {
            Ok(client) => client,
            Err(err) => panic!("http client: {err}"),
        }
    }

    /// Build a client from explicit settings.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Resolution(format!(
                "base URL cannot be a base: {base_url}"
            )));
        }

        let primitive: Arc<dyn RoundTrip> = match config.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };
        let transport: Arc<dyn RoundTrip> = if config.middleware.is_empty() {
            primitive
        } else {
            Arc::new(MiddlewareTransport::new(primitive, chain(config.middleware)))
        };

        let hooks: Vec<Arc<dyn FetchHook>> = if config.fetch_hooks.is_empty() {
            vec![Arc::new(ErrorStatus::new(
                config.error_threshold,
                config.error_factory,
            ))]
        } else {
            config.fetch_hooks
        };

        Ok(Self {
            base_url,
            transport,
            decoder: BodyDecoder::new(config.decoder, config.registry.clone()),
            hooks: hooks.into(),
            registry: config.registry,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the decoder registry.
    pub fn registry(&self) -> &Arc<DecoderRegistry> {
        &self.registry
    }

    /// Send `request` and buffer the response.
    ///
    /// The request URI may be relative; it is resolved against the base URL.
    /// A [`CallContext`] in the request extensions bounds the whole fetch,
    /// including body buffering. Errors are recorded in the returned
    /// [`Fetch`] rather than returned.
    pub async fn fetch(&self, request: Request) -> Fetch {
        #[cfg(feature = "tracing")]
        let span = info_span!(
            "http.fetch",
            http.method = %request.method(),
            http.url = tracing::field::Empty,
            otel.kind = "client",
        );

        let fetch = self.run(request);

        #[cfg(feature = "tracing")]
        let fetch = fetch.instrument(span);

        fetch.await
    }

    /// Fetch and decode the response body into `output`.
    pub async fn execute(
        &self,
        request: Request,
        output: &mut dyn Decode,
    ) -> Result<(), ClientError> {
        self.fetch(request).await.decode(output)
    }

    async fn run(&self, mut request: Request) -> Fetch {
        let uri = match self.resolve(request.uri()) {
            Ok(uri) => uri,
            Err(err) => return Fetch::failed(err, self.decoder.clone()),
        };

        #[cfg(feature = "tracing")]
        tracing::Span::current().record("http.url", tracing::field::display(&uri));

        *request.uri_mut() = uri;
        let ctx = CallContext::from_request(&request);

        let response = match self.transport.round_trip(request).await {
            Ok(response) => response,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %err, "fetch failed");
                return Fetch::failed(err, self.decoder.clone());
            }
        };

        let (parts, body) = response.into_parts();

        #[cfg(feature = "tracing")]
        tracing::debug!(status = parts.status.as_u16(), "response received");

        let fetch = match buffer(body, &ctx).await {
            Ok(bytes) => Fetch::completed(parts, bytes, self.decoder.clone()),
            Err(err) => Fetch::completed(parts, Bytes::new(), self.decoder.clone()).fail(err),
        };

        self.hooks
            .iter()
            .fold(fetch, |fetch, hook| fetch.with(hook.as_ref()))
    }

    fn resolve(&self, uri: &Uri) -> Result<Uri, ClientError> {
        let resolved = self.base_url.join(&uri.to_string())?;
        resolved
            .as_str()
            .parse()
            .map_err(|e| ClientError::Resolution(format!("{resolved}: {e}")))
    }
}

/// Read the whole body, giving up when the call's scope ends.
///
/// The body is dropped on return either way.
async fn buffer(body: ResponseBody, ctx: &CallContext) -> Result<Bytes, ClientError> {
    tokio::select! {
        biased;
        err = ctx.done() => Err(err),
        collected = body.collect() => collected.map(|c| c.to_bytes()),
    }
}
