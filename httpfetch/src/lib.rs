//! Outbound HTTP fetch pipeline.
//!
//! This crate sends requests through a composable chain of transport
//! middleware, buffers each response body exactly once, and decodes it with a
//! decoder picked by the response's `Content-Type`.
//!
//! ## Features
//!
//! - Middleware chains over any round-trip primitive ([`Middleware`], [`chain`])
//! - Retry with linear or exponential backoff ([`Retry`])
//! - Per-attempt deadlines ([`Timeout`]) and per-call cancellation ([`CallContext`])
//! - Pluggable decoders keyed by media type ([`DecoderRegistry`])
//! - Error statuses reified into typed, decoded errors ([`ClientError::Status`])
//! - A hyper + rustls transport ([`HyperTransport`])
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use httpfetch::Client;
//!
//! #[derive(serde::Deserialize, Default)]
//! struct Status {
//!     ok: bool,
//! }
//!
//! # async fn run() -> Result<(), httpfetch::ClientError> {
//! let client = Client::new("http://localhost:3000")?;
//!
//! let mut status = Status::default();
//! let request = http::Request::get("/api/status").body(Bytes::new()).unwrap();
//! client.execute(request, &mut status).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Retries and Timeouts
//!
//! Middleware runs in the order it is added. Putting [`Timeout`] after
//! [`Retry`] bounds each attempt; a [`CallContext`] attached to the request
//! bounds the whole call, backoff waits included.
//!
//! ```no_run
//! use std::time::Duration;
//! use bytes::Bytes;
//! use httpfetch::{Backoff, CallContext, Client, Retry, Timeout};
//!
//! # async fn run() -> Result<(), httpfetch::ClientError> {
//! let client = Client::builder("https://api.example.com")
//!     .with_middleware(
//!         Retry::new(3)
//!             .backoff(Backoff::exponential(
//!                 Duration::from_millis(100),
//!                 1.6,
//!                 Duration::from_secs(5),
//!                 0.2,
//!             ))
//!             .retry_on_server_errors()
//!             .retry_on_status([http::StatusCode::TOO_MANY_REQUESTS]),
//!     )
//!     .with_middleware(Timeout::new(Duration::from_secs(2)))
//!     .build()?;
//!
//! let ctx = CallContext::with_timeout(Duration::from_secs(10));
//! let request = ctx.attach(http::Request::get("/items").body(Bytes::new()).unwrap());
//! let fetch = client.fetch(request).await;
//! if let Some(err) = fetch.error() {
//!     eprintln!("fetch failed: {err}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Statuses
//!
//! By default any status `>= 400` becomes [`ClientError::Status`], with the
//! body decoded into an [`ApiMessage`] (`{"message": "..."}`). Use
//! [`ClientBuilder::error_threshold`] and [`ClientBuilder::error_factory`] to
//! change either, or [`ClientBuilder::with_fetch_hook`] to replace the check.
//!
//! ## Feature Flags
//!
//! - `json` (default) - registers [`JsonDecoder`] for `application/json`
//! - `tls` (default) - rustls with ring and native roots; without a root
//!   certificate feature only `http://` URLs can be fetched
//! - `tls-ring` / `tls-aws-lc` - crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - root certificates
//! - `tracing` (default) - spans around fetches, debug events for retries and timeouts

mod builder;
mod client;
mod config;
mod context;
mod error;
mod fetch;
pub mod middleware;
pub mod transport;

pub use builder::ClientBuilder;
pub use client::Client;
pub use config::ClientConfig;
pub use context::CallContext;
pub use error::{ApiMessage, ClientError, ErrorFactory, StatusPayload};
pub use fetch::{ErrorStatus, Fetch, FetchHook};

// Re-export middleware at the top level for convenience
pub use middleware::{
    Backoff, Chain, Middleware, MiddlewareFn, MiddlewareTransport, Next, Passthrough, Request,
    Response, Retry, RoundTrip, RoundTripFn, SetHeader, Timeout, chain, middleware_fn,
    round_trip_fn,
};

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, ResponseBody};

// Re-export decoder types that users need
#[cfg(feature = "json")]
pub use httpfetch_core::JsonDecoder;
pub use httpfetch_core::{
    Decode, DecodeError, Decoder, DecoderFn, DecoderRegistry, RegistryError, SharedDecoder,
    TextDecoder, decoder_fn,
};

pub use bytes::Bytes;
