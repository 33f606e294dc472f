//! Transport middleware.
//!
//! A [`RoundTrip`] turns a request into a response. A [`Middleware`] wraps the
//! rest of the pipeline, handed to it as a [`Next`] continuation, and may
//! change the request, the response, or how often the continuation runs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use httpfetch::{Middleware, Next, SetHeader, chain, middleware_fn};
//!
//! let auth = SetHeader::new("authorization", "Bearer token123");
//!
//! let logging = middleware_fn(|request, next: Next| {
//!     Box::pin(async move {
//!         println!("calling {}", request.uri());
//!         next.run(request).await
//!     })
//! });
//!
//! // `auth` sees the request first and the response last.
//! let stack: Arc<dyn Middleware> = chain(vec![Arc::new(auth), Arc::new(logging)]);
//! ```

pub mod retry;
mod timeout;

pub use retry::{Backoff, Retry};
pub use timeout::Timeout;

use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{HeaderName, HeaderValue};

use crate::ClientError;
use crate::transport::ResponseBody;

/// The request flowing through the pipeline. The body is fully materialized
/// so the request can be replayed.
pub type Request = http::Request<Bytes>;

/// The response flowing through the pipeline.
pub type Response = http::Response<ResponseBody>;

/// The base round-trip primitive: one request in, one response or error out.
pub trait RoundTrip: Send + Sync {
    /// Execute a single request.
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>>;
}

/// A transport interceptor.
///
/// Implementations hold only construction-time configuration; everything that
/// belongs to one call lives in the request or in `next`.
pub trait Middleware: Send + Sync {
    /// Handle `request`, usually by running `next` one or more times.
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, ClientError>>;
}

/// The continuation of a middleware chain.
///
/// Running it invokes the next middleware, or the base primitive once the
/// chain is exhausted. It is `Clone`, so a middleware may run it again.
#[derive(Clone)]
pub struct Next {
    layers: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    tail: Tail,
}

#[derive(Clone)]
enum Tail {
    RoundTrip(Arc<dyn RoundTrip>),
    Next(Box<Next>),
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &(self.layers.len() - self.index))
            .finish_non_exhaustive()
    }
}

impl Next {
    /// A continuation that calls `primitive` directly.
    pub fn new(primitive: Arc<dyn RoundTrip>) -> Self {
        Self {
            layers: Vec::new().into(),
            index: 0,
            tail: Tail::RoundTrip(primitive),
        }
    }

    /// Run the rest of the pipeline.
    pub fn run(self, request: Request) -> BoxFuture<'static, Result<Response, ClientError>> {
        Box::pin(async move {
            match self.layers.get(self.index).cloned() {
                Some(layer) => {
                    let next = Next {
                        layers: self.layers,
                        index: self.index + 1,
                        tail: self.tail,
                    };
                    layer.handle(request, next).await
                }
                None => match self.tail {
                    Tail::RoundTrip(primitive) => primitive.round_trip(request).await,
                    Tail::Next(next) => (*next).run(request).await,
                },
            }
        })
    }
}

/// Compose middleware into one. The first element is the outermost.
///
/// No middleware yields [`Passthrough`]; a single middleware is returned as is.
pub fn chain(mut layers: Vec<Arc<dyn Middleware>>) -> Arc<dyn Middleware> {
    match layers.len() {
        0 => Arc::new(Passthrough),
        1 => layers.remove(0),
        _ => Arc::new(Chain {
            layers: layers.into(),
        }),
    }
}

/// A middleware that forwards every request untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Middleware for Passthrough {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, ClientError>> {
        next.run(request)
    }
}

/// Several middleware composed in order. See [`chain`].
#[derive(Clone)]
pub struct Chain {
    layers: Arc<[Arc<dyn Middleware>]>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("count", &self.layers.len())
            .finish()
    }
}

impl Chain {
    /// Number of composed middleware.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if nothing is composed.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Middleware for Chain {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, ClientError>> {
        // The position lives in the Next value so concurrent calls never share it.
        let inner = Next {
            layers: self.layers.clone(),
            index: 0,
            tail: Tail::Next(Box::new(next)),
        };
        inner.run(request)
    }
}

/// A primitive wrapped in a middleware, usable wherever a primitive is.
#[derive(Clone)]
pub struct MiddlewareTransport {
    primitive: Arc<dyn RoundTrip>,
    middleware: Arc<dyn Middleware>,
}

impl std::fmt::Debug for MiddlewareTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareTransport").finish_non_exhaustive()
    }
}

impl MiddlewareTransport {
    /// Wrap `primitive` with `middleware`.
    pub fn new(primitive: Arc<dyn RoundTrip>, middleware: Arc<dyn Middleware>) -> Self {
        Self {
            primitive,
            middleware,
        }
    }
}

impl RoundTrip for MiddlewareTransport {
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        self.middleware
            .handle(request, Next::new(self.primitive.clone()))
    }
}

/// A middleware built from a closure. See [`middleware_fn`].
#[derive(Clone)]
pub struct MiddlewareFn<F> {
    func: F,
}

impl<F> std::fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareFn").finish()
    }
}

/// Adapt a closure into a [`Middleware`].
pub fn middleware_fn<F>(func: F) -> MiddlewareFn<F>
where
    F: Fn(Request, Next) -> BoxFuture<'static, Result<Response, ClientError>> + Send + Sync,
{
    MiddlewareFn { func }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(Request, Next) -> BoxFuture<'static, Result<Response, ClientError>> + Send + Sync,
{
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, ClientError>> {
        (self.func)(request, next)
    }
}

/// A primitive built from a closure. See [`round_trip_fn`].
#[derive(Clone)]
pub struct RoundTripFn<F> {
    func: F,
}

impl<F> std::fmt::Debug for RoundTripFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundTripFn").finish()
    }
}

/// Adapt a closure into a [`RoundTrip`] primitive.
///
/// ```
/// use httpfetch::{Response, ResponseBody, round_trip_fn};
///
/// let stub = round_trip_fn(|_request| {
///     Box::pin(async { Ok(Response::new(ResponseBody::full("{}"))) })
/// });
/// ```
pub fn round_trip_fn<F>(func: F) -> RoundTripFn<F>
where
    F: Fn(Request) -> BoxFuture<'static, Result<Response, ClientError>> + Send + Sync,
{
    RoundTripFn { func }
}

impl<F> RoundTrip for RoundTripFn<F>
where
    F: Fn(Request) -> BoxFuture<'static, Result<Response, ClientError>> + Send + Sync,
{
    fn round_trip(&self, request: Request) -> BoxFuture<'_, Result<Response, ClientError>> {
        (self.func)(request)
    }
}

/// A middleware that sets a header on every request.
///
/// # Example
///
/// ```
/// use httpfetch::SetHeader;
///
/// let json = SetHeader::new("content-type", "application/json");
/// ```
#[derive(Clone, Debug)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    /// Create a new header middleware.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        match Self::try_new(name, value) {
            Ok(header) => header,
            Err(err) => panic!("{err}"),
        }
    }

    /// Try to create a new header middleware, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self, ClientError> {
        let name = name
            .parse()
            .map_err(|_| ClientError::InvalidArgument(format!("invalid header name: {name}")))?;
        let value = value
            .parse()
            .map_err(|_| ClientError::InvalidArgument(format!("invalid header value: {value}")))?;
        Ok(Self { name, value })
    }

    /// Create a new header middleware from pre-parsed values.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl Middleware for SetHeader {
    fn handle(
        &self,
        mut request: Request,
        next: Next,
    ) -> BoxFuture<'_, Result<Response, ClientError>> {
        request
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
        next.run(request)
    }
}
