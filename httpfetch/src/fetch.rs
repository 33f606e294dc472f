//! The outcome of one fetch.
//!
//! A [`Fetch`] holds the response head, the body buffered exactly once, and
//! the first terminal error. Every step after an error is a no-op that
//! surfaces it again.

use std::sync::Arc;

use bytes::Bytes;
use http::response::Parts;
use http::{HeaderMap, StatusCode};
use httpfetch_core::{Decode, DecoderRegistry, SharedDecoder};

use crate::{ClientError, ErrorFactory};

/// How a buffered body is turned into a value: the explicit decoder if one is
/// configured, otherwise the registry keyed by `Content-Type`.
#[derive(Clone)]
pub(crate) struct BodyDecoder {
    decoder: Option<SharedDecoder>,
    registry: Arc<DecoderRegistry>,
}

impl BodyDecoder {
    pub(crate) fn new(decoder: Option<SharedDecoder>, registry: Arc<DecoderRegistry>) -> Self {
        Self { decoder, registry }
    }

    fn decode(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        output: &mut dyn Decode,
    ) -> Result<(), ClientError> {
        match &self.decoder {
            Some(decoder) => decoder.decode(body, output)?,
            None => self.registry.decode_http(headers, body, output)?,
        }
        Ok(())
    }
}

impl std::fmt::Debug for BodyDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyDecoder")
            .field("explicit", &self.decoder.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}

/// Result of [`Client::fetch`](crate::Client::fetch).
///
/// # Example
///
/// ```no_run
/// use bytes::Bytes;
/// use httpfetch::Client;
///
/// #[derive(serde::Deserialize, Default)]
/// struct Health {
///     ok: bool,
/// }
///
/// # async fn run() -> Result<(), httpfetch::ClientError> {
/// let client = Client::new("http://localhost:3000")?;
/// let request = http::Request::get("/health").body(Bytes::new()).unwrap();
///
/// let mut health = Health::default();
/// client.fetch(request).await.decode(&mut health)?;
/// assert!(health.ok);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Fetch {
    parts: Option<Parts>,
    body: Option<Bytes>,
    error: Option<ClientError>,
    decoder: BodyDecoder,
}

impl Fetch {
    pub(crate) fn failed(error: ClientError, decoder: BodyDecoder) -> Self {
        Self {
            parts: None,
            body: None,
            error: Some(error),
            decoder,
        }
    }

    /// A fetch that obtained a response. An empty body counts as no body.
    pub(crate) fn completed(parts: Parts, body: Bytes, decoder: BodyDecoder) -> Self {
        Self {
            parts: Some(parts),
            body: (!body.is_empty()).then_some(body),
            error: None,
            decoder,
        }
    }

    /// Record a terminal error while keeping the response head.
    pub(crate) fn fail(mut self, error: ClientError) -> Self {
        if self.error.is_none() {
            self.error = Some(error);
        }
        self
    }

    /// The terminal error, if any.
    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// The buffered body. `None` if the response had no body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The response status, if a response was obtained.
    pub fn status(&self) -> Option<StatusCode> {
        self.parts.as_ref().map(|parts| parts.status)
    }

    /// The response headers, if a response was obtained.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.parts.as_ref().map(|parts| &parts.headers)
    }

    /// Returns true if a response was obtained with status `status`.
    pub fn is_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }

    /// Run `hook` over the response unless an error is already recorded.
    ///
    /// An error returned by the hook becomes the terminal error.
    pub fn with<H>(mut self, hook: &H) -> Self
    where
        H: FetchHook + ?Sized,
    {
        if self.error.is_some() {
            return self;
        }
        if let Err(err) = hook.inspect(&self) {
            self.error = Some(err);
        }
        self
    }

    /// Decode the buffered body into `output`.
    ///
    /// Returns the terminal error if there is one, and
    /// [`ClientError::EmptyBody`] if the response had no body.
    pub fn decode(&self, output: &mut dyn Decode) -> Result<(), ClientError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let (Some(parts), Some(body)) = (&self.parts, &self.body) else {
            return Err(ClientError::EmptyBody);
        };
        self.decoder.decode(&parts.headers, body, output)
    }

    /// Convert into the buffered response, or the terminal error.
    ///
    /// A response without a body carries an empty `Bytes`.
    pub fn into_result(self) -> Result<http::Response<Bytes>, ClientError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.parts {
            Some(parts) => Ok(http::Response::from_parts(
                parts,
                self.body.unwrap_or_default(),
            )),
            None => Err(ClientError::EmptyBody),
        }
    }
}

/// A step run over every successful fetch, before the caller decodes.
///
/// Implemented for closures `Fn(&Fetch) -> Result<(), ClientError>`.
pub trait FetchHook: Send + Sync {
    /// Inspect the response. An error becomes the fetch's terminal error.
    fn inspect(&self, fetch: &Fetch) -> Result<(), ClientError>;
}

impl<F> FetchHook for F
where
    F: Fn(&Fetch) -> Result<(), ClientError> + Send + Sync,
{
    fn inspect(&self, fetch: &Fetch) -> Result<(), ClientError> {
        self(fetch)
    }
}

/// Turns error statuses into [`ClientError::Status`].
///
/// If the status is at or above the threshold, a payload is built by the
/// factory and the body is decoded into it the same way
/// [`Fetch::decode`] would. A payload that fails to decode is reported as that
/// decode error instead. An error response without a body keeps the factory's
/// empty payload.
#[derive(Clone)]
pub struct ErrorStatus {
    threshold: StatusCode,
    factory: ErrorFactory,
}

impl ErrorStatus {
    /// Reify statuses `>= threshold` with payloads from `factory`.
    pub fn new(threshold: StatusCode, factory: ErrorFactory) -> Self {
        Self { threshold, factory }
    }

    /// The lowest status treated as an error.
    pub fn threshold(&self) -> StatusCode {
        self.threshold
    }
}

impl std::fmt::Debug for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorStatus")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl FetchHook for ErrorStatus {
    fn inspect(&self, fetch: &Fetch) -> Result<(), ClientError> {
        let Some(status) = fetch.status() else {
            return Ok(());
        };
        if status < self.threshold {
            return Ok(());
        }

        let mut payload = (self.factory)();
        if fetch.body().is_some() {
            fetch.decode(payload.as_decode())?;
        }
        Err(ClientError::Status {
            status,
            payload: Arc::from(payload),
        })
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::ApiMessage;
    use httpfetch_core::{DecodeError, Decoder, decoder_fn};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Health {
        ok: bool,
    }

    fn parts(status: StatusCode, content_type: Option<&str>) -> Parts {
        let mut builder = http::Response::builder().status(status);
        if let Some(ct) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn registry_decoder() -> BodyDecoder {
        BodyDecoder::new(None, Arc::new(DecoderRegistry::with_defaults()))
    }

    fn json(status: StatusCode, body: &'static str) -> Fetch {
        Fetch::completed(
            parts(status, Some("application/json; charset=utf-8")),
            Bytes::from_static(body.as_bytes()),
            registry_decoder(),
        )
    }

    #[test]
    fn test_decode_by_content_type() {
        let fetch = json(StatusCode::OK, r#"{"ok":true}"#);
        let mut out = Health::default();
        fetch.decode(&mut out).unwrap();
        assert!(out.ok);
        assert!(fetch.is_status(StatusCode::OK));
        assert!(!fetch.is_status(StatusCode::CREATED));
    }

    #[test]
    fn test_empty_body_is_not_a_lookup_failure() {
        // No decoder for text/html, but the empty body is reported first.
        let fetch = Fetch::completed(
            parts(StatusCode::OK, Some("text/html")),
            Bytes::new(),
            registry_decoder(),
        );
        assert!(fetch.body().is_none());
        let mut out = Health::default();
        assert!(matches!(
            fetch.decode(&mut out),
            Err(ClientError::EmptyBody)
        ));
    }

    #[test]
    fn test_decode_is_repeatable() {
        let fetch = json(StatusCode::OK, r#"{"ok":true}"#);
        let first = fetch.body().cloned();
        let mut a = Health::default();
        let mut b = Health::default();
        fetch.decode(&mut a).unwrap();
        fetch.decode(&mut b).unwrap();
        assert!(a.ok && b.ok);
        assert_eq!(fetch.body().cloned(), first);
    }

    #[test]
    fn test_decoder_not_found() {
        let fetch = Fetch::completed(
            parts(StatusCode::OK, Some("text/html")),
            Bytes::from_static(b"<html></html>"),
            registry_decoder(),
        );
        let mut out = Health::default();
        let err = fetch.decode(&mut out).unwrap_err();
        assert!(matches!(err, ClientError::DecoderNotFound(ref mt) if mt == "text/html"));
    }

    #[test]
    fn test_missing_content_type_is_parse_error() {
        let fetch = Fetch::completed(
            parts(StatusCode::OK, None),
            Bytes::from_static(b"{}"),
            registry_decoder(),
        );
        let mut out = Health::default();
        assert!(matches!(
            fetch.decode(&mut out),
            Err(ClientError::DecoderParse(_))
        ));
    }

    #[test]
    fn test_explicit_decoder_ignores_content_type() {
        let decoder = BodyDecoder::new(
            Some(Arc::new(httpfetch_core::JsonDecoder)),
            Arc::new(DecoderRegistry::new()),
        );
        let fetch = Fetch::completed(
            parts(StatusCode::OK, Some("text/plain")),
            Bytes::from_static(br#"{"ok":true}"#),
            decoder,
        );
        let mut out = Health::default();
        fetch.decode(&mut out).unwrap();
        assert!(out.ok);
    }

    #[test]
    fn test_error_short_circuits_everything() {
        let fetch = Fetch::failed(ClientError::Transport("refused".into()), registry_decoder());
        let fetch = fetch.with(&|_: &Fetch| -> Result<(), ClientError> {
            panic!("hook must not run after an error")
        });

        assert!(fetch.status().is_none());
        assert!(!fetch.is_status(StatusCode::OK));
        let mut out = Health::default();
        let err = fetch.decode(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "transport error: refused");
        assert!(fetch.into_result().is_err());
    }

    #[test]
    fn test_hook_error_becomes_terminal() {
        let fetch = json(StatusCode::OK, r#"{"ok":true}"#)
            .with(&|_: &Fetch| -> Result<(), ClientError> {
                Err(ClientError::InvalidArgument("rejected".into()))
            })
            .with(&|_: &Fetch| -> Result<(), ClientError> { panic!("second hook ran") });

        let mut out = Health::default();
        assert_eq!(
            fetch.decode(&mut out).unwrap_err().to_string(),
            "http client: rejected"
        );
        assert!(fetch.is_status(StatusCode::OK));
    }

    #[test]
    fn test_error_status_reifies_message() {
        let hook = ErrorStatus::new(StatusCode::BAD_REQUEST, ApiMessage::factory());
        let fetch = json(StatusCode::NOT_FOUND, r#"{"message":"not found"}"#).with(&hook);

        let err = fetch.error().unwrap();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.payload::<ApiMessage>().unwrap().message, "not found");

        let mut out = Health::default();
        assert_eq!(fetch.decode(&mut out).unwrap_err().to_string(), "not found");
    }

    #[test]
    fn test_error_status_below_threshold_passes() {
        let hook = ErrorStatus::new(StatusCode::BAD_REQUEST, ApiMessage::factory());
        let fetch = json(StatusCode::from_u16(399).unwrap(), r#"{"ok":true}"#).with(&hook);
        assert!(fetch.error().is_none());
    }

    #[test]
    fn test_error_status_payload_decode_failure() {
        let hook = ErrorStatus::new(StatusCode::BAD_REQUEST, ApiMessage::factory());
        let fetch = json(StatusCode::INTERNAL_SERVER_ERROR, "{invalid").with(&hook);
        let err = fetch.error().unwrap();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(err.status().is_none());
    }

    #[test]
    fn test_error_status_without_body() {
        let hook = ErrorStatus::new(StatusCode::BAD_REQUEST, ApiMessage::factory());
        let fetch = Fetch::completed(
            parts(StatusCode::SERVICE_UNAVAILABLE, None),
            Bytes::new(),
            registry_decoder(),
        )
        .with(&hook);
        let err = fetch.error().unwrap();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.payload::<ApiMessage>().unwrap().message, "");
    }

    #[test]
    fn test_error_status_uses_explicit_decoder() {
        let decoder = BodyDecoder::new(
            Some(Arc::new(decoder_fn(|body: &[u8], output: &mut dyn Decode| {
                let text = std::str::from_utf8(body).map_err(DecodeError::format)?;
                let json = format!(r#"{{"message":"{text}"}}"#);
                httpfetch_core::JsonDecoder.decode(json.as_bytes(), output)
            }))),
            Arc::new(DecoderRegistry::new()),
        );
        let fetch = Fetch::completed(
            parts(StatusCode::CONFLICT, Some("text/plain")),
            Bytes::from_static(b"already exists"),
            decoder,
        )
        .with(&ErrorStatus::new(StatusCode::BAD_REQUEST, ApiMessage::factory()));
        assert_eq!(fetch.error().unwrap().to_string(), "already exists");
    }

    #[test]
    fn test_into_result() {
        let response = json(StatusCode::OK, r#"{"ok":true}"#).into_result().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), br#"{"ok":true}"#);

        let fetch = Fetch::completed(
            parts(StatusCode::NO_CONTENT, None),
            Bytes::new(),
            registry_decoder(),
        );
        assert!(fetch.into_result().unwrap().body().is_empty());
    }
}
