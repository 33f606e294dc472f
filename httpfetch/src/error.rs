//! Client error types.
//!
//! This module provides [`ClientError`], the error type for every stage of a
//! fetch, and the [`StatusPayload`] trait used to reify error statuses into
//! decoded error bodies.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use httpfetch_core::{Decode, DecodeError, RegistryError};
use serde::Deserialize;

/// A decoded error body attached to [`ClientError::Status`].
///
/// Implemented for every `std::error::Error` type that can be decoded, so a
/// caller-defined error struct only needs `Deserialize` and `Display`.
pub trait StatusPayload: std::error::Error + Send + Sync + 'static {
    /// View the payload as a decode target.
    fn as_decode(&mut self) -> &mut dyn Decode;

    /// View the payload as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T> StatusPayload for T
where
    T: std::error::Error + Decode + Send + Sync + 'static,
{
    fn as_decode(&mut self) -> &mut dyn Decode {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory producing a fresh, empty error payload for each error response.
pub type ErrorFactory = Arc<dyn Fn() -> Box<dyn StatusPayload> + Send + Sync>;

/// The default error payload: a JSON body of the form `{"message": "..."}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiMessage {
    /// Human-readable error message reported by the server.
    #[serde(default)]
    pub message: String,
}

impl ApiMessage {
    /// The factory used when no error factory is configured.
    pub fn factory() -> ErrorFactory {
        Arc::new(|| -> Box<dyn StatusPayload> { Box::new(ApiMessage::default()) })
    }
}

/// Errors produced by the fetch pipeline.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The request URL could not be resolved against the base URL.
    #[error("resolve error: {0}")]
    Resolution(String),

    /// Transport-level error (connection failed, body read failed, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// Decoding was requested but the response had no body.
    #[error("http client: empty body")]
    EmptyBody,

    /// No decoder is registered for the response media type.
    #[error("http client: decoder by media type '{0}' not found")]
    DecoderNotFound(String),

    /// The `Content-Type` header is missing or malformed.
    #[error("{0}")]
    DecoderParse(String),

    /// The decoder rejected the body. The message is the decoder's own.
    #[error("{0}")]
    Decode(String),

    /// A decoder was registered twice for the same media type.
    #[error("http client: register called twice for decoder by media type {0}")]
    DuplicateRegistration(String),

    /// An argument was missing or invalid.
    #[error("http client: {0}")]
    InvalidArgument(String),

    /// The server answered with an error status. Displays as the payload.
    #[error("{payload}")]
    Status {
        status: StatusCode,
        payload: Arc<dyn StatusPayload>,
    },

    /// The call was cancelled by the caller.
    #[error("context canceled")]
    Canceled,

    /// The call's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ClientError {
    /// Create a transport error from any displayable cause.
    pub fn transport<E: fmt::Display>(err: E) -> Self {
        ClientError::Transport(err.to_string())
    }

    /// Get the HTTP status of an error-status response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Downcast the decoded payload of an error-status response.
    ///
    /// ```
    /// use httpfetch::{ApiMessage, ClientError};
    ///
    /// fn message(err: &ClientError) -> Option<&str> {
    ///     err.payload::<ApiMessage>().map(|p| p.message.as_str())
    /// }
    /// ```
    pub fn payload<T: StatusPayload>(&self) -> Option<&T> {
        match self {
            ClientError::Status { payload, .. } => payload.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Returns true if the call was cancelled or ran out of time.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::Canceled | ClientError::DeadlineExceeded)
    }
}

impl From<DecodeError> for ClientError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::NotFound { media_type } => ClientError::DecoderNotFound(media_type),
            DecodeError::Parse(msg) => ClientError::DecoderParse(msg),
            DecodeError::Format(msg) => ClientError::Decode(msg),
            DecodeError::Custom(err) => ClientError::Decode(err.to_string()),
        }
    }
}

impl From<RegistryError> for ClientError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidArgument => ClientError::InvalidArgument(err.to_string()),
            RegistryError::DuplicateRegistration { media_type } => {
                ClientError::DuplicateRegistration(media_type)
            }
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Resolution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_payload() {
        let err = ClientError::Status {
            status: StatusCode::NOT_FOUND,
            payload: Arc::new(ApiMessage {
                message: "not found".into(),
            }),
        };
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.payload::<ApiMessage>().unwrap().message, "not found");
    }

    #[test]
    fn test_payload_downcast_mismatch() {
        #[derive(Debug, Default, Deserialize, thiserror::Error)]
        #[error("{code}")]
        struct Other {
            code: u32,
        }

        let err = ClientError::Status {
            status: StatusCode::BAD_REQUEST,
            payload: Arc::new(ApiMessage::default()),
        };
        assert!(err.payload::<Other>().is_none());
        assert!(ClientError::EmptyBody.payload::<ApiMessage>().is_none());
    }

    #[test]
    fn test_from_decode_error() {
        let err: ClientError = DecodeError::NotFound {
            media_type: "text/html".into(),
        }
        .into();
        assert!(matches!(err, ClientError::DecoderNotFound(ref mt) if mt == "text/html"));
        assert_eq!(
            err.to_string(),
            "http client: decoder by media type 'text/html' not found"
        );

        let err: ClientError = DecodeError::format("invalid character 'i'").into();
        assert_eq!(err.to_string(), "invalid character 'i'");
    }

    #[test]
    fn test_from_registry_error() {
        let err: ClientError = RegistryError::DuplicateRegistration {
            media_type: "text/html".into(),
        }
        .into();
        assert!(matches!(err, ClientError::DuplicateRegistration(_)));

        let err: ClientError = RegistryError::InvalidArgument.into();
        assert_eq!(
            err.to_string(),
            "http client: decoder and media types are required"
        );
    }

    #[test]
    fn test_is_cancellation() {
        assert!(ClientError::Canceled.is_cancellation());
        assert!(ClientError::DeadlineExceeded.is_cancellation());
        assert!(!ClientError::EmptyBody.is_cancellation());
    }

    #[test]
    fn test_api_message_factory_yields_empty_payload() {
        let payload = (ApiMessage::factory())();
        assert_eq!(payload.to_string(), "");
    }
}
