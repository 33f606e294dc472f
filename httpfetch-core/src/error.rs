//! Error types for decoding and decoder registration.
//!
//! This module provides the errors raised at the decoder plugin boundary:
//! - [`DecodeError`]: Failures while resolving or running a decoder
//! - [`RegistryError`]: Failures while registering decoders

/// Boxed error type for decoder plugins that carry their own error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while decoding a response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No decoder is registered for the media type.
    #[error("decoder by media type '{media_type}' not found")]
    NotFound { media_type: String },

    /// The `Content-Type` header is missing or malformed.
    #[error("{0}")]
    Parse(String),

    /// The decoder rejected the body. The message is the decoder's own.
    #[error("{0}")]
    Format(String),

    /// A plugin-specific error.
    #[error(transparent)]
    Custom(BoxError),
}

impl DecodeError {
    /// Create a format error from any displayable decoder failure.
    pub fn format<E: std::fmt::Display>(err: E) -> Self {
        DecodeError::Format(err.to_string())
    }

    /// Wrap a plugin-specific error.
    pub fn custom<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        DecodeError::Custom(err.into())
    }

    /// Returns true if no decoder matched the media type.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DecodeError::NotFound { .. })
    }
}

impl From<erased_serde::Error> for DecodeError {
    fn from(err: erased_serde::Error) -> Self {
        DecodeError::Format(err.to_string())
    }
}

/// Errors produced while registering decoders.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No media types, or an empty media type, were given.
    #[error("decoder and media types are required")]
    InvalidArgument,

    /// The media type already has a decoder.
    #[error("register called twice for decoder by media type {media_type}")]
    DuplicateRegistration { media_type: String },
}
