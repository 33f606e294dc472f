//! Decoder plugin boundary.
//!
//! A [`Decoder`] turns a buffered response body into a caller-supplied output
//! value. Output values are reached through the object-safe [`Decode`] trait,
//! which is implemented for every `serde::de::DeserializeOwned` type, so a
//! format plugin only has to hand an erased deserializer to the output:
//!
//! ```
//! use httpfetch_core::{Decoder, JsonDecoder};
//!
//! #[derive(serde::Deserialize, Default)]
//! struct Reply {
//!     ok: bool,
//! }
//!
//! let mut out = Reply::default();
//! JsonDecoder.decode(br#"{"ok":true}"#, &mut out).unwrap();
//! assert!(out.ok);
//! ```

use serde::de::{DeserializeOwned, IntoDeserializer};

use crate::DecodeError;

/// An output value that a decoder can fill.
///
/// Implemented for all `DeserializeOwned` types; a successful decode replaces
/// the previous value.
pub trait Decode {
    /// Deserialize a new value from `deserializer` into `self`.
    fn decode_from(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error>;
}

impl<T> Decode for T
where
    T: DeserializeOwned,
{
    fn decode_from(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error> {
        *self = erased_serde::deserialize(deserializer)?;
        Ok(())
    }
}

/// A body decoder registered against one or more media types.
pub trait Decoder: Send + Sync {
    /// Decode `body` into `output`.
    fn decode(&self, body: &[u8], output: &mut dyn Decode) -> Result<(), DecodeError>;
}

/// A decoder built from a closure. See [`decoder_fn`].
#[derive(Clone)]
pub struct DecoderFn<F> {
    func: F,
}

impl<F> std::fmt::Debug for DecoderFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderFn").finish()
    }
}

/// Adapt a closure into a [`Decoder`].
///
/// ```
/// use httpfetch_core::{DecodeError, decoder_fn};
///
/// let reject = decoder_fn(|_body, _output| Err(DecodeError::format("error decode")));
/// ```
pub fn decoder_fn<F>(func: F) -> DecoderFn<F>
where
    F: Fn(&[u8], &mut dyn Decode) -> Result<(), DecodeError> + Send + Sync,
{
    DecoderFn { func }
}

impl<F> Decoder for DecoderFn<F>
where
    F: Fn(&[u8], &mut dyn Decode) -> Result<(), DecodeError> + Send + Sync,
{
    fn decode(&self, body: &[u8], output: &mut dyn Decode) -> Result<(), DecodeError> {
        (self.func)(body, output)
    }
}

/// JSON decoder backed by `serde_json`.
///
/// Trailing non-whitespace after the JSON value is rejected.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

#[cfg(feature = "json")]
impl Decoder for JsonDecoder {
    fn decode(&self, body: &[u8], output: &mut dyn Decode) -> Result<(), DecodeError> {
        let mut json = serde_json::Deserializer::from_slice(body);
        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut json);
            output.decode_from(&mut erased)?;
        }
        json.end().map_err(DecodeError::format)
    }
}

/// UTF-8 text decoder. Decodes into `String` and other types that accept a
/// string (e.g. unit enums).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    fn decode(&self, body: &[u8], output: &mut dyn Decode) -> Result<(), DecodeError> {
        let text = std::str::from_utf8(body).map_err(DecodeError::format)?;
        let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
            text.into_deserializer();
        let mut erased = <dyn erased_serde::Deserializer>::erase(deserializer);
        output.decode_from(&mut erased)?;
        Ok(())
    }
}
