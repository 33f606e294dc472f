//! Media-type keyed decoder registry.
//!
//! [`DecoderRegistry`] maps exact media-type strings to decoders. It is shared
//! behind an `Arc` and injected into clients; lookups take a read lock and may
//! run concurrently, registration takes the write lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use http::HeaderMap;

use crate::decoder::{Decode, Decoder};
use crate::media_type::media_type_from_headers;
use crate::{DecodeError, RegistryError};

/// A shared decoder handle.
pub type SharedDecoder = Arc<dyn Decoder>;

/// Registry of decoders keyed by media type.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use httpfetch_core::{DecoderRegistry, TextDecoder};
///
/// let registry = DecoderRegistry::new();
/// registry.register(Arc::new(TextDecoder), &["text/plain", "text/html"]).unwrap();
///
/// let mut out = String::new();
/// registry.decode("text/html", b"<p>hi</p>", &mut out).unwrap();
/// assert_eq!(out, "<p>hi</p>");
/// ```
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: RwLock<HashMap<String, SharedDecoder>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let decoders = self.decoders.read().unwrap_or_else(PoisonError::into_inner);
        let mut media_types: Vec<&str> = decoders.keys().map(String::as_str).collect();
        media_types.sort_unstable();
        f.debug_struct("DecoderRegistry")
            .field("media_types", &media_types)
            .finish()
    }
}

impl DecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in decoders registered:
    /// `application/json` when the `json` feature is enabled.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        #[cfg(feature = "json")]
        registry.must_register(Arc::new(crate::JsonDecoder), &["application/json"]);
        registry
    }

    /// Register `decoder` for each of `media_types`.
    ///
    /// Fails with [`RegistryError::InvalidArgument`] if no media types (or an
    /// empty one) are given, and with [`RegistryError::DuplicateRegistration`]
    /// on the first media type that already has a decoder. Media types
    /// registered before the duplicate stay registered.
    pub fn register(
        &self,
        decoder: SharedDecoder,
        media_types: &[&str],
    ) -> Result<(), RegistryError> {
        if media_types.is_empty() || media_types.iter().any(|mt| mt.is_empty()) {
            return Err(RegistryError::InvalidArgument);
        }

        let mut decoders = self.decoders.write().unwrap_or_else(PoisonError::into_inner);
        for media_type in media_types {
            if decoders.contains_key(*media_type) {
                return Err(RegistryError::DuplicateRegistration {
                    media_type: (*media_type).to_string(),
                });
            }
            decoders.insert((*media_type).to_string(), decoder.clone());
        }
        Ok(())
    }

    /// Register `decoder`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if [`register`](Self::register) fails.
    pub fn must_register(&self, decoder: SharedDecoder, media_types: &[&str]) {
        if let Err(err) = self.register(decoder, media_types) {
            panic!("http client: {err}");
        }
    }

    /// Get the decoder registered for `media_type`.
    pub fn get(&self, media_type: &str) -> Option<SharedDecoder> {
        self.decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(media_type)
            .cloned()
    }

    /// Check whether `media_type` has a decoder.
    pub fn contains(&self, media_type: &str) -> bool {
        self.decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(media_type)
    }

    /// Number of registered media types.
    pub fn len(&self) -> usize {
        self.decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode `body` with the decoder registered for `media_type`.
    ///
    /// The decoder runs outside the lock; its error is returned verbatim.
    pub fn decode(
        &self,
        media_type: &str,
        body: &[u8],
        output: &mut dyn Decode,
    ) -> Result<(), DecodeError> {
        match self.get(media_type) {
            Some(decoder) => decoder.decode(body, output),
            None => Err(DecodeError::NotFound {
                media_type: media_type.to_string(),
            }),
        }
    }

    /// Decode `body` using the media type from the `Content-Type` header.
    pub fn decode_http(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        output: &mut dyn Decode,
    ) -> Result<(), DecodeError> {
        let media_type = media_type_from_headers(headers)?;
        self.decode(&media_type, body, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TextDecoder, decoder_fn};
    use http::HeaderValue;
    use http::header::CONTENT_TYPE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> SharedDecoder {
        Arc::new(decoder_fn(|_, _| Ok(())))
    }

    #[test]
    fn test_register_requires_media_types() {
        let registry = DecoderRegistry::new();
        assert_eq!(
            registry.register(noop(), &[]),
            Err(RegistryError::InvalidArgument)
        );
        assert_eq!(
            registry.register(noop(), &[""]),
            Err(RegistryError::InvalidArgument)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_decode_round_trip() {
        let registry = DecoderRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        registry
            .register(
                Arc::new(decoder_fn(move |body, output| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(body, b"payload");
                    TextDecoder.decode(body, output)
                })),
                &["a/b"],
            )
            .unwrap();

        let mut out = String::new();
        registry.decode("a/b", b"payload", &mut out).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(out, "payload");
    }

    #[test]
    fn test_duplicate_registration_keeps_existing_decoder() {
        let registry = DecoderRegistry::new();
        registry.register(Arc::new(TextDecoder), &["text/html"]).unwrap();

        let err = registry
            .register(
                Arc::new(decoder_fn(|_, _| Err(DecodeError::format("replaced")))),
                &["text/html"],
            )
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateRegistration {
                media_type: "text/html".into()
            }
        );

        let mut out = String::new();
        registry.decode("text/html", b"kept", &mut out).unwrap();
        assert_eq!(out, "kept");
    }

    #[test]
    fn test_partial_registration_is_not_rolled_back() {
        let registry = DecoderRegistry::new();
        registry.register(noop(), &["b/b"]).unwrap();

        let err = registry.register(noop(), &["a/a", "b/b", "c/c"]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
        assert!(registry.contains("a/a"));
        assert!(!registry.contains("c/c"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    #[should_panic(expected = "register called twice")]
    fn test_must_register_panics_on_duplicate() {
        let registry = DecoderRegistry::new();
        registry.must_register(noop(), &["multipart/form-data"]);
        registry.must_register(noop(), &["multipart/form-data"]);
    }

    #[test]
    fn test_decode_not_found_and_verbatim_errors() {
        let registry = DecoderRegistry::new();
        registry
            .register(
                Arc::new(decoder_fn(|_, _| Err(DecodeError::format("error decode")))),
                &["application/msword"],
            )
            .unwrap();

        let mut out = String::new();
        let err = registry.decode("application/pdf", b"", &mut out).unwrap_err();
        assert_eq!(
            err.to_string(),
            "decoder by media type 'application/pdf' not found"
        );

        let err = registry
            .decode("application/msword", b"", &mut out)
            .unwrap_err();
        assert_eq!(err.to_string(), "error decode");
    }

    #[test]
    fn test_decode_http() {
        let registry = DecoderRegistry::new();
        registry.register(Arc::new(TextDecoder), &["audio/aac"]).unwrap();

        let mut headers = HeaderMap::new();
        let mut out = String::new();
        let err = registry.decode_http(&headers, b"x", &mut out).unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
        assert_eq!(err.to_string(), "mime: no media type");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("audio/AAC; rate=44100"));
        registry.decode_http(&headers, b"x", &mut out).unwrap();
        assert_eq!(out, "x");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_with_defaults_registers_json() {
        #[derive(serde::Deserialize, Default)]
        struct Reply {
            ok: bool,
        }

        let registry = DecoderRegistry::with_defaults();
        assert!(registry.contains("application/json"));

        let mut out = Reply::default();
        registry
            .decode("application/json", br#"{"ok":true}"#, &mut out)
            .unwrap();
        assert!(out.ok);
    }

    #[test]
    fn test_concurrent_lookups_and_registration() {
        let registry = Arc::new(DecoderRegistry::new());
        registry.register(Arc::new(TextDecoder), &["text/plain"]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let media_type = format!("x-test/{i}");
                    registry
                        .register(Arc::new(TextDecoder), &[media_type.as_str()])
                        .unwrap();
                    for _ in 0..100 {
                        let mut out = String::new();
                        registry.decode("text/plain", b"hi", &mut out).unwrap();
                        assert_eq!(out, "hi");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 9);
    }
}
