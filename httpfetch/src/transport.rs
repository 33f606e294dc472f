//! HTTP transport layer.
//!
//! This module provides the [`HyperTransport`] type, the default round-trip
//! primitive, built on hyper_util's legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//!
//! # Feature Flags
//!
//! TLS support requires enabling the appropriate features. Without a root
//! certificate feature the transport still serves `http://` URLs:
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod body;
mod connector;
mod hyper;

pub use body::ResponseBody;
pub use self::hyper::{HyperTransport, HyperTransportBuilder};
