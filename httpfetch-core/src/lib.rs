//! Decoder plumbing for httpfetch.
//!
//! This crate provides the pieces of response decoding that do not depend on
//! an HTTP client: the decoder plugin boundary, `Content-Type` parsing and the
//! media-type keyed registry used by `httpfetch` clients.
//!
//! ## Modules
//!
//! - [`error`]: Decode and registration error types
//! - [`decoder`]: Decoder trait, erased output values and built-in decoders
//! - [`media_type`]: `Content-Type` media type extraction
//! - [`registry`]: Concurrent media type to decoder registry

mod decoder;
mod error;
mod media_type;
mod registry;

pub use decoder::*;
pub use error::*;
pub use media_type::*;
pub use registry::*;
