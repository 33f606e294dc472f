//! Connector setup for the hyper client.
//!
//! With a root certificate feature enabled, the connector speaks plain HTTP
//! for `http://` URLs and rustls for `https://` URLs. Without one it is a
//! plain [`HttpConnector`] and `https://` requests fail with
//! [`ClientError::Transport`]. TLS needs both a crypto provider and root
//! certificates:
//!
//! - **Crypto providers** (choose one):
//!   - `tls-ring` - Use ring crypto (default with `tls` feature)
//!   - `tls-aws-lc` - Use AWS LC crypto
//!   - or a process-wide default installed with `CryptoProvider::install_default()`
//!
//! - **Root certificates** (choose one):
//!   - `tls-native-roots` - Use system root certificates (default with `tls` feature)
//!   - `tls-webpki-roots` - Use bundled Mozilla root certificates

use hyper_util::client::legacy::connect::HttpConnector;
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
use {
    hyper_rustls::{HttpsConnector, HttpsConnectorBuilder},
    rustls::ClientConfig,
};

use crate::ClientError;

/// Connector used by [`HyperTransport`](super::HyperTransport).
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub(crate) type Connector = HttpsConnector<HttpConnector>;

/// Connector used by [`HyperTransport`](super::HyperTransport).
#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
pub(crate) type Connector = HttpConnector;

/// Try to get a crypto provider ConfigBuilder.
///
/// Priority:
/// 1. Feature-gated provider (tls-ring or tls-aws-lc)
/// 2. User-installed global default provider
/// 3. None if no provider available
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn crypto_provider_builder() -> Option<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(std::sync::Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(std::sync::Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = rustls::crypto::CryptoProvider::get_default().cloned();

    ClientConfig::builder_with_provider(provider?)
        .with_safe_default_protocol_versions()
        .ok()
}

/// Build the default TLS configuration.
///
/// Returns `None` if no crypto provider is available.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub(crate) fn default_tls_config() -> Option<ClientConfig> {
    let builder = crypto_provider_builder()?;
    Some(
        builder
            .with_root_certificates(build_root_store())
            .with_no_client_auth(),
    )
}

/// Build the root certificate store from enabled features.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn build_root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    // Prefer native over webpki if both are enabled
    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            // Some certs may still have loaded
            #[cfg(feature = "tracing")]
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build the https-or-http connector.
///
/// Fails if no crypto provider is available.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub(crate) fn build_connector() -> Result<Connector, ClientError> {
    let tls_config = default_tls_config().ok_or_else(|| {
        ClientError::Transport(
            "HTTPS requires a crypto provider: enable `tls-ring` or `tls-aws-lc`, \
             or install one with `CryptoProvider::install_default()`"
                .into(),
        )
    })?;

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_all_versions()
        .build())
}

/// Build a plain HTTP connector; `https://` URIs are refused.
#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
pub(crate) fn build_connector() -> Result<Connector, ClientError> {
    Ok(build_http_connector())
}

#[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
fn build_http_connector() -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.enforce_http(true);
    connector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_default_tls_config() {
        let config = default_tls_config().unwrap();
        assert!(config.alpn_protocols.is_empty());
    }

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn test_build_connector_default() {
        assert!(build_connector().is_ok());
    }

    #[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
    #[test]
    fn test_build_plain_connector_without_roots() {
        assert!(build_connector().is_ok());
    }
}
