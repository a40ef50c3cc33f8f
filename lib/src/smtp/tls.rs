//! TLS configuration for implicit TLS (port 465) and `STARTTLS` upgrades.

use std::sync::Arc;

use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::ClientConfig;

/// `{rejectUnauthorized?, minVersion?}`, default
/// `rejectUnauthorized=false, minVersion=TLSv1.2`.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// When `false` (the default), any server certificate is accepted -
    /// the probe cares whether the mailbox exists, not whether the
    /// exchanger's certificate chains to a trusted root.
    pub reject_unauthorized: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self { reject_unauthorized: false }
    }
}

impl TlsOptions {
    /// Build a [`TlsConnector`] for this option set. Only TLS 1.2 and 1.3
    /// are offered, matching the default `minVersion`.
    pub fn build_connector(&self) -> Result<TlsConnector, TlsSetupError> {
        let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());

        let builder = ClientConfig::builder_with_provider(provider)
            .with_protocol_versions(tokio_rustls::rustls::DEFAULT_VERSIONS)
            .map_err(|err| TlsSetupError(err.to_string()))?;

        let config = if self.reject_unauthorized {
            let mut roots = tokio_rustls::rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        } else {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyServerCert::new()))
                .with_no_client_auth()
        };

        Ok(TlsConnector::from(Arc::new(config)))
    }
}

/// TLS could not be configured (crypto provider / protocol-version setup
/// failure).
#[derive(Debug, Clone)]
pub struct TlsSetupError(pub String);

impl std::fmt::Display for TlsSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TLS setup failed: {}", self.0)
    }
}

impl std::error::Error for TlsSetupError {}

mod danger {
    use tokio_rustls::rustls::DigitallySignedStruct;
    use tokio_rustls::rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use tokio_rustls::rustls::crypto::{
        CryptoProvider, verify_tls12_signature, verify_tls13_signature,
    };
    use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};

    /// Accepts any server certificate without validation. This is the
    /// probe's default posture (`rejectUnauthorized=false`): a mail
    /// exchanger's certificate trust has no bearing on whether the
    /// mailbox exists.
    #[derive(Debug)]
    pub struct AcceptAnyServerCert {
        provider: CryptoProvider,
    }

    impl AcceptAnyServerCert {
        pub fn new() -> Self {
            Self { provider: tokio_rustls::rustls::crypto::ring::default_provider() }
        }
    }

    impl ServerCertVerifier for AcceptAnyServerCert {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
            verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
            verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
            self.provider.signature_verification_algorithms.supported_schemes()
        }
    }
}
