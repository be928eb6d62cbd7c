//! # TLS Transport Layer
//!
//! Wraps an established TCP connection in TLS once the server has accepted the
//! `tls` capability. The handshake is driven to completion before the
//! transport is handed back, so the negotiated cipher suite is known up front.
//!
//! ## Responsibilities
//! - Upgrade a plain TCP socket in place (the X protocol negotiates TLS in-band)
//! - Verify the server certificate against the webpki root set, or skip
//!   verification when explicitly configured
//! - Report the negotiated cipher suite to the session

use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, StreamOwned};
use tracing::{debug, info, instrument, warn};

use super::{read_exact_from, write_all_to, Transport, TransportKind};
use crate::error::TransportError;

/// TLS client stream over TCP.
pub struct TlsTransport {
    stream: Option<StreamOwned<ClientConnection, TcpStream>>,
    cipher: Option<String>,
}

impl TlsTransport {
    /// Performs the TLS handshake over `tcp` for `host`.
    ///
    /// With `verify` unset the server certificate is accepted as presented.
    #[instrument(skip(tcp))]
    pub fn upgrade(tcp: TcpStream, host: &str, verify: bool) -> Result<Self, TransportError> {
        let config = if verify {
            ClientConfig::builder()
                .with_root_certificates(RootCertStore::from_iter(
                    webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
                ))
                .with_no_client_auth()
        } else {
            warn!("TLS certificate verification disabled");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
                .with_no_client_auth()
        };

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| TransportError::Tls(format!("invalid server name '{host}': {e}")))?;
        let connection = ClientConnection::new(Arc::new(config), server_name)
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        let mut stream = StreamOwned::new(connection, tcp);
        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::InvalidData => TransportError::Tls(e.to_string()),
                    _ => TransportError::from(e),
                })?;
        }

        let cipher = stream
            .conn
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()));
        info!(cipher = ?cipher, "TLS established");

        Ok(Self {
            stream: Some(stream),
            cipher,
        })
    }
}

impl Transport for TlsTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        read_exact_from(self.stream.as_mut(), buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        write_all_to(self.stream.as_mut(), buf)
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.conn.send_close_notify();
            let _ = stream.conn.complete_io(&mut stream.sock);
            let _ = stream.sock.shutdown(Shutdown::Both);
            debug!("tls transport closed");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    fn cipher(&self) -> Option<String> {
        self.cipher.clone()
    }
}

/// Certificate verifier used when verification is turned off in the config.
#[derive(Debug)]
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
