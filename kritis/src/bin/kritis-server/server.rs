// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{fs, net::SocketAddr, sync::Arc};

use anyhow::{bail, Context, Result};
use hyper::server::conn::Http;
use hyper::service::service_fn;
use log::{debug, info, warn};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use crate::router::Router;

/// Install ring as the process-wide rustls provider. A provider installed
/// earlier is kept.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("a rustls crypto provider is already installed");
    }
}

/// Build the TLS acceptor from the PEM serving certificate and key.
pub fn tls_acceptor(cert_file: &str, key_file: &str) -> Result<TlsAcceptor> {
    let cert_pem =
        fs::read(cert_file).with_context(|| format!("read TLS certificate {cert_file}"))?;
    let key_pem = fs::read(key_file).with_context(|| format!("read TLS key {key_file}"))?;

    let certs = CertificateDer::pem_slice_iter(&cert_pem)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("parse TLS certificate {cert_file}"))?;
    if certs.is_empty() {
        bail!("no certificate found in {cert_file}");
    }
    let key = PrivateKeyDer::from_pem_slice(&key_pem)
        .with_context(|| format!("parse TLS key {key_file}"))?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("build TLS server config")?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Accept connections on `addr` until the future is dropped. Each connection
/// is served on its own task.
pub async fn serve(addr: SocketAddr, acceptor: TlsAcceptor, router: Arc<Router>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("kritis-server listening on https://{addr}");

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(e) => {
                    warn!("TLS handshake with {remote} failed: {e}");
                    return;
                }
            };

            let service = service_fn(move |req| {
                let router = router.clone();
                async move { router.route(req).await }
            });
            if let Err(e) = Http::new().serve_connection(tls, service).await {
                warn!("connection with {remote} failed: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_installs_once() {
        install_crypto_provider();
        install_crypto_provider();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }

    #[test]
    fn missing_certificate_is_fatal() {
        install_crypto_provider();
        let err = tls_acceptor("/nonexistent/tls.crt", "/nonexistent/tls.key")
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/tls.crt"));
    }
}
