// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use kritis::admission::Admitter;
use kritis::cluster::{
    kritis_config_override, KubeOwnerResolver, KubePolicySource, KubeSecretFetcher,
    KubeWorkloadDeleter,
};
use kritis::config::KritisConfig;
use kritis::review::Reviewer;
use kritis::violation::new_strategy;
use log::info;
use tokio::signal::unix::{signal, SignalKind};

mod router;
mod server;

use router::Router;

const DEFAULT_TLS_CERT_FILE: &str = "/var/tls/tls.crt";
const DEFAULT_TLS_KEY_FILE: &str = "/var/tls/tls.key";

#[derive(Debug, Parser)]
#[command(author, version, about = "Kritis admission webhook server")]
struct Cli {
    /// Path to the config file
    ///
    /// `--config /etc/kritis/config.toml`
    #[arg(short, long)]
    config: Option<String>,

    /// PEM file of the serving certificate chain
    #[arg(long, default_value = DEFAULT_TLS_CERT_FILE)]
    tls_cert_file: String,

    /// PEM file of the serving private key
    #[arg(long, default_value = DEFAULT_TLS_KEY_FILE)]
    tls_key_file: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    // The kube client, reqwest and the server all share one rustls provider.
    server::install_crypto_provider();

    let cli = Cli::parse();
    let mut config = KritisConfig::new(cli.config).context("load config")?;

    let client = kube::Client::try_default()
        .await
        .context("create kubernetes client")?;
    if let Some(spec) = kritis_config_override(client.clone())
        .await
        .context("read KritisConfig resources")?
    {
        info!("Apply cluster KritisConfig override");
        config.apply_override(&spec);
    }

    // Fail early on an unsupported backend or unreadable Grafeas certificates.
    metadata::new_client(&config.metadata)
        .await
        .context("create metadata client")?;

    let acceptor = server::tls_acceptor(&cli.tls_cert_file, &cli.tls_key_file)?;
    let addr = config
        .server_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid server address {}", config.server_addr))?;

    let policies = Arc::new(KubePolicySource::new(client.clone()));
    let strategy = new_strategy(
        config.violation_strategy,
        Arc::new(KubeWorkloadDeleter::new(client.clone())),
    );
    let reviewer = Reviewer::new(
        strategy,
        Arc::new(KubeSecretFetcher::new(client.clone())),
        policies.clone(),
        config.global_allowlist()?,
        true,
    );
    let admitter = Admitter::new(
        config.admission_config()?,
        policies,
        Arc::new(KubeOwnerResolver::new(client)),
        Arc::new(config.metadata.clone()),
        Arc::new(reviewer),
    );
    let router = Arc::new(Router::new(Arc::new(admitter)));

    info!(
        "kritis-server uses {} violation strategy and {} metadata backend",
        config.violation_strategy.as_ref(),
        config.metadata.backend
    );

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => info!("SIGINT received, gracefully shutdown."),
        _ = terminate.recv() => info!("SIGTERM received, gracefully shutdown."),
        res = server::serve(addr, acceptor, router) => res?,
    }

    Ok(())
}
