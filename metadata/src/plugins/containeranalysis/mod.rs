// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Google Container Analysis backend.
//!
//! Container Analysis serves the Grafeas v1beta1 API. Occurrences of an image
//! live in the project hosting it in Container Registry (`*.gcr.io`) or
//! Artifact Registry (`<location>-docker.pkg.dev`), and every request carries
//! an OAuth access token.

use log::info;
use reqwest::{ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::OnceCell};

use super::grafeas::GrafeasClient;
use crate::{Error, Result};

pub const DEFAULT_CONTAINER_ANALYSIS_ADDR: &str = "https://containeranalysis.googleapis.com";

/// Token endpoint of the GCE/GKE metadata server.
pub const DEFAULT_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ContainerAnalysisConfig {
    /// Base address of the Container Analysis API.
    pub addr: String,

    /// Metadata server endpoint handing out access tokens of the node's
    /// service account.
    pub token_url: String,

    /// File holding an access token. Takes precedence over `token_url`.
    pub access_token_file: Option<String>,
}

impl Default for ContainerAnalysisConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_CONTAINER_ANALYSIS_ADDR.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            access_token_file: None,
        }
    }
}

pub fn is_registry_gcr(registry: &str) -> bool {
    registry == "gcr.io" || registry.ends_with(".gcr.io")
}

pub fn is_registry_gar(registry: &str) -> bool {
    registry
        .strip_suffix("-docker.pkg.dev")
        .is_some_and(|location| !location.is_empty())
}

/// The path segment after the registry, or an empty string.
pub fn project_from_image(image: &str) -> &str {
    image.split('/').nth(1).unwrap_or_default()
}

/// Project hosting `image`, which must live in Container Registry or
/// Artifact Registry.
pub fn hosting_project(image: &str) -> Result<String> {
    let registry = image.split('/').next().unwrap_or_default();
    if !is_registry_gcr(registry) && !is_registry_gar(registry) {
        return Err(Error::UnsupportedImage(image.to_string()));
    }
    match project_from_image(image) {
        "" => Err(Error::UnsupportedImage(image.to_string())),
        project => Ok(project.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Credentials {
    File(String),
    MetadataServer(String),
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

/// Source of the bearer token. The token is fetched on first use and kept
/// for the life of the client, which spans one review stage.
#[derive(Debug)]
pub struct TokenSource {
    credentials: Credentials,
    token: OnceCell<String>,
}

impl TokenSource {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::File(path.into()),
            token: OnceCell::new(),
        }
    }

    pub fn metadata_server(url: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::MetadataServer(url.into()),
            token: OnceCell::new(),
        }
    }

    pub async fn token(&self, http_client: &reqwest::Client) -> Result<&str> {
        self.token
            .get_or_try_init(|| self.fetch(http_client))
            .await
            .map(String::as_str)
    }

    async fn fetch(&self, http_client: &reqwest::Client) -> Result<String> {
        match &self.credentials {
            Credentials::File(path) => {
                let token = fs::read_to_string(path)
                    .await
                    .map_err(|source| Error::ReadFile {
                        path: path.clone(),
                        source,
                    })?;
                let token = token.trim();
                if token.is_empty() {
                    return Err(Error::Token(format!("{path} is empty")));
                }
                Ok(token.to_string())
            }
            Credentials::MetadataServer(url) => {
                let response = http_client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                let status = response.status();
                if status != StatusCode::OK {
                    return Err(Error::Token(format!("{url} answered {status}")));
                }
                let token: AccessToken = response.json().await?;
                Ok(token.access_token)
            }
        }
    }
}

impl From<&ContainerAnalysisConfig> for TokenSource {
    fn from(config: &ContainerAnalysisConfig) -> Self {
        match &config.access_token_file {
            Some(path) => TokenSource::file(path.clone()),
            None => TokenSource::metadata_server(config.token_url.clone()),
        }
    }
}

/// Build a Container Analysis client from `config`.
pub fn client_from_config(config: &ContainerAnalysisConfig) -> Result<GrafeasClient> {
    let http_client = ClientBuilder::new()
        .use_rustls_tls()
        .build()
        .map_err(|e| Error::InvalidConfig(format!("build http client failed: {e}")))?;

    info!("Container Analysis metadata client for {}", config.addr);
    Ok(GrafeasClient::new(&config.addr, "", http_client)?
        .with_hosting_project()
        .with_token(TokenSource::from(config)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gcr.io", true)]
    #[case("eu.gcr.io", true)]
    #[case("foogcr.io", false)]
    #[case("index.docker.io", false)]
    fn gcr_registry(#[case] registry: &str, #[case] expected: bool) {
        assert_eq!(is_registry_gcr(registry), expected);
    }

    #[rstest]
    #[case("europe-docker.pkg.dev", true)]
    #[case("us-central1-docker.pkg.dev", true)]
    #[case("pkg.dev", false)]
    #[case("index.docker.io", false)]
    #[case("europe-python.pkg.dev", false)]
    fn gar_registry(#[case] registry: &str, #[case] expected: bool) {
        assert_eq!(is_registry_gar(registry), expected);
    }

    #[rstest]
    #[case("gcr.io/project/1", "project")]
    #[case("gcr.io/project", "project")]
    #[case("gcr.io", "")]
    fn project_of_image(#[case] image: &str, #[case] project: &str) {
        assert_eq!(project_from_image(image), project);
    }

    #[rstest]
    #[case("gcr.io/team/app@sha256:aa", Some("team"))]
    #[case("us-central1-docker.pkg.dev/team/repo/app:v1", Some("team"))]
    #[case("docker.io/library/nginx:1.25", None)]
    #[case("gcr.io", None)]
    fn hosting_project_of_image(#[case] image: &str, #[case] expected: Option<&str>) {
        assert_eq!(hosting_project(image).ok().as_deref(), expected);
    }

    #[tokio::test]
    async fn token_is_read_from_file_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  ya29.first  ").unwrap();
        let source = TokenSource::file(file.path().to_string_lossy());
        let http_client = reqwest::Client::new();

        assert_eq!(source.token(&http_client).await.unwrap(), "ya29.first");

        std::fs::write(file.path(), "ya29.second").unwrap();
        assert_eq!(source.token(&http_client).await.unwrap(), "ya29.first");
    }

    #[tokio::test]
    async fn empty_token_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = TokenSource::file(file.path().to_string_lossy());
        let err = source.token(&reqwest::Client::new()).await.unwrap_err();
        assert!(matches!(err, Error::Token(_)));
    }

    #[test]
    fn token_file_takes_precedence() {
        let config = ContainerAnalysisConfig {
            access_token_file: Some("/var/run/secrets/token".into()),
            ..Default::default()
        };
        assert_eq!(
            TokenSource::from(&config).credentials,
            Credentials::File("/var/run/secrets/token".into())
        );
        assert_eq!(
            TokenSource::from(&ContainerAnalysisConfig::default()).credentials,
            Credentials::MetadataServer(DEFAULT_TOKEN_URL.into())
        );
    }
}
