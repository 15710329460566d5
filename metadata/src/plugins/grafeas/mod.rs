// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Grafeas v1beta1 REST backend.

use std::str::FromStr;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Certificate, ClientBuilder, Identity, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use signature::SigningSecret;
use tokio::fs;
use url::Url;

use super::containeranalysis::{hosting_project, TokenSource};
use crate::{
    parse_note_reference, AuthorityNote, ContentType, Error, Note, Occurrence, PgpAttestation,
    ReadOnlyClient, ReadWriteClient, Result, Severity, Vulnerability,
};

pub mod model;

pub const DEFAULT_GRAFEAS_ADDR: &str = "https://grafeas-server:443";
pub const DEFAULT_GRAFEAS_PROJECT: &str = "kritis";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GrafeasConfig {
    /// Base address of the Grafeas server.
    pub addr: String,

    /// Project that attestation occurrences are written to.
    pub project: String,

    /// PEM file of the CA that signed the server certificate.
    pub ca_cert: Option<String>,

    /// PEM files of the client certificate and key, for mutual TLS.
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

impl Default for GrafeasConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_GRAFEAS_ADDR.to_string(),
            project: DEFAULT_GRAFEAS_PROJECT.to_string(),
            ca_cert: None,
            client_cert: None,
            client_key: None,
        }
    }
}

async fn read_pem(path: &str) -> Result<Vec<u8>> {
    fs::read(path).await.map_err(|source| Error::ReadFile {
        path: path.to_string(),
        source,
    })
}

/// Project holding the occurrences of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccurrenceProject {
    /// One project for every image.
    Fixed(String),
    /// The project hosting the image in Container Registry or Artifact
    /// Registry.
    Hosting,
}

impl OccurrenceProject {
    fn for_image(&self, image: &str) -> Result<String> {
        match self {
            OccurrenceProject::Fixed(project) => Ok(project.clone()),
            OccurrenceProject::Hosting => hosting_project(image),
        }
    }
}

pub struct GrafeasClient {
    http_client: reqwest::Client,
    addr: String,
    project: OccurrenceProject,
    token: Option<TokenSource>,
}

impl GrafeasClient {
    pub fn new(addr: &str, project: &str, http_client: reqwest::Client) -> Result<Self> {
        Url::parse(addr).map_err(|e| Error::InvalidConfig(format!("grafeas addr {addr}: {e}")))?;
        Ok(Self {
            http_client,
            addr: addr.trim_end_matches('/').to_string(),
            project: OccurrenceProject::Fixed(project.to_string()),
            token: None,
        })
    }

    /// Keep occurrences in the project hosting each image.
    pub fn with_hosting_project(mut self) -> Self {
        self.project = OccurrenceProject::Hosting;
        self
    }

    /// Authenticate every request with a bearer token from `token`.
    pub fn with_token(mut self, token: TokenSource) -> Self {
        self.token = Some(token);
        self
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token.token(&self.http_client).await?),
            None => request,
        };
        Ok(request.send().await?)
    }

    /// Build a client, loading the TLS material named in `config`.
    pub async fn from_config(config: &GrafeasConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new().use_rustls_tls();

        if let Some(ca_cert) = &config.ca_cert {
            let pem = read_pem(ca_cert).await?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| Error::InvalidConfig(format!("read grafeas ca cert failed: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        match (&config.client_cert, &config.client_key) {
            (Some(cert), Some(key)) => {
                let mut pem = read_pem(cert).await?;
                pem.extend_from_slice(&read_pem(key).await?);
                let identity = Identity::from_pem(&pem).map_err(|e| {
                    Error::InvalidConfig(format!("read grafeas client identity failed: {e}"))
                })?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(Error::InvalidConfig(
                    "client_cert and client_key must be set together".into(),
                ))
            }
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("build http client failed: {e}")))?;

        info!(
            "Grafeas metadata client for {} (project {})",
            config.addr, config.project
        );
        Self::new(&config.addr, &config.project, http_client)
    }

    fn url(&self, path: &str) -> Result<Url> {
        let url = format!("{}/v1beta1/{path}", self.addr);
        Url::parse(&url).map_err(|e| Error::InvalidConfig(format!("{url}: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// List all occurrences of `kind` for `image` in the project of the
    /// image, following pagination.
    async fn list_occurrences(&self, image: &str, kind: &str) -> Result<Vec<model::Occurrence>> {
        let project = self.project.for_image(image)?;
        let filter = format!("resourceUrl=\"https://{image}\" AND kind=\"{kind}\"");
        let mut occurrences = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut url = self.url(&format!("projects/{project}/occurrences"))?;
            url.query_pairs_mut().append_pair("filter", &filter);
            if !page_token.is_empty() {
                url.query_pairs_mut().append_pair("pageToken", &page_token);
            }

            let response = self.send(self.http_client.get(url)).await?;
            let page: model::ListOccurrencesResponse =
                Self::read_json(response, "occurrences").await?;
            occurrences.extend(page.occurrences);

            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }

        debug!("{} {kind} occurrences for {image}", occurrences.len());
        Ok(occurrences)
    }

    fn to_note(note: model::Note) -> Note {
        Note {
            name: note.name,
            short_description: note.short_description,
        }
    }
}

#[async_trait]
impl ReadOnlyClient for GrafeasClient {
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>> {
        self.list_occurrences(image, model::KIND_VULNERABILITY)
            .await?
            .into_iter()
            .filter_map(|occ| occ.vulnerability.map(|v| (occ.note_name, v)))
            .map(|(note_name, details)| -> Result<Vulnerability> {
                let severity = match details.severity.as_deref() {
                    Some(s) => {
                        Severity::from_str(s).map_err(|_| Error::InvalidSeverity(s.to_string()))?
                    }
                    None => Severity::Unspecified,
                };
                Ok(Vulnerability {
                    cve: note_name,
                    severity,
                    has_fix_available: details.fix_available(),
                })
            })
            .collect()
    }

    async fn attestations(&self, image: &str) -> Result<Vec<PgpAttestation>> {
        let attestations = self
            .list_occurrences(image, model::KIND_ATTESTATION)
            .await?
            .into_iter()
            .filter_map(|occ| occ.attestation?.attestation.pgp_signed_attestation)
            .map(|pgp| PgpAttestation {
                key_id: pgp.pgp_key_id,
                signature: pgp.signature,
                content_type: pgp
                    .content_type
                    .as_deref()
                    .and_then(|c| ContentType::from_str(c).ok())
                    .unwrap_or_default(),
            })
            .collect();
        Ok(attestations)
    }

    async fn get_attestation_note(&self, authority: &AuthorityNote) -> Result<Note> {
        let (project, note_id) = parse_note_reference(&authority.note_reference)?;
        let url = self.url(&format!("projects/{project}/notes/{note_id}"))?;
        let response = self.send(self.http_client.get(url)).await?;
        let note: model::Note = Self::read_json(response, &authority.note_reference).await?;
        Ok(Self::to_note(note))
    }
}

#[async_trait]
impl ReadWriteClient for GrafeasClient {
    async fn create_attestation_note(&self, authority: &AuthorityNote) -> Result<Note> {
        let (project, note_id) = parse_note_reference(&authority.note_reference)?;
        let mut url = self.url(&format!("projects/{project}/notes"))?;
        url.query_pairs_mut().append_pair("noteId", &note_id);

        let body = model::Note {
            name: authority.note_reference.clone(),
            short_description: format!("Image Policy Security Attestor {}", authority.name),
            long_description: format!(
                "Image Policy Security Attestor deployed by attestation authority {}",
                authority.name
            ),
            kind: Some(model::KIND_ATTESTATION.to_string()),
            attestation_authority: Some(model::Authority {
                hint: model::Hint {
                    human_readable_name: authority.name.clone(),
                },
            }),
        };

        let response = self.send(self.http_client.post(url).json(&body)).await?;
        if response.status() == StatusCode::CONFLICT {
            // Another review created the note between our read and this write.
            info!("note {} already exists, reading it", authority.note_reference);
            return self.get_attestation_note(authority).await;
        }

        let note: model::Note = Self::read_json(response, &authority.note_reference).await?;
        Ok(Self::to_note(note))
    }

    async fn create_attestation_occurrence(
        &self,
        note: &Note,
        image: &str,
        secret: &SigningSecret,
    ) -> Result<Occurrence> {
        let project = self.project.for_image(image)?;
        let signature = secret.sign_image(image)?;

        let body = model::Occurrence {
            name: String::new(),
            resource: model::Resource {
                uri: format!("https://{image}"),
            },
            note_name: note.name.clone(),
            kind: Some(model::KIND_ATTESTATION.to_string()),
            vulnerability: None,
            attestation: Some(model::AttestationDetails {
                attestation: model::Attestation {
                    pgp_signed_attestation: Some(model::PgpSignedAttestation {
                        signature,
                        content_type: Some(ContentType::SimpleSigningJson.as_ref().to_string()),
                        pgp_key_id: secret.name.clone(),
                    }),
                },
            }),
        };

        let url = self.url(&format!("projects/{project}/occurrences"))?;
        let response = self.send(self.http_client.post(url).json(&body)).await?;
        let created: model::Occurrence = Self::read_json(response, "occurrence").await?;

        info!("created attestation {} for {image}", created.name);
        Ok(Occurrence {
            name: created.name,
            note_name: created.note_name,
            resource_uri: created.resource.uri,
        })
    }
}
