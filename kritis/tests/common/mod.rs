// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! In-memory collaborators for admission tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kritis::admission::owners::OwnerResolver;
use kritis::admission::workload::{Workload, WorkloadKind, WorkloadRef};
use kritis::admission::{AdmissionConfig, Admitter, MetadataClientFactory};
use kritis::allowlist::GlobalAllowlist;
use kritis::crd::{
    AttestationAuthority, AttestationAuthoritySpec, GenericAttestationPolicy,
    GenericAttestationPolicySpec, ImageSecurityPolicy, ImageSecurityPolicySpec,
    PackageVulnerabilityRequirements,
};
use kritis::policy::PolicySource;
use kritis::review::Reviewer;
use kritis::secrets::SecretFetcher;
use kritis::violation::{new_strategy, StrategyKind, WorkloadDeleter};
use kritis::{Error, Result};
use metadata::{
    AuthorityNote, ContentType, Note, Occurrence, PgpAttestation, ReadOnlyClient,
    ReadWriteClient, Severity, Vulnerability,
};
use serde_json::json;
use signature::SigningSecret;

pub const NAMESPACE: &str = "default";

#[derive(Default)]
struct MetadataState {
    vulnerabilities: HashMap<String, Vec<Vulnerability>>,
    attestations: HashMap<String, Vec<PgpAttestation>>,
    notes: HashMap<String, Note>,
    vulnerability_calls: usize,
    occurrences_created: usize,
    clients: usize,
    attestations_unavailable: bool,
}

/// Metadata backend shared by every client it hands out.
#[derive(Clone, Default)]
pub struct FakeMetadata {
    state: Arc<Mutex<MetadataState>>,
}

impl FakeMetadata {
    pub fn with_vulnerabilities(self, image: &str, vulnerabilities: Vec<Vulnerability>) -> Self {
        self.state
            .lock()
            .unwrap()
            .vulnerabilities
            .insert(image.to_string(), vulnerabilities);
        self
    }

    pub fn with_attestation(self, image: &str, attestation: PgpAttestation) -> Self {
        self.state
            .lock()
            .unwrap()
            .attestations
            .entry(image.to_string())
            .or_default()
            .push(attestation);
        self
    }

    /// Listing attestations fails from now on. Creating them still works.
    pub fn with_attestations_unavailable(self) -> Self {
        self.state.lock().unwrap().attestations_unavailable = true;
        self
    }

    pub fn vulnerability_calls(&self) -> usize {
        self.state.lock().unwrap().vulnerability_calls
    }

    pub fn occurrences_created(&self) -> usize {
        self.state.lock().unwrap().occurrences_created
    }

    pub fn clients(&self) -> usize {
        self.state.lock().unwrap().clients
    }

    pub fn attestations(&self, image: &str) -> Vec<PgpAttestation> {
        self.state
            .lock()
            .unwrap()
            .attestations
            .get(image)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReadOnlyClient for FakeMetadata {
    async fn vulnerabilities(&self, image: &str) -> metadata::Result<Vec<Vulnerability>> {
        let mut state = self.state.lock().unwrap();
        state.vulnerability_calls += 1;
        Ok(state.vulnerabilities.get(image).cloned().unwrap_or_default())
    }

    async fn attestations(&self, image: &str) -> metadata::Result<Vec<PgpAttestation>> {
        if self.state.lock().unwrap().attestations_unavailable {
            return Err(metadata::Error::Status {
                status: 503,
                body: "occurrences are unavailable".into(),
            });
        }
        Ok(FakeMetadata::attestations(self, image))
    }

    async fn get_attestation_note(&self, authority: &AuthorityNote) -> metadata::Result<Note> {
        self.state
            .lock()
            .unwrap()
            .notes
            .get(&authority.note_reference)
            .cloned()
            .ok_or_else(|| metadata::Error::NotFound(authority.note_reference.clone()))
    }
}

#[async_trait]
impl ReadWriteClient for FakeMetadata {
    async fn create_attestation_note(&self, authority: &AuthorityNote) -> metadata::Result<Note> {
        let note = Note {
            name: authority.note_reference.clone(),
            short_description: format!("Image Policy Security Attestor {}", authority.name),
        };
        self.state
            .lock()
            .unwrap()
            .notes
            .insert(authority.note_reference.clone(), note.clone());
        Ok(note)
    }

    async fn create_attestation_occurrence(
        &self,
        note: &Note,
        image: &str,
        secret: &SigningSecret,
    ) -> metadata::Result<Occurrence> {
        let signature = secret.sign_image(image)?;
        let mut state = self.state.lock().unwrap();
        state.occurrences_created += 1;
        state
            .attestations
            .entry(image.to_string())
            .or_default()
            .push(PgpAttestation {
                key_id: secret.name.clone(),
                signature,
                content_type: ContentType::SimpleSigningJson,
            });
        Ok(Occurrence {
            name: format!("occurrences/{}", state.occurrences_created),
            note_name: note.name.clone(),
            resource_uri: format!("https://{image}"),
        })
    }
}

#[async_trait]
impl MetadataClientFactory for FakeMetadata {
    async fn read_only(&self) -> metadata::Result<Box<dyn ReadOnlyClient>> {
        self.state.lock().unwrap().clients += 1;
        Ok(Box::new(self.clone()))
    }

    async fn read_write(&self) -> metadata::Result<Box<dyn ReadWriteClient>> {
        self.state.lock().unwrap().clients += 1;
        Ok(Box::new(self.clone()))
    }
}

/// Policies and authorities of every namespace, with a fetch counter.
#[derive(Default)]
pub struct FakePolicies {
    pub isps: Vec<ImageSecurityPolicy>,
    pub gaps: Vec<GenericAttestationPolicy>,
    pub authorities: Vec<AttestationAuthority>,
    pub fail: bool,
    pub fetches: Mutex<usize>,
}

impl FakePolicies {
    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    fn fetch(&self) -> Result<()> {
        *self.fetches.lock().unwrap() += 1;
        if self.fail {
            return Err(Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".into(),
                message: "the server is currently unable to handle the request".into(),
                reason: "ServiceUnavailable".into(),
                code: 503,
            })));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicySource for FakePolicies {
    async fn image_security_policies(&self, _: &str) -> Result<Vec<ImageSecurityPolicy>> {
        self.fetch()?;
        Ok(self.isps.clone())
    }

    async fn generic_attestation_policies(
        &self,
        _: &str,
    ) -> Result<Vec<GenericAttestationPolicy>> {
        self.fetch()?;
        Ok(self.gaps.clone())
    }

    async fn authorities(&self, _: &str) -> Result<Vec<AttestationAuthority>> {
        Ok(self.authorities.clone())
    }
}

#[derive(Default)]
pub struct FakeSecrets(pub HashMap<String, SigningSecret>);

#[async_trait]
impl SecretFetcher for FakeSecrets {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SigningSecret> {
        self.0.get(name).cloned().ok_or_else(|| Error::SecretNotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeOwners(pub HashMap<String, Vec<String>>);

#[async_trait]
impl OwnerResolver for FakeOwners {
    async fn owner_images(&self, _: &str, owner: &OwnerReference) -> Result<Vec<String>> {
        self.0
            .get(&owner.name)
            .cloned()
            .ok_or_else(|| Error::UnsupportedKind(owner.kind.clone()))
    }
}

#[derive(Default)]
pub struct RecordingDeleter(pub Mutex<Vec<WorkloadRef>>);

#[async_trait]
impl WorkloadDeleter for RecordingDeleter {
    async fn delete(&self, workload: &WorkloadRef) -> Result<()> {
        self.0.lock().unwrap().push(workload.clone());
        Ok(())
    }
}

/// Everything an [`Admitter`] talks to, kept around for assertions.
pub struct Harness {
    pub metadata: FakeMetadata,
    pub policies: Arc<FakePolicies>,
    pub secrets: Arc<FakeSecrets>,
    pub owners: Arc<FakeOwners>,
    pub deleter: Arc<RecordingDeleter>,
    pub strategy: StrategyKind,
    /// Review outside the webhook, as a periodic audit does.
    pub audit: bool,
}

impl Harness {
    pub fn new(metadata: FakeMetadata, policies: FakePolicies) -> Self {
        Self {
            metadata,
            policies: Arc::new(policies),
            secrets: Arc::new(FakeSecrets::default()),
            owners: Arc::new(FakeOwners::default()),
            deleter: Arc::new(RecordingDeleter::default()),
            strategy: StrategyKind::Logging,
            audit: false,
        }
    }

    pub fn with_secrets(mut self, secrets: &[&SigningSecret]) -> Self {
        self.secrets = Arc::new(FakeSecrets(
            secrets
                .iter()
                .map(|s| (s.name.clone(), (*s).clone()))
                .collect(),
        ));
        self
    }

    pub fn with_owner(mut self, name: &str, images: &[&str]) -> Self {
        self.owners = Arc::new(FakeOwners(HashMap::from([(
            name.to_string(),
            images.iter().map(|i| i.to_string()).collect(),
        )])));
        self
    }

    pub fn admitter(&self) -> Admitter {
        let config = AdmissionConfig::default();
        let reviewer = Reviewer::new(
            new_strategy(self.strategy, self.deleter.clone()),
            self.secrets.clone(),
            self.policies.clone(),
            GlobalAllowlist::default(),
            !self.audit,
        );
        Admitter::new(
            config,
            self.policies.clone(),
            self.owners.clone(),
            Arc::new(self.metadata.clone()),
            Arc::new(reviewer),
        )
    }
}

pub fn vulnerability(cve: &str, severity: Severity, has_fix_available: bool) -> Vulnerability {
    Vulnerability {
        cve: format!("projects/goog-vulnz/notes/{cve}"),
        severity,
        has_fix_available,
    }
}

pub fn isp(maximum_severity: &str) -> ImageSecurityPolicy {
    let mut isp = ImageSecurityPolicy::new(
        "my-isp",
        ImageSecurityPolicySpec {
            image_allowlist: Vec::new(),
            package_vulnerability_requirements: PackageVulnerabilityRequirements {
                maximum_severity: maximum_severity.to_string(),
                ..Default::default()
            },
        },
    );
    isp.metadata.namespace = Some(NAMESPACE.to_string());
    isp
}

pub fn gap(authorities: &[&str]) -> GenericAttestationPolicy {
    let mut gap = GenericAttestationPolicy::new(
        "my-gap",
        GenericAttestationPolicySpec {
            attestation_authority_names: authorities.iter().map(|a| a.to_string()).collect(),
        },
    );
    gap.metadata.namespace = Some(NAMESPACE.to_string());
    gap
}

/// An authority backed by a freshly generated key pair.
pub fn authority(name: &str) -> (AttestationAuthority, SigningSecret) {
    let secret = SigningSecret::generate(&format!("{name}-key")).unwrap();
    let mut authority = AttestationAuthority::new(
        name,
        AttestationAuthoritySpec {
            note_reference: format!("projects/kritis/notes/{name}"),
            private_key_secret_name: secret.name.clone(),
            public_key_data: STANDARD.encode(&secret.public_key),
        },
    );
    authority.metadata.namespace = Some(NAMESPACE.to_string());
    (authority, secret)
}

pub fn attestation(secret: &SigningSecret, image: &str) -> PgpAttestation {
    PgpAttestation {
        key_id: secret.name.clone(),
        signature: secret.sign_image(image).unwrap(),
        content_type: ContentType::SimpleSigningJson,
    }
}

fn containers(images: &[&str]) -> serde_json::Value {
    images
        .iter()
        .enumerate()
        .map(|(i, image)| json!({"name": format!("c{i}"), "image": image}))
        .collect()
}

pub fn pod(images: &[&str]) -> Workload {
    Workload::from_value(
        WorkloadKind::Pod,
        json!({
            "metadata": {"name": "web", "namespace": NAMESPACE},
            "spec": {"containers": containers(images)}
        }),
    )
    .unwrap()
}

pub fn annotated_pod(images: &[&str], annotations: serde_json::Value) -> Workload {
    Workload::from_value(
        WorkloadKind::Pod,
        json!({
            "metadata": {"name": "web", "namespace": NAMESPACE, "annotations": annotations},
            "spec": {"containers": containers(images)}
        }),
    )
    .unwrap()
}

pub fn replica_set(images: &[&str], owner: &str) -> Workload {
    Workload::from_value(
        WorkloadKind::ReplicaSet,
        json!({
            "metadata": {
                "name": "web-7d4b9",
                "namespace": NAMESPACE,
                "ownerReferences": [{
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "name": owner,
                    "uid": "3f1c2d"
                }]
            },
            "spec": {
                "selector": {"matchLabels": {"app": "web"}},
                "template": {
                    "metadata": {"labels": {"app": "web"}},
                    "spec": {"containers": containers(images)}
                }
            }
        }),
    )
    .unwrap()
}
