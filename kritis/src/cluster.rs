// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Collaborators backed by the Kubernetes API server.

use std::str::FromStr;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Pod, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DeleteParams, ListParams};
use kube::{Api, Client};
use log::{debug, info};
use signature::SigningSecret;

use crate::admission::owners::OwnerResolver;
use crate::admission::workload::{Workload, WorkloadKind, WorkloadRef};
use crate::crd::{
    AttestationAuthority, GenericAttestationPolicy, ImageSecurityPolicy, KritisConfig,
    KritisConfigSpec,
};
use crate::policy::PolicySource;
use crate::secrets::{SecretFetcher, PRIVATE_KEY_DATA_KEY, PUBLIC_KEY_DATA_KEY};
use crate::violation::WorkloadDeleter;
use crate::{Error, Result};

fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(response) if response.code == 404)
}

/// Lists policies and authorities from the custom resources of a namespace.
#[derive(Clone)]
pub struct KubePolicySource {
    client: Client,
}

impl KubePolicySource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicySource for KubePolicySource {
    async fn image_security_policies(&self, namespace: &str) -> Result<Vec<ImageSecurityPolicy>> {
        let api: Api<ImageSecurityPolicy> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn generic_attestation_policies(
        &self,
        namespace: &str,
    ) -> Result<Vec<GenericAttestationPolicy>> {
        let api: Api<GenericAttestationPolicy> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn authorities(&self, namespace: &str) -> Result<Vec<AttestationAuthority>> {
        let api: Api<AttestationAuthority> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

/// Reads signing key pairs from Kubernetes secrets.
#[derive(Clone)]
pub struct KubeSecretFetcher {
    client: Client,
}

impl KubeSecretFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretFetcher for KubeSecretFetcher {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SigningSecret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get(name).await.map_err(|e| {
            if is_not_found(&e) {
                Error::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            } else {
                Error::Kube(e)
            }
        })?;

        let data = secret.data.unwrap_or_default();
        let key = |key: &str| {
            data.get(key)
                .map(|value| value.0.clone())
                .ok_or_else(|| Error::InvalidSecret {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    reason: format!("missing data key {key}"),
                })
        };
        Ok(SigningSecret::new(
            name,
            key(PUBLIC_KEY_DATA_KEY)?,
            key(PRIVATE_KEY_DATA_KEY)?,
        ))
    }
}

/// Fetches owners of a workload to compare their images.
#[derive(Clone)]
pub struct KubeOwnerResolver {
    client: Client,
}

impl KubeOwnerResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnerResolver for KubeOwnerResolver {
    async fn owner_images(&self, namespace: &str, owner: &OwnerReference) -> Result<Vec<String>> {
        let kind = WorkloadKind::from_str(&owner.kind)
            .map_err(|_| Error::UnsupportedKind(owner.kind.clone()))?;
        debug!("fetching owner {} {namespace}/{}", owner.kind, owner.name);

        let client = self.client.clone();
        let workload = match kind {
            WorkloadKind::Pod => {
                let api: Api<Pod> = Api::namespaced(client, namespace);
                Workload::Pod(api.get(&owner.name).await?)
            }
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(client, namespace);
                Workload::Deployment(api.get(&owner.name).await?)
            }
            WorkloadKind::ReplicaSet => {
                let api: Api<ReplicaSet> = Api::namespaced(client, namespace);
                Workload::ReplicaSet(api.get(&owner.name).await?)
            }
        };
        Ok(workload.images())
    }
}

/// Deletes workloads through the API server.
#[derive(Clone)]
pub struct KubeWorkloadDeleter {
    client: Client,
}

impl KubeWorkloadDeleter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WorkloadDeleter for KubeWorkloadDeleter {
    async fn delete(&self, workload: &WorkloadRef) -> Result<()> {
        let client = self.client.clone();
        let namespace = workload.namespace.as_str();
        let params = DeleteParams::default();
        let result = match workload.kind {
            WorkloadKind::Pod => Api::<Pod>::namespaced(client, namespace)
                .delete(&workload.name, &params)
                .await
                .map(|_| ()),
            WorkloadKind::Deployment => Api::<Deployment>::namespaced(client, namespace)
                .delete(&workload.name, &params)
                .await
                .map(|_| ()),
            WorkloadKind::ReplicaSet => Api::<ReplicaSet>::namespaced(client, namespace)
                .delete(&workload.name, &params)
                .await
                .map(|_| ()),
        };
        result.map_err(|e| Error::DeleteWorkload {
            workload: workload.to_string(),
            reason: e.to_string(),
        })?;
        info!("deleted {workload}");
        Ok(())
    }
}

/// The cluster-wide `KritisConfig` override, if one exists.
pub async fn kritis_config_override(client: Client) -> Result<Option<KritisConfigSpec>> {
    let api: Api<KritisConfig> = Api::all(client);
    let mut configs = api.list(&ListParams::default()).await?.items;
    match configs.len() {
        0 => Ok(None),
        1 => Ok(configs.pop().map(|c| c.spec)),
        n => Err(Error::MultipleKritisConfigs(n)),
    }
}
