// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Kinds of workload that are reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
pub enum WorkloadKind {
    Pod,
    Deployment,
    ReplicaSet,
}

/// A workload under review.
#[derive(Debug, Clone)]
pub enum Workload {
    Pod(Pod),
    Deployment(Deployment),
    ReplicaSet(ReplicaSet),
}

/// Identity of a workload, used in logs and to delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Images of a pod spec: init containers first, then containers, each in
/// declaration order.
pub fn pod_spec_images(spec: &PodSpec) -> Vec<String> {
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .filter_map(|c| c.image.clone())
        .collect()
}

impl Workload {
    /// Decode an object of `kind` from its JSON form.
    pub fn from_value(kind: WorkloadKind, object: serde_json::Value) -> Result<Self> {
        let decode = |source| Error::Decode {
            kind: kind.to_string(),
            source,
        };
        Ok(match kind {
            WorkloadKind::Pod => Workload::Pod(serde_json::from_value(object).map_err(decode)?),
            WorkloadKind::Deployment => {
                Workload::Deployment(serde_json::from_value(object).map_err(decode)?)
            }
            WorkloadKind::ReplicaSet => {
                Workload::ReplicaSet(serde_json::from_value(object).map_err(decode)?)
            }
        })
    }

    pub fn kind(&self) -> WorkloadKind {
        match self {
            Workload::Pod(_) => WorkloadKind::Pod,
            Workload::Deployment(_) => WorkloadKind::Deployment,
            Workload::ReplicaSet(_) => WorkloadKind::ReplicaSet,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Workload::Pod(p) => &p.metadata,
            Workload::Deployment(d) => &d.metadata,
            Workload::ReplicaSet(r) => &r.metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Workload::Pod(p) => &mut p.metadata,
            Workload::Deployment(d) => &mut d.metadata,
            Workload::ReplicaSet(r) => &mut r.metadata,
        }
    }

    pub fn name(&self) -> &str {
        let meta = self.metadata();
        meta.name
            .as_deref()
            .or(meta.generate_name.as_deref())
            .unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    /// Fill in the namespace when the object does not carry one, as is the
    /// case for objects inside admission requests.
    pub fn default_namespace(&mut self, namespace: &str) {
        let meta = self.metadata_mut();
        if meta.namespace.as_deref().map_or(true, str::is_empty) {
            meta.namespace = Some(namespace.to_string());
        }
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata().annotations.as_ref()
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata().owner_references.as_deref().unwrap_or_default()
    }

    pub fn pod_spec(&self) -> Option<&PodSpec> {
        match self {
            Workload::Pod(p) => p.spec.as_ref(),
            Workload::Deployment(d) => d.spec.as_ref()?.template.spec.as_ref(),
            Workload::ReplicaSet(r) => r.spec.as_ref()?.template.as_ref()?.spec.as_ref(),
        }
    }

    /// Declared container images, see [`pod_spec_images`].
    pub fn images(&self) -> Vec<String> {
        self.pod_spec().map(pod_spec_images).unwrap_or_default()
    }

    pub fn reference(&self) -> WorkloadRef {
        WorkloadRef {
            kind: self.kind(),
            namespace: self.namespace().to_string(),
            name: self.name().to_string(),
        }
    }
}
