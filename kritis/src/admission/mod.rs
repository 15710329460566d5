// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Admission pipeline
//!
//! For each workload under review, in order:
//! 1. extract the declared container images;
//! 2. allow when the owners of the workload already vouch for its images;
//! 3. allow when the breakglass annotation is present;
//! 4. evaluate Generic Attestation Policies, then Image Security Policies.
//!
//! Errors while fetching policies or building a metadata client deny the
//! workload.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use metadata::{MetadataConfig, ReadOnlyClient, ReadWriteClient};

use crate::allowlist::GlobalAllowlist;
use crate::policy::PolicySource;
use crate::review::Review;

pub mod owners;
pub mod webhook;
pub mod workload;

use owners::{check_owners, OwnerResolver};
use workload::Workload;

pub const DEFAULT_BREAKGLASS_ANNOTATION: &str = "kritis.grafeas.io/breakglass";
pub const SUCCESS_MESSAGE: &str = "Successfully admitted.";

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Annotation whose presence bypasses policy evaluation.
    pub breakglass_annotation: String,
    pub allowlist: GlobalAllowlist,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            breakglass_annotation: DEFAULT_BREAKGLASS_ANNOTATION.to_string(),
            allowlist: GlobalAllowlist::default(),
        }
    }
}

/// Builds a metadata client for one policy stage of one review. The client
/// is dropped when the stage ends.
#[async_trait]
pub trait MetadataClientFactory: Send + Sync {
    async fn read_only(&self) -> metadata::Result<Box<dyn ReadOnlyClient>>;

    async fn read_write(&self) -> metadata::Result<Box<dyn ReadWriteClient>>;
}

#[async_trait]
impl MetadataClientFactory for MetadataConfig {
    async fn read_only(&self) -> metadata::Result<Box<dyn ReadOnlyClient>> {
        metadata::new_read_only_client(self).await
    }

    async fn read_write(&self) -> metadata::Result<Box<dyn ReadWriteClient>> {
        metadata::new_client(self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub message: String,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            message: message.into(),
        }
    }
}

pub struct Admitter {
    config: AdmissionConfig,
    policies: Arc<dyn PolicySource>,
    owners: Arc<dyn OwnerResolver>,
    metadata: Arc<dyn MetadataClientFactory>,
    reviewer: Arc<dyn Review>,
}

impl Admitter {
    pub fn new(
        config: AdmissionConfig,
        policies: Arc<dyn PolicySource>,
        owners: Arc<dyn OwnerResolver>,
        metadata: Arc<dyn MetadataClientFactory>,
        reviewer: Arc<dyn Review>,
    ) -> Self {
        Self {
            config,
            policies,
            owners,
            metadata,
            reviewer,
        }
    }

    fn breakglass(&self, workload: &Workload) -> bool {
        workload
            .annotations()
            .is_some_and(|a| a.contains_key(&self.config.breakglass_annotation))
    }

    /// Decide whether `workload` may be admitted.
    pub async fn decide(&self, workload: &Workload) -> Decision {
        let images = workload.images();
        let reference = workload.reference();
        let namespace = workload.namespace();

        if check_owners(self.owners.as_ref(), &self.config.allowlist, workload).await {
            return Decision::allow();
        }

        if self.breakglass(workload) {
            warn!("{reference}: found breakglass annotation, skipping policy evaluation");
            return Decision::allow();
        }

        let gaps = match self.policies.generic_attestation_policies(namespace).await {
            Ok(gaps) => gaps,
            Err(e) => {
                return Decision::deny(format!(
                    "error getting generic attestation policies: {e}"
                ))
            }
        };
        if !gaps.is_empty() {
            let client = match self.metadata.read_only().await {
                Ok(client) => client,
                Err(e) => return Decision::deny(format!("error getting metadata client: {e}")),
            };
            info!("{reference}: reviewing against {} generic attestation policies", gaps.len());
            if let Err(e) = self
                .reviewer
                .review_gap(&images, &gaps, &reference, client.as_ref())
                .await
            {
                return Decision::deny(e.to_string());
            }
        }

        let isps = match self.policies.image_security_policies(namespace).await {
            Ok(isps) => isps,
            Err(e) => {
                return Decision::deny(format!("error getting image security policies: {e}"))
            }
        };
        if !isps.is_empty() {
            let client = match self.metadata.read_write().await {
                Ok(client) => client,
                Err(e) => return Decision::deny(format!("error getting metadata client: {e}")),
            };
            info!("{reference}: reviewing against {} image security policies", isps.len());
            if let Err(e) = self
                .reviewer
                .review_isp(&images, &isps, &reference, client.as_ref())
                .await
            {
                return Decision::deny(e.to_string());
            }
        }

        Decision::allow()
    }
}
