// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Review of images against the policies of a namespace.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use metadata::{PgpAttestation, ReadOnlyClient, ReadWriteClient};
use signature::ImageReference;

use crate::admission::workload::WorkloadRef;
use crate::allowlist::GlobalAllowlist;
use crate::crd::{GenericAttestationPolicy, ImageSecurityPolicy};
use crate::policy::securitypolicy::validate_image_security_policy;
use crate::policy::{PolicySource, Violation, ViolationKind};
use crate::secrets::SecretFetcher;
use crate::violation::ViolationStrategy;
use crate::{Error, Result};

pub mod attestation;

#[async_trait]
pub trait Review: Send + Sync {
    /// Review `images` against every Image Security Policy in `isps`.
    /// Returns [`Error::Denied`] on the first image with violations.
    async fn review_isp(
        &self,
        images: &[String],
        isps: &[ImageSecurityPolicy],
        workload: &WorkloadRef,
        client: &dyn ReadWriteClient,
    ) -> Result<()>;

    /// Review `images` against the Generic Attestation Policies in `gaps`.
    async fn review_gap(
        &self,
        images: &[String],
        gaps: &[GenericAttestationPolicy],
        workload: &WorkloadRef,
        client: &dyn ReadOnlyClient,
    ) -> Result<()>;
}

pub struct Reviewer {
    strategy: Arc<dyn ViolationStrategy>,
    secrets: Arc<dyn SecretFetcher>,
    policies: Arc<dyn PolicySource>,
    allowlist: GlobalAllowlist,
    is_webhook: bool,
}

impl Reviewer {
    pub fn new(
        strategy: Arc<dyn ViolationStrategy>,
        secrets: Arc<dyn SecretFetcher>,
        policies: Arc<dyn PolicySource>,
        allowlist: GlobalAllowlist,
        is_webhook: bool,
    ) -> Self {
        Self {
            strategy,
            secrets,
            policies,
            allowlist,
            is_webhook,
        }
    }

    fn images_to_review(&self, images: &[String]) -> Vec<String> {
        let images = self.allowlist.remove_allowlisted(images);
        if images.is_empty() {
            info!("images are all globally allowlisted, returning successful status");
        }
        images
    }

    /// Attestations on file for `image`, or `None` when they could not be
    /// listed.
    async fn fetch_attestations<C: ReadOnlyClient + ?Sized>(
        client: &C,
        image: &str,
    ) -> Option<Vec<PgpAttestation>> {
        match client.attestations(image).await {
            Ok(attestations) => Some(attestations),
            Err(e) => {
                warn!("Error while fetching attestations for {image}: {e}");
                None
            }
        }
    }

    /// Hand violations to the strategy and build the denial.
    async fn handle_violations(
        &self,
        image: &str,
        workload: &WorkloadRef,
        violations: &[Violation],
    ) -> Error {
        let mut message = if violations
            .iter()
            .any(|v| v.kind == ViolationKind::UnqualifiedImage)
        {
            format!("{image} is not a fully qualified image")
        } else if violations
            .iter()
            .all(|v| v.kind == ViolationKind::Attestation)
        {
            let reasons: Vec<&str> = violations.iter().map(|v| v.reason.as_str()).collect();
            reasons.join("; ")
        } else {
            let reasons: Vec<&str> = violations.iter().map(|v| v.reason.as_str()).collect();
            format!("found violations in {image}: {}", reasons.join("; "))
        };

        if let Err(e) = self
            .strategy
            .handle_violation(image, workload, violations)
            .await
        {
            message = format!("{message}. error handling violation {e}");
        }
        Error::Denied(message)
    }
}

#[async_trait]
impl Review for Reviewer {
    async fn review_isp(
        &self,
        images: &[String],
        isps: &[ImageSecurityPolicy],
        workload: &WorkloadRef,
        client: &dyn ReadWriteClient,
    ) -> Result<()> {
        let images = self.images_to_review(images);
        if images.is_empty() {
            return Ok(());
        }

        for isp in isps {
            let namespace = isp
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| workload.namespace.clone());

            for image in &images {
                info!("Check if {image} has valid attestations");
                let listed = Self::fetch_attestations(client, image).await;
                let attestations = listed.as_deref().unwrap_or_default();
                let attested =
                    attestation::verify(self.secrets.as_ref(), image, &namespace, attestations)
                        .await;
                if let Err(e) = self
                    .strategy
                    .handle_attestation(image, workload, attested)
                    .await
                {
                    warn!("error handling attestations: {e}");
                }

                if attested && self.is_webhook {
                    continue;
                }

                info!("Getting vulnerabilities for {image}");
                let violations = validate_image_security_policy(isp, image, client).await?;
                if !violations.is_empty() {
                    return Err(self.handle_violations(image, workload, &violations).await);
                }

                if self.is_webhook {
                    if listed.is_none() {
                        warn!("existing attestations of {image} are unknown, none are added");
                        continue;
                    }
                    let authorities = match self.policies.authorities(&namespace).await {
                        Ok(authorities) => authorities,
                        Err(e) => {
                            warn!("error listing attestation authorities in {namespace}: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = attestation::create_missing(
                        client,
                        self.secrets.as_ref(),
                        &authorities,
                        image,
                        &namespace,
                        attestations,
                    )
                    .await
                    {
                        warn!("{e}");
                    }
                }
            }
        }
        Ok(())
    }

    async fn review_gap(
        &self,
        images: &[String],
        gaps: &[GenericAttestationPolicy],
        workload: &WorkloadRef,
        client: &dyn ReadOnlyClient,
    ) -> Result<()> {
        let images = self.images_to_review(images);
        if images.is_empty() {
            return Ok(());
        }

        let authorities = self.policies.authorities(&workload.namespace).await?;

        for image in &images {
            let qualified = image
                .parse::<ImageReference>()
                .map(|r| r.is_fully_qualified())
                .unwrap_or(false);
            if !qualified {
                let violations = [Violation::unqualified(image)];
                return Err(self.handle_violations(image, workload, &violations).await);
            }

            let attestations = Self::fetch_attestations(client, image)
                .await
                .unwrap_or_default();

            let passed = gaps.iter().any(|gap| {
                let named: Vec<_> = gap
                    .spec
                    .attestation_authority_names
                    .iter()
                    .filter_map(|name| {
                        let found = authorities
                            .iter()
                            .find(|a| a.metadata.name.as_deref() == Some(name.as_str()));
                        if found.is_none() {
                            warn!(
                                "attestation authority {name} named by policy {} not found in {}",
                                gap.metadata.name.as_deref().unwrap_or_default(),
                                workload.namespace
                            );
                        }
                        found
                    })
                    .collect();
                attestation::verify_with_authorities(image, &attestations, &named)
            });

            if let Err(e) = self
                .strategy
                .handle_attestation(image, workload, passed)
                .await
            {
                warn!("error handling attestations: {e}");
            }

            if !passed {
                let violations = [Violation {
                    kind: ViolationKind::Attestation,
                    image: image.clone(),
                    reason: format!(
                        "no attestations found that are signed by GAP attestors for image {image}"
                    ),
                }];
                return Err(self.handle_violations(image, workload, &violations).await);
            }
        }
        Ok(())
    }
}
