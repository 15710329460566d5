// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use async_trait::async_trait;
use strum::{AsRefStr, Display};

use crate::crd::{AttestationAuthority, GenericAttestationPolicy, ImageSecurityPolicy};
use crate::Result;

pub mod securitypolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
pub enum ViolationKind {
    /// The image is not pinned to a digest.
    UnqualifiedImage,
    /// A vulnerability with a fix exceeds the maximum severity.
    Severity,
    /// A vulnerability without a fix exceeds the maximum fix-unavailable
    /// severity.
    FixUnavailable,
    /// No trusted attestation was found.
    Attestation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub image: String,
    pub reason: String,
}

impl Violation {
    pub fn unqualified(image: &str) -> Self {
        Self {
            kind: ViolationKind::UnqualifiedImage,
            image: image.to_string(),
            reason: format!("{image} is not a fully qualified image"),
        }
    }
}

/// Where the policies and authorities of a namespace come from.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn image_security_policies(&self, namespace: &str) -> Result<Vec<ImageSecurityPolicy>>;

    async fn generic_attestation_policies(
        &self,
        namespace: &str,
    ) -> Result<Vec<GenericAttestationPolicy>>;

    async fn authorities(&self, namespace: &str) -> Result<Vec<AttestationAuthority>>;
}
