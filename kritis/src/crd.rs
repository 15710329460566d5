// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Custom resources of the `kritis.grafeas.io/v1beta1` API group.

use base64::{engine::general_purpose::STANDARD, Engine};
use kube::CustomResource;
use metadata::AuthorityNote;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_MAXIMUM_SEVERITY: &str = "CRITICAL";
pub const DEFAULT_MAXIMUM_FIX_UNAVAILABLE_SEVERITY: &str = "ALLOW_ALL";

fn default_maximum_severity() -> String {
    DEFAULT_MAXIMUM_SEVERITY.to_string()
}

fn default_maximum_fix_unavailable_severity() -> String {
    DEFAULT_MAXIMUM_FIX_UNAVAILABLE_SEVERITY.to_string()
}

/// Vulnerability thresholds an image must satisfy to be admitted in the
/// namespace of the policy.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kritis.grafeas.io",
    version = "v1beta1",
    kind = "ImageSecurityPolicy",
    namespaced,
    shortname = "isp"
)]
#[serde(rename_all = "camelCase")]
pub struct ImageSecurityPolicySpec {
    /// Images exempt from this policy, matched exactly.
    #[serde(default)]
    pub image_allowlist: Vec<String>,

    #[serde(default)]
    pub package_vulnerability_requirements: PackageVulnerabilityRequirements,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageVulnerabilityRequirements {
    /// Highest severity tolerated for vulnerabilities that have a fix.
    /// A severity name, `BLOCK_ALL` or `ALLOW_ALL`.
    #[serde(default = "default_maximum_severity")]
    pub maximum_severity: String,

    /// Highest severity tolerated for vulnerabilities without a fix.
    #[serde(default = "default_maximum_fix_unavailable_severity")]
    pub maximum_fix_unavailable_severity: String,

    /// CVEs ignored by this policy, either the full note name or the bare id.
    #[serde(default, rename = "allowlistCVEs")]
    pub allowlist_cves: Vec<String>,
}

impl Default for PackageVulnerabilityRequirements {
    fn default() -> Self {
        Self {
            maximum_severity: default_maximum_severity(),
            maximum_fix_unavailable_severity: default_maximum_fix_unavailable_severity(),
            allowlist_cves: Vec::new(),
        }
    }
}

/// Requires an image to carry an attestation by one of the named
/// authorities.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kritis.grafeas.io",
    version = "v1beta1",
    kind = "GenericAttestationPolicy",
    namespaced,
    shortname = "gap"
)]
#[serde(rename_all = "camelCase")]
pub struct GenericAttestationPolicySpec {
    #[serde(default)]
    pub attestation_authority_names: Vec<String>,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kritis.grafeas.io",
    version = "v1beta1",
    kind = "AttestationAuthority",
    namespaced,
    shortname = "aa"
)]
#[serde(rename_all = "camelCase")]
pub struct AttestationAuthoritySpec {
    /// `projects/<project>/notes/<note>`
    pub note_reference: String,

    /// Secret holding the key pair. Doubles as the key id of attestations.
    pub private_key_secret_name: String,

    /// Base64 of the armored public key.
    #[serde(default)]
    pub public_key_data: String,
}

impl AttestationAuthority {
    pub fn authority_name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    pub fn authority_note(&self) -> AuthorityNote {
        AuthorityNote {
            name: self.authority_name(),
            note_reference: self.spec.note_reference.clone(),
        }
    }

    /// The armored public key carried inline by the authority.
    pub fn public_key(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.spec.public_key_data.trim())
            .map_err(|e| Error::InvalidPublicKey {
                authority: self.authority_name(),
                reason: e.to_string(),
            })
    }
}

/// Cluster-wide override of the server configuration. At most one may exist.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(group = "kritis.grafeas.io", version = "v1beta1", kind = "KritisConfig")]
#[serde(rename_all = "camelCase")]
pub struct KritisConfigSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_backend: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafeas: Option<GrafeasSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct GrafeasSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}
