// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Grafeas v1beta1 REST resources, reduced to the fields Kritis reads or
//! writes.

use serde::{Deserialize, Serialize};

pub const KIND_VULNERABILITY: &str = "VULNERABILITY";
pub const KIND_ATTESTATION: &str = "ATTESTATION";

/// Version kind marking that no fixed version exists.
pub const VERSION_KIND_MAXIMUM: &str = "MAXIMUM";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListOccurrencesResponse {
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub resource: Resource,
    #[serde(default)]
    pub note_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<VulnerabilityDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationDetails>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Resource {
    #[serde(default)]
    pub uri: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub package_issue: Vec<PackageIssue>,
}

impl VulnerabilityDetails {
    /// A fix is unavailable when any package issue is only fixed in the
    /// `MAXIMUM` version, i.e. never.
    pub fn fix_available(&self) -> bool {
        !self.package_issue.iter().any(|issue| {
            issue
                .fixed_location
                .as_ref()
                .and_then(|location| location.version.as_ref())
                .and_then(|version| version.kind.as_deref())
                == Some(VERSION_KIND_MAXIMUM)
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_location: Option<VulnerabilityLocation>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct VulnerabilityLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Version {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct AttestationDetails {
    #[serde(default)]
    pub attestation: Attestation,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgp_signed_attestation: Option<PgpSignedAttestation>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PgpSignedAttestation {
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub pgp_key_id: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation_authority: Option<Authority>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Authority {
    #[serde(default)]
    pub hint: Hint,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    #[serde(default)]
    pub human_readable_name: String,
}
