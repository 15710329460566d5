// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Payload format of an atomic container signature

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, ImageReference, Result};

pub const ATOMIC_CONTAINER_SIGNATURE_TYPE: &str = "atomic container signature";

// The format is defined in https://github.com/containers/image/blob/main/docs/containers-signature.5.md.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct AtomicContainerSig {
    pub critical: Critical,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Critical {
    pub identity: Identity,
    pub image: Image,
    pub r#type: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Identity {
    #[serde(rename = "docker-reference")]
    pub docker_reference: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Image {
    #[serde(rename = "docker-manifest-digest")]
    pub docker_manifest_digest: String,
}

impl AtomicContainerSig {
    /// Build the payload for `image`, which must be pinned to a digest.
    pub fn new(image: &str) -> Result<Self> {
        let reference = ImageReference::parse_fully_qualified(image)?;
        Self::from_reference(&reference)
    }

    pub fn from_reference(reference: &ImageReference) -> Result<Self> {
        let digest = reference
            .digest
            .as_ref()
            .ok_or_else(|| Error::NotFullyQualified(reference.to_string()))?;

        Ok(Self {
            critical: Critical {
                identity: Identity {
                    docker_reference: reference.name(),
                },
                image: Image {
                    docker_manifest_digest: digest.to_string(),
                },
                r#type: ATOMIC_CONTAINER_SIGNATURE_TYPE.to_string(),
            },
            optional: BTreeMap::new(),
        })
    }

    /// Canonical bytes covered by an attestation signature. Field order is
    /// fixed by the struct layout so the output is stable for an image.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn docker_reference(&self) -> &str {
        &self.critical.identity.docker_reference
    }

    pub fn manifest_digest(&self) -> &str {
        &self.critical.image.docker_manifest_digest
    }
}
