// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The admission request must be rejected with this message.
    #[error("{0}")]
    Denied(String),

    #[error("metadata backend error: {0}")]
    Metadata(#[from] metadata::Error),

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("secret {namespace}/{name} is invalid: {reason}")]
    InvalidSecret {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("unsupported owner kind {0}")]
    UnsupportedKind(String),

    #[error("invalid global allowlist entry {entry}: {reason}")]
    InvalidAllowlistEntry { entry: String, reason: String },

    #[error("invalid severity threshold {0}")]
    InvalidThreshold(String),

    #[error("invalid public key data of attestation authority {authority}: {reason}")]
    InvalidPublicKey { authority: String, reason: String },

    #[error("decode {kind} failed: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("admission request for {0} has no object")]
    MissingObject(String),

    #[error("signature error: {0}")]
    Signature(#[from] signature::Error),

    #[error("one or more errors adding attestations: {0:?}")]
    AddAttestations(Vec<String>),

    #[error("found {0} KritisConfig resources, at most one is allowed")]
    MultipleKritisConfigs(usize),

    #[error("delete {workload} failed: {reason}")]
    DeleteWorkload { workload: String, reason: String },
}
