// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Api definitions for metadata backends
//!
//! A metadata backend stores two kinds of facts about an image:
//! - vulnerability occurrences found by a scanner;
//! - PGP attestations made by attestation authorities.
//!
//! ## APIs
//! - `ReadOnlyClient`: query vulnerabilities, attestations and notes.
//! - `ReadWriteClient`: additionally create notes and attestation occurrences.
//!
//! The two levels are distinct so that a review that only needs to read
//! (generic attestation policies) never holds a client able to write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signature::SigningSecret;
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Severity of a vulnerability, ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    AsRefStr,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    #[strum(to_string = "SEVERITY_UNSPECIFIED", serialize = "UNSPECIFIED")]
    #[serde(rename = "SEVERITY_UNSPECIFIED", alias = "UNSPECIFIED")]
    Unspecified,
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

/// A vulnerability occurrence for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// Identity of the CVE, the full note name
    /// (e.g. `projects/goog-vulnz/notes/CVE-2017-1000082`).
    pub cve: String,
    pub severity: Severity,
    pub has_fix_available: bool,
}

impl Vulnerability {
    /// The bare CVE id, i.e. the last path segment of [`Vulnerability::cve`].
    pub fn cve_id(&self) -> &str {
        self.cve.rsplit('/').next().unwrap_or(&self.cve)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    #[default]
    #[strum(serialize = "CONTENT_TYPE_UNSPECIFIED")]
    #[serde(rename = "CONTENT_TYPE_UNSPECIFIED")]
    Unspecified,
    SimpleSigningJson,
}

/// A detached PGP signature attached to an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpAttestation {
    /// Identifier of the signing key. Kritis records the name of the
    /// authority's signing secret here.
    pub key_id: String,
    /// Armored detached signature.
    pub signature: String,
    pub content_type: ContentType,
}

/// What a backend needs to know about an attestation authority to manage
/// its note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityNote {
    /// Name of the authority, used as the human readable hint of the note.
    pub name: String,
    /// `projects/<project>/notes/<note>`
    pub note_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// `projects/<project>/notes/<note>`
    pub name: String,
    pub short_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub name: String,
    pub note_name: String,
    pub resource_uri: String,
}

#[async_trait]
pub trait ReadOnlyClient: Send + Sync {
    /// All vulnerability occurrences recorded for `image`.
    async fn vulnerabilities(&self, image: &str) -> Result<Vec<Vulnerability>>;

    /// All PGP attestations recorded for `image`.
    async fn attestations(&self, image: &str) -> Result<Vec<PgpAttestation>>;

    /// Fetch the note of an authority. Returns [`Error::NotFound`] when the
    /// note does not exist yet.
    async fn get_attestation_note(&self, authority: &AuthorityNote) -> Result<Note>;
}

#[async_trait]
pub trait ReadWriteClient: ReadOnlyClient {
    async fn create_attestation_note(&self, authority: &AuthorityNote) -> Result<Note>;

    /// Sign the atomic container signature payload of `image` with `secret`
    /// and record it under `note`.
    async fn create_attestation_occurrence(
        &self,
        note: &Note,
        image: &str,
        secret: &SigningSecret,
    ) -> Result<Occurrence>;
}

/// Split `projects/<project>/notes/<note>` into `(project, note)`.
pub fn parse_note_reference(reference: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = reference.split('/').collect();
    match parts.as_slice() {
        ["projects", project, "notes", note] if !project.is_empty() && !note.is_empty() => {
            Ok((project.to_string(), note.to_string()))
        }
        _ => Err(Error::InvalidNoteReference(reference.to_string())),
    }
}
