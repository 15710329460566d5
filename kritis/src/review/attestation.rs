// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Verification and issuance of image attestations.

use log::{debug, info, warn};
use metadata::{AuthorityNote, Note, PgpAttestation, ReadWriteClient};
use signature::{verify_detached, AtomicContainerSig};

use crate::crd::AttestationAuthority;
use crate::secrets::SecretFetcher;
use crate::{Error, Result};

fn payload(image: &str) -> Option<Vec<u8>> {
    match AtomicContainerSig::new(image).and_then(|sig| sig.to_bytes()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            info!("no attestation payload for {image}: {e}");
            None
        }
    }
}

/// Whether any attestation of `image` verifies against the signing secret
/// named by its key id in `namespace`.
pub async fn verify(
    secrets: &dyn SecretFetcher,
    image: &str,
    namespace: &str,
    attestations: &[PgpAttestation],
) -> bool {
    if attestations.is_empty() {
        info!(
            "No attestations found for {image}. This normally happens when a workload is \
             deployed before kritis or before any attestation authority exists."
        );
        return false;
    }
    let Some(payload) = payload(image) else {
        return false;
    };

    for attestation in attestations {
        let secret = match secrets.fetch(namespace, &attestation.key_id).await {
            Ok(secret) => secret,
            Err(e) => {
                debug!(
                    "Could not find secret {} in namespace {namespace} for attestation verification: {e}",
                    attestation.key_id
                );
                continue;
            }
        };

        match verify_detached(&secret.public_key, attestation.signature.as_bytes(), &payload) {
            Ok(()) => return true,
            Err(e) => debug!(
                "attestation by {} does not verify for {image}: {e}",
                attestation.key_id
            ),
        }
    }
    false
}

/// Whether any attestation of `image` verifies against the inline public
/// key of an authority whose secret name equals the attestation key id.
pub fn verify_with_authorities(
    image: &str,
    attestations: &[PgpAttestation],
    authorities: &[&AttestationAuthority],
) -> bool {
    let Some(payload) = payload(image) else {
        return false;
    };

    for attestation in attestations {
        for authority in authorities
            .iter()
            .filter(|a| a.spec.private_key_secret_name == attestation.key_id)
        {
            let public_key = match authority.public_key() {
                Ok(key) => key,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            match verify_detached(&public_key, attestation.signature.as_bytes(), &payload) {
                Ok(()) => return true,
                Err(e) => debug!(
                    "attestation {} does not verify against authority {}: {e}",
                    attestation.key_id,
                    authority.authority_name()
                ),
            }
        }
    }
    false
}

/// Authorities whose key id appears on none of `attestations`. Validity of
/// the existing signatures is not considered.
pub fn unattested<'a>(
    authorities: &'a [AttestationAuthority],
    attestations: &[PgpAttestation],
) -> Vec<&'a AttestationAuthority> {
    authorities
        .iter()
        .filter(|a| {
            !attestations
                .iter()
                .any(|att| att.key_id == a.spec.private_key_secret_name)
        })
        .collect()
}

/// Fetch the note of `authority`, creating it when the backend reports it
/// missing.
///
/// The read and the write are not atomic. Two concurrent reviews may both
/// see the note missing and both try to create it.
pub async fn get_or_create_note(
    client: &dyn ReadWriteClient,
    authority: &AuthorityNote,
) -> metadata::Result<Note> {
    match client.get_attestation_note(authority).await {
        Ok(note) => Ok(note),
        Err(e) if e.is_not_found() => {
            info!("creating note {}", authority.note_reference);
            client.create_attestation_note(authority).await
        }
        Err(e) => Err(e),
    }
}

async fn attest(
    client: &dyn ReadWriteClient,
    secrets: &dyn SecretFetcher,
    authority: &AttestationAuthority,
    image: &str,
    namespace: &str,
) -> Result<()> {
    let note = get_or_create_note(client, &authority.authority_note()).await?;
    let secret = secrets
        .fetch(namespace, &authority.spec.private_key_secret_name)
        .await?;
    client
        .create_attestation_occurrence(&note, image, &secret)
        .await?;
    Ok(())
}

/// Attest `image` on behalf of every authority in `authorities` that has
/// not attested it yet. Failures do not stop the other authorities and are
/// reported together.
pub async fn create_missing(
    client: &dyn ReadWriteClient,
    secrets: &dyn SecretFetcher,
    authorities: &[AttestationAuthority],
    image: &str,
    namespace: &str,
    attestations: &[PgpAttestation],
) -> Result<()> {
    let missing = unattested(authorities, attestations);
    if missing.is_empty() {
        info!("Attestation exists for all authorities");
        return Ok(());
    }

    let mut errors = Vec::new();
    for authority in missing {
        match attest(client, secrets, authority, image, namespace).await {
            Ok(()) => info!(
                "attested {image} for authority {}",
                authority.authority_name()
            ),
            Err(e) => errors.push(format!("{}: {e}", authority.authority_name())),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::AddAttestations(errors))
    }
}
