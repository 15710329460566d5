// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fmt;

use anyhow::Context;
use log::debug;
use zeroize::Zeroizing;

use openpgp::armor;
use openpgp::cert::CertBuilder;
use openpgp::packet::signature::SignatureBuilder;
use openpgp::parse::Parse;
use openpgp::policy::StandardPolicy;
use openpgp::serialize::{Serialize, SerializeInto};
use openpgp::types::SignatureType;
use openpgp::{Cert, Packet, PacketPile};
use sequoia_openpgp as openpgp;

use crate::{AtomicContainerSig, Error, Result};

/// An OpenPGP key pair held by an attestation authority.
///
/// `name` is the name of the secret the pair was read from and doubles as
/// the key id recorded on attestations. Private material is wiped on drop.
#[derive(Clone)]
pub struct SigningSecret {
    pub name: String,
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("name", &self.name)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl SigningSecret {
    pub fn new(name: impl Into<String>, public_key: Vec<u8>, private_key: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            public_key,
            private_key: Zeroizing::new(private_key),
        }
    }

    /// Generate a fresh signing key pair with a single signing subkey.
    pub fn generate(name: &str) -> Result<Self> {
        let (cert, _revocation) = CertBuilder::new()
            .add_userid(format!("{name} <{name}@kritis.grafeas.io>"))
            .add_signing_subkey()
            .generate()?;

        let public_key = cert.armored().to_vec()?;
        let private_key = cert.as_tsk().armored().to_vec()?;
        Ok(Self::new(name, public_key, private_key))
    }

    /// Sign the canonical payload of `image` and return the armored
    /// detached signature.
    pub fn sign_image(&self, image: &str) -> Result<String> {
        let payload = AtomicContainerSig::new(image)?.to_bytes()?;
        sign_detached(&self.private_key, &payload).map_err(|e| match e {
            Error::NoSigningKey(_) => Error::NoSigningKey(self.name.clone()),
            other => other,
        })
    }

    /// Verify an armored detached signature over the canonical payload of
    /// `image` against this secret's public key.
    pub fn verify_image(&self, image: &str, signature: &[u8]) -> Result<()> {
        let payload = AtomicContainerSig::new(image)?.to_bytes()?;
        verify_detached(&self.public_key, signature, &payload)
    }
}

/// Produce an armored, detached, binary-mode signature over `payload` with
/// the first valid signing-capable secret key in `private_key`.
pub fn sign_detached(private_key: &[u8], payload: &[u8]) -> Result<String> {
    let cert = Cert::from_bytes(private_key).context("parse private key")?;
    let policy = StandardPolicy::new();

    let mut keypair = cert
        .keys()
        .unencrypted_secret()
        .with_policy(&policy, None)
        .supported()
        .revoked(false)
        .for_signing()
        .next()
        .ok_or_else(|| Error::NoSigningKey(cert.fingerprint().to_hex()))?
        .key()
        .clone()
        .into_keypair()?;

    let signature = SignatureBuilder::new(SignatureType::Binary)
        .sign_message(&mut keypair, payload)?;

    let armored = armor_signature(Packet::from(signature))?;
    Ok(String::from_utf8(armored)?)
}

fn armor_signature(packet: Packet) -> anyhow::Result<Vec<u8>> {
    let mut writer = armor::Writer::new(Vec::new(), armor::Kind::Signature)?;
    packet.serialize(&mut writer)?;
    Ok(writer.finalize()?)
}

/// Verify a detached signature (armored or binary) over `payload`. Succeeds
/// if any signature packet verifies against any signing-capable key of the
/// certificate in `public_key`.
pub fn verify_detached(public_key: &[u8], signature: &[u8], payload: &[u8]) -> Result<()> {
    let cert = Cert::from_bytes(public_key).context("parse public key")?;
    let pile = PacketPile::from_bytes(signature).context("parse signature")?;
    let policy = StandardPolicy::new();

    for packet in pile.descendants() {
        let Packet::Signature(sig) = packet else {
            continue;
        };

        for ka in cert.keys().with_policy(&policy, None).for_signing() {
            let mut sig = sig.clone();
            match sig.verify_message(ka.key(), payload) {
                Ok(()) => return Ok(()),
                Err(e) => debug!("key {} rejected signature: {e}", ka.key().fingerprint()),
            }
        }
    }

    Err(Error::Verification(format!(
        "no key of {} verifies the signature",
        cert.fingerprint()
    )))
}
