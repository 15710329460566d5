// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Overall
//! Signing and verification of image attestations.
//!
//! # Interfaces
//! #### ImageReference
//! A parsed container image reference. Attestations can only be made over
//! references pinned to a digest ("fully qualified").
//!
//! #### AtomicContainerSig
//! The canonical "atomic container signature" payload that an attestation
//! signature covers.
//!
//! #### SigningSecret
//! An OpenPGP key pair belonging to one attestation authority.

pub mod error;
pub use error::*;

pub mod image;
pub use image::{Digest, ImageReference};

pub mod mechanism;
pub use mechanism::simple::{sign_detached, verify_detached, SigningSecret};

pub mod payload;
pub use payload::AtomicContainerSig;
