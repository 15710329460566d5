// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Signing mechanisms for attestations.
//!
//! Only detached OpenPGP ("simple signing") signatures are produced and
//! consumed, which is what the metadata backends store as PGP attestations.

pub mod simple;
