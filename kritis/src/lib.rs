// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Overall
//! Kritis decides at admission time whether the container images of a
//! workload may run in a namespace.
//!
//! The decision pipeline lives in [`admission`]. It hands images to a
//! [`review::Review`] implementation which evaluates Image Security Policies
//! and Generic Attestation Policies, and which verifies and issues
//! attestations through a metadata backend.
//!
//! Every collaborator that talks to the outside world (the cluster API, the
//! metadata backend, the secret store) sits behind a trait, and the
//! Kubernetes-backed implementations are in [`cluster`].

pub mod admission;
pub mod allowlist;
pub mod cluster;
pub mod config;
pub mod crd;

pub mod error;
pub use error::*;

pub mod policy;
pub mod review;
pub mod secrets;
pub mod violation;
