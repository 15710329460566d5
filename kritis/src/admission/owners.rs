// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use log::{debug, info};
use signature::ImageReference;

use super::workload::Workload;
use crate::allowlist::GlobalAllowlist;
use crate::Result;

/// Looks up the live owner of a workload.
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    /// Images declared by `owner` in `namespace`. Owners of a kind other
    /// than Pod, Deployment or ReplicaSet give [`crate::Error::UnsupportedKind`].
    async fn owner_images(&self, namespace: &str, owner: &OwnerReference) -> Result<Vec<String>>;
}

fn fully_qualified(image: &str) -> bool {
    image
        .parse::<ImageReference>()
        .map(|r| r.is_fully_qualified())
        .unwrap_or(false)
}

/// Whether the owners of `workload` already vouch for its images: every
/// image that is not globally allowlisted is pinned to a digest and declared
/// verbatim by every owner.
///
/// A workload without owners never passes. Any lookup failure means the
/// check does not pass either, so the workload is reviewed normally.
pub async fn check_owners(
    resolver: &dyn OwnerResolver,
    allowlist: &GlobalAllowlist,
    workload: &Workload,
) -> bool {
    let owners = workload.owner_references();
    if owners.is_empty() {
        return false;
    }

    let images = allowlist.remove_allowlisted(&workload.images());
    if !images.iter().all(|image| fully_qualified(image)) {
        debug!("{}: not every image is fully qualified", workload.reference());
        return false;
    }

    for owner in owners {
        let owner_images = match resolver.owner_images(workload.namespace(), owner).await {
            Ok(images) => images,
            Err(e) => {
                info!(
                    "{}: could not check owner {} {}: {e}",
                    workload.reference(),
                    owner.kind,
                    owner.name
                );
                return false;
            }
        };

        if !images.iter().all(|image| owner_images.contains(image)) {
            debug!(
                "{}: images differ from owner {} {}",
                workload.reference(),
                owner.kind,
                owner.name
            );
            return false;
        }
    }

    info!(
        "{}: all images already validated through owners",
        workload.reference()
    );
    true
}
