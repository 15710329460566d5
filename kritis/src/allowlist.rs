// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, warn};
use signature::ImageReference;

use crate::{Error, Result};

/// Images of the kritis deployment itself.
pub const DEFAULT_GLOBAL_ALLOWLIST: &[&str] = &["gcr.io/kritis-project/*"];

/// Images that are never reviewed, in any namespace.
///
/// An entry matches an image when it equals the full reference, equals the
/// reference without tag and digest, or is a glob matching either. A `*`
/// never crosses a `/`, so `gcr.io/*` does not cover `gcr.io/team/app`.
#[derive(Debug, Clone)]
pub struct GlobalAllowlist {
    exact: Vec<String>,
    globs: GlobSet,
}

impl Default for GlobalAllowlist {
    fn default() -> Self {
        Self::new(DEFAULT_GLOBAL_ALLOWLIST.iter().map(|s| s.to_string())).unwrap_or_else(|e| {
            warn!("{e}");
            Self {
                exact: Vec::new(),
                globs: GlobSet::empty(),
            }
        })
    }
}

impl GlobalAllowlist {
    /// Compile the allowlist entries. Entries with glob metacharacters are
    /// matched as patterns, the others verbatim.
    pub fn new(entries: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut exact = Vec::new();
        let mut builder = GlobSetBuilder::new();
        for entry in entries {
            if !entry.contains(['*', '?', '[', '{']) {
                exact.push(entry);
                continue;
            }
            let glob = GlobBuilder::new(&entry)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::InvalidAllowlistEntry {
                    entry: entry.clone(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|e| Error::InvalidAllowlistEntry {
            entry: "<set>".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { exact, globs })
    }

    pub fn contains(&self, image: &str) -> bool {
        let name = image
            .parse::<ImageReference>()
            .map(|r| r.name())
            .unwrap_or_else(|_| image.to_string());

        self.exact.iter().any(|entry| entry == image || *entry == name)
            || self.globs.is_match(image)
            || self.globs.is_match(&name)
    }

    /// `images` without the allowlisted ones, order preserved.
    pub fn remove_allowlisted(&self, images: &[String]) -> Vec<String> {
        images
            .iter()
            .filter(|image| {
                let allowed = self.contains(image);
                if allowed {
                    debug!("{image} is globally allowlisted");
                }
                !allowed
            })
            .cloned()
            .collect()
    }
}
