// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A content digest of the form `<algorithm>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    pub algorithm: String,
    pub value: String,
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

impl FromStr for Digest {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (algorithm, value) = s.split_once(':').ok_or("digest has no algorithm")?;
        if algorithm.is_empty()
            || !algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
        {
            return Err("invalid digest algorithm");
        }
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("digest value must be hexadecimal");
        }
        Ok(Self {
            algorithm: algorithm.to_string(),
            value: value.to_string(),
        })
    }
}

/// A container image reference: `[registry/]repository[:tag][@digest]`.
///
/// No normalisation is applied. `nginx` stays `nginx` and is not expanded
/// to a Docker Hub name, so the textual identity of the reference is the
/// one attested and compared against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<Digest>,
}

impl ImageReference {
    /// `registry/repository`, without tag or digest.
    pub fn name(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{registry}/{}", self.repository),
            None => self.repository.clone(),
        }
    }

    /// A reference is fully qualified when it is pinned to a digest.
    pub fn is_fully_qualified(&self) -> bool {
        self.digest.is_some()
    }

    /// Parse `image` and require it to be pinned to a digest.
    pub fn parse_fully_qualified(image: &str) -> Result<Self> {
        let reference = image.parse::<Self>()?;
        if !reference.is_fully_qualified() {
            return Err(Error::NotFullyQualified(image.to_string()));
        }
        Ok(reference)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

fn is_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn valid_path_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
}

fn valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= 128
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-".contains(c))
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidReference {
            reference: s.to_string(),
            reason,
        };

        if s.is_empty() {
            return Err(invalid("empty reference"));
        }

        let (rest, digest) = match s.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest.parse::<Digest>().map_err(invalid)?)),
            None => (s, None),
        };

        // A ':' after the last '/' separates the tag; one before it belongs
        // to a registry port.
        let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match rest[last_slash..].find(':') {
            Some(i) => {
                let split = last_slash + i;
                (&rest[..split], Some(&rest[split + 1..]))
            }
            None => (rest, None),
        };

        if let Some(tag) = tag {
            if !valid_tag(tag) {
                return Err(invalid("invalid tag"));
            }
        }

        let mut components: Vec<&str> = name.split('/').collect();
        let registry = if components.len() > 1 && is_registry(components[0]) {
            Some(components.remove(0).to_string())
        } else {
            None
        };

        if !components.iter().all(|c| valid_path_component(c)) {
            return Err(invalid("invalid repository name"));
        }

        Ok(Self {
            registry,
            repository: components.join("/"),
            tag: tag.map(str::to_string),
            digest,
        })
    }
}
