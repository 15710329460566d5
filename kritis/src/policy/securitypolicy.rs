// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::str::FromStr;

use log::debug;
use metadata::{ReadOnlyClient, Severity, Vulnerability};
use signature::ImageReference;

use super::{Violation, ViolationKind};
use crate::crd::ImageSecurityPolicy;
use crate::{Error, Result};

pub const BLOCK_ALL: &str = "BLOCK_ALL";
pub const ALLOW_ALL: &str = "ALLOW_ALL";

/// The most severe finding a policy tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityThreshold {
    AllowAll,
    BlockAll,
    Maximum(Severity),
}

impl FromStr for SeverityThreshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case(ALLOW_ALL) {
            return Ok(Self::AllowAll);
        }
        if s.eq_ignore_ascii_case(BLOCK_ALL) {
            return Ok(Self::BlockAll);
        }
        Severity::from_str(s)
            .map(Self::Maximum)
            .map_err(|_| Error::InvalidThreshold(s.to_string()))
    }
}

impl SeverityThreshold {
    pub fn exceeded_by(&self, severity: Severity) -> bool {
        match self {
            Self::AllowAll => false,
            Self::BlockAll => true,
            Self::Maximum(max) => severity > *max,
        }
    }
}

fn cve_allowlisted(isp: &ImageSecurityPolicy, vulnerability: &Vulnerability) -> bool {
    isp.spec
        .package_vulnerability_requirements
        .allowlist_cves
        .iter()
        .any(|cve| *cve == vulnerability.cve || cve == vulnerability.cve_id())
}

/// Evaluate `image` against the vulnerability thresholds of `isp`.
pub async fn validate_image_security_policy<C: ReadOnlyClient + ?Sized>(
    isp: &ImageSecurityPolicy,
    image: &str,
    client: &C,
) -> Result<Vec<Violation>> {
    if isp.spec.image_allowlist.iter().any(|i| i == image) {
        debug!("{image} is allowlisted by the image security policy");
        return Ok(Vec::new());
    }

    let qualified = image
        .parse::<ImageReference>()
        .map(|r| r.is_fully_qualified())
        .unwrap_or(false);
    if !qualified {
        return Ok(vec![Violation::unqualified(image)]);
    }

    let requirements = &isp.spec.package_vulnerability_requirements;
    let max_severity = SeverityThreshold::from_str(&requirements.maximum_severity)?;
    let max_fix_unavailable =
        SeverityThreshold::from_str(&requirements.maximum_fix_unavailable_severity)?;

    let mut violations = Vec::new();
    for vulnerability in client.vulnerabilities(image).await? {
        if cve_allowlisted(isp, &vulnerability) {
            continue;
        }

        if !vulnerability.has_fix_available {
            if max_fix_unavailable.exceeded_by(vulnerability.severity) {
                violations.push(Violation {
                    kind: ViolationKind::FixUnavailable,
                    image: image.to_string(),
                    reason: format!(
                        "found unfixable CVE {} in {image}, which has severity {} exceeding max unfixable severity {}",
                        vulnerability.cve,
                        vulnerability.severity,
                        requirements.maximum_fix_unavailable_severity
                    ),
                });
            }
            continue;
        }

        if max_severity.exceeded_by(vulnerability.severity) {
            violations.push(Violation {
                kind: ViolationKind::Severity,
                image: image.to_string(),
                reason: format!(
                    "found CVE {} in {image} which has fixes available, with severity {} exceeding max severity {}",
                    vulnerability.cve, vulnerability.severity, requirements.maximum_severity
                ),
            });
        }
    }

    Ok(violations)
}
