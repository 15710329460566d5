// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Handling of `admission.k8s.io/v1` AdmissionReview calls.

use std::str::FromStr;

use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::response::StatusSummary;
use log::{error, info};

use super::workload::{Workload, WorkloadKind};
use super::{Admitter, Decision};
use crate::Error;

/// Result of handling one webhook call.
#[derive(Debug)]
pub enum ReviewOutcome {
    /// The request was reviewed. Answered with 200.
    Reviewed(AdmissionReview<DynamicObject>),
    /// The body is not a usable AdmissionReview. Answered with 400.
    BadRequest(AdmissionResponse),
    /// The object could not be decoded as its declared kind. Answered
    /// with 500.
    HandlerFailed(String),
}

fn bad_request(message: String) -> ReviewOutcome {
    error!("{message}");
    ReviewOutcome::BadRequest(AdmissionResponse::invalid(message))
}

/// Answer `request` with `decision`, status and message included on both
/// outcomes.
fn respond(request: &AdmissionRequest<DynamicObject>, decision: Decision) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    if decision.allowed {
        response.result.status = Some(StatusSummary::Success);
        response.result.message = decision.message;
    } else {
        response = response.deny(decision.message);
        response.result.status = Some(StatusSummary::Failure);
    }
    response
}

fn decode(kind: WorkloadKind, object: Option<&DynamicObject>) -> crate::Result<Workload> {
    let Some(object) = object else {
        return Err(Error::MissingObject(kind.to_string()));
    };
    let value = serde_json::to_value(object).map_err(|source| Error::Decode {
        kind: kind.to_string(),
        source,
    })?;
    Workload::from_value(kind, value)
}

impl Admitter {
    /// Handle the body of an admission webhook call.
    pub async fn handle_review(&self, body: &[u8]) -> ReviewOutcome {
        let review: AdmissionReview<DynamicObject> = match serde_json::from_slice(body) {
            Ok(review) => review,
            Err(e) => return bad_request(format!("failed to unmarshal: {e}")),
        };
        let request: AdmissionRequest<DynamicObject> = match review.try_into() {
            Ok(request) => request,
            Err(_) => return bad_request("admission request is empty".to_string()),
        };

        let decision = match WorkloadKind::from_str(&request.kind.kind) {
            Ok(kind) => {
                let mut workload = match decode(kind, request.object.as_ref()) {
                    Ok(workload) => workload,
                    Err(e) => {
                        error!("{e}");
                        return ReviewOutcome::HandlerFailed(e.to_string());
                    }
                };
                workload.default_namespace(request.namespace.as_deref().unwrap_or_default());
                info!("reviewing {}", workload.reference());
                self.decide(&workload).await
            }
            Err(_) => {
                info!(
                    "kind {} is not reviewed, admitting {}",
                    request.kind.kind, request.name
                );
                Decision::allow()
            }
        };

        ReviewOutcome::Reviewed(respond(&request, decision).into_review())
    }
}
