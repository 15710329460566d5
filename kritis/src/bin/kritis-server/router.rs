// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::sync::Arc;

use anyhow::Result;
use hyper::{header, Body, Method, Request, Response, StatusCode};
use kritis::admission::webhook::ReviewOutcome;
use kritis::admission::Admitter;
use log::debug;

pub const REVIEW_PATH: &str = "/";
pub const HEALTHZ_PATH: &str = "/healthz";

pub const HANDLER_FAILED: &str = "Whoops! The handler failed!";

pub struct Router {
    admitter: Arc<Admitter>,
}

impl Router {
    pub fn new(admitter: Arc<Admitter>) -> Self {
        Self { admitter }
    }

    /// Build json response.
    fn json_response(&self, status: StatusCode, json: String) -> Result<Response<Body>> {
        Ok(Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json))?)
    }

    /// Build 200 OK response.
    fn ok(&self) -> Result<Response<Body>> {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Body::from("ok"))?)
    }

    /// Build 404 Not Found response.
    fn not_found(&self) -> Result<Response<Body>> {
        Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("URL NOT FOUND"))?)
    }

    /// Build 405 Method Not Allowed response.
    fn not_allowed(&self) -> Result<Response<Body>> {
        Ok(Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .body(Body::from("Method Not Allowed"))?)
    }

    /// Build 500 Internal Server Error response.
    fn internal_error(&self, body: String) -> Result<Response<Body>> {
        Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(body))?)
    }

    async fn review(&self, req: Request<Body>) -> Result<Response<Body>> {
        let body = hyper::body::to_bytes(req.into_body()).await?;
        match self.admitter.handle_review(&body).await {
            ReviewOutcome::Reviewed(review) => {
                self.json_response(StatusCode::OK, serde_json::to_string(&review)?)
            }
            ReviewOutcome::BadRequest(response) => {
                self.json_response(StatusCode::BAD_REQUEST, serde_json::to_string(&response)?)
            }
            ReviewOutcome::HandlerFailed(e) => {
                debug!("review handler failed: {e}");
                self.internal_error(HANDLER_FAILED.to_string())
            }
        }
    }

    pub async fn route(&self, req: Request<Body>) -> Result<Response<Body>> {
        match (req.method(), req.uri().path()) {
            (&Method::POST, REVIEW_PATH) => self.review(req).await,
            (&Method::GET, HEALTHZ_PATH) => self.ok(),
            (_, REVIEW_PATH) | (_, HEALTHZ_PATH) => self.not_allowed(),
            _ => self.not_found(),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use kritis::admission::owners::OwnerResolver;
    use kritis::admission::workload::WorkloadRef;
    use kritis::admission::{AdmissionConfig, MetadataClientFactory};
    use kritis::crd::{AttestationAuthority, GenericAttestationPolicy, ImageSecurityPolicy};
    use kritis::policy::PolicySource;
    use kritis::review::Review;
    use metadata::{ReadOnlyClient, ReadWriteClient};
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    struct Nothing;

    #[async_trait]
    impl PolicySource for Nothing {
        async fn image_security_policies(
            &self,
            _: &str,
        ) -> kritis::Result<Vec<ImageSecurityPolicy>> {
            Ok(Vec::new())
        }
        async fn generic_attestation_policies(
            &self,
            _: &str,
        ) -> kritis::Result<Vec<GenericAttestationPolicy>> {
            Ok(Vec::new())
        }
        async fn authorities(&self, _: &str) -> kritis::Result<Vec<AttestationAuthority>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl OwnerResolver for Nothing {
        async fn owner_images(&self, _: &str, _: &OwnerReference) -> kritis::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl MetadataClientFactory for Nothing {
        async fn read_only(&self) -> metadata::Result<Box<dyn ReadOnlyClient>> {
            Err(metadata::Error::UnsupportedBackend("none".into()))
        }
        async fn read_write(&self) -> metadata::Result<Box<dyn ReadWriteClient>> {
            Err(metadata::Error::UnsupportedBackend("none".into()))
        }
    }

    #[async_trait]
    impl Review for Nothing {
        async fn review_isp(
            &self,
            _: &[String],
            _: &[ImageSecurityPolicy],
            _: &WorkloadRef,
            _: &dyn ReadWriteClient,
        ) -> kritis::Result<()> {
            Ok(())
        }
        async fn review_gap(
            &self,
            _: &[String],
            _: &[GenericAttestationPolicy],
            _: &WorkloadRef,
            _: &dyn ReadOnlyClient,
        ) -> kritis::Result<()> {
            Ok(())
        }
    }

    fn router() -> Router {
        Router::new(Arc::new(Admitter::new(
            AdmissionConfig::default(),
            Arc::new(Nothing),
            Arc::new(Nothing),
            Arc::new(Nothing),
            Arc::new(Nothing),
        )))
    }

    fn request(method: Method, path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[rstest]
    #[case(Method::GET, "/healthz", "", StatusCode::OK)]
    #[case(Method::GET, "/", "", StatusCode::METHOD_NOT_ALLOWED)]
    #[case(Method::POST, "/healthz", "", StatusCode::METHOD_NOT_ALLOWED)]
    #[case(Method::POST, "/validate", "", StatusCode::NOT_FOUND)]
    #[case(Method::POST, "/", "not json", StatusCode::BAD_REQUEST)]
    #[case(Method::POST, "/", r#"{"apiVersion":"v1","kind":"AdmissionReview"}"#, StatusCode::BAD_REQUEST)]
    #[tokio::test]
    async fn routes(
        #[case] method: Method,
        #[case] path: &str,
        #[case] body: &str,
        #[case] status: StatusCode,
    ) {
        let response = router().route(request(method, path, body)).await.unwrap();
        assert_eq!(response.status(), status);
    }

    fn admission_review(kind: &str, object: serde_json::Value) -> String {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "abc",
                "kind": {"group": "apps", "version": "v1", "kind": kind},
                "resource": {"group": "apps", "version": "v1", "resource": "daemonsets"},
                "namespace": "default",
                "operation": "CREATE",
                "userInfo": {},
                "object": object
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn review_answers_json() {
        let body = admission_review("DaemonSet", json!({"metadata": {"name": "agent"}}));
        let response = router()
            .route(request(Method::POST, "/", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let review: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(review["response"]["uid"], "abc");
        assert_eq!(review["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn handler_failure_body() {
        let response = router()
            .route(request(
                Method::POST,
                "/",
                &admission_review("Pod", json!({"metadata": {"name": "web"}, "spec": 7})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(bytes, HANDLER_FAILED.as_bytes());
    }
}
