// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! What happens to a workload once violations are found.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::admission::workload::WorkloadRef;
use crate::policy::Violation;
use crate::Result;

#[async_trait]
pub trait ViolationStrategy: Send + Sync {
    async fn handle_violation(
        &self,
        image: &str,
        workload: &WorkloadRef,
        violations: &[Violation],
    ) -> Result<()>;

    async fn handle_attestation(
        &self,
        image: &str,
        workload: &WorkloadRef,
        attested: bool,
    ) -> Result<()>;
}

/// Removes a workload from the cluster.
#[async_trait]
pub trait WorkloadDeleter: Send + Sync {
    async fn delete(&self, workload: &WorkloadRef) -> Result<()>;
}

#[derive(
    AsRefStr, EnumString, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Logging,
    Enforcing,
}

/// Logs violations and leaves the workload alone.
#[derive(Debug, Default)]
pub struct LoggingStrategy;

fn log_violations(image: &str, workload: &WorkloadRef, violations: &[Violation]) {
    for v in violations {
        warn!("{workload}: image {image} violates policy ({}): {}", v.kind, v.reason);
    }
}

#[async_trait]
impl ViolationStrategy for LoggingStrategy {
    async fn handle_violation(
        &self,
        image: &str,
        workload: &WorkloadRef,
        violations: &[Violation],
    ) -> Result<()> {
        log_violations(image, workload, violations);
        Ok(())
    }

    async fn handle_attestation(
        &self,
        image: &str,
        workload: &WorkloadRef,
        attested: bool,
    ) -> Result<()> {
        if attested {
            info!("{workload}: image {image} has a valid attestation");
        } else {
            info!("{workload}: image {image} has no valid attestation");
        }
        Ok(())
    }
}

/// Logs violations, then deletes the offending workload.
pub struct EnforcingStrategy {
    deleter: Arc<dyn WorkloadDeleter>,
}

impl EnforcingStrategy {
    pub fn new(deleter: Arc<dyn WorkloadDeleter>) -> Self {
        Self { deleter }
    }
}

#[async_trait]
impl ViolationStrategy for EnforcingStrategy {
    async fn handle_violation(
        &self,
        image: &str,
        workload: &WorkloadRef,
        violations: &[Violation],
    ) -> Result<()> {
        log_violations(image, workload, violations);
        warn!("deleting {workload}");
        self.deleter.delete(workload).await
    }

    async fn handle_attestation(
        &self,
        image: &str,
        workload: &WorkloadRef,
        attested: bool,
    ) -> Result<()> {
        info!("{workload}: image {image} attested: {attested}");
        Ok(())
    }
}

/// Build the strategy selected at startup.
pub fn new_strategy(
    kind: StrategyKind,
    deleter: Arc<dyn WorkloadDeleter>,
) -> Arc<dyn ViolationStrategy> {
    match kind {
        StrategyKind::Logging => Arc::new(LoggingStrategy),
        StrategyKind::Enforcing => Arc::new(EnforcingStrategy::new(deleter)),
    }
}
