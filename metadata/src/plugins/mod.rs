// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{Error, ReadOnlyClient, ReadWriteClient, Result};

pub mod containeranalysis;
pub mod grafeas;

pub use containeranalysis::ContainerAnalysisConfig;
pub use grafeas::GrafeasConfig;

#[derive(AsRefStr, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataBackend {
    #[strum(ascii_case_insensitive)]
    Grafeas,

    #[strum(serialize = "containerAnalysis", ascii_case_insensitive)]
    ContainerAnalysis,
}

/// Settings to build a metadata client.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Name of the backend, `grafeas` or `containerAnalysis`.
    pub backend: String,

    #[serde(default)]
    pub grafeas: GrafeasConfig,

    #[serde(default)]
    pub container_analysis: ContainerAnalysisConfig,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: MetadataBackend::Grafeas.as_ref().to_lowercase(),
            grafeas: GrafeasConfig::default(),
            container_analysis: ContainerAnalysisConfig::default(),
        }
    }
}

impl MetadataConfig {
    pub fn backend(&self) -> Result<MetadataBackend> {
        MetadataBackend::try_from(self.backend.as_str())
            .map_err(|_| Error::UnsupportedBackend(self.backend.clone()))
    }
}

async fn grafeas_client(config: &MetadataConfig) -> Result<grafeas::GrafeasClient> {
    match config.backend()? {
        MetadataBackend::Grafeas => grafeas::GrafeasClient::from_config(&config.grafeas).await,
        MetadataBackend::ContainerAnalysis => {
            containeranalysis::client_from_config(&config.container_analysis)
        }
    }
}

/// Create a new [`ReadWriteClient`] for the backend named in `config`.
pub async fn new_client(config: &MetadataConfig) -> Result<Box<dyn ReadWriteClient>> {
    Ok(Box::new(grafeas_client(config).await?) as Box<dyn ReadWriteClient>)
}

/// Create a new [`ReadOnlyClient`] for the backend named in `config`.
pub async fn new_read_only_client(config: &MetadataConfig) -> Result<Box<dyn ReadOnlyClient>> {
    Ok(Box::new(grafeas_client(config).await?) as Box<dyn ReadOnlyClient>)
}
