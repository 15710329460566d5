// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{env, path::Path};

use anyhow::*;
use config::{Config, File};
use log::{debug, info};
use metadata::MetadataConfig;
use serde::Deserialize;

use crate::admission::{AdmissionConfig, DEFAULT_BREAKGLASS_ANNOTATION};
use crate::allowlist::{GlobalAllowlist, DEFAULT_GLOBAL_ALLOWLIST};
use crate::crd::KritisConfigSpec;
use crate::violation::StrategyKind;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:443";

pub const CONFIG_PATH_ENV: &str = "KRITIS_CONFIG_PATH";

fn default_global_allowlist() -> Vec<String> {
    DEFAULT_GLOBAL_ALLOWLIST.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct KritisConfig {
    /// Address the webhook server listens on.
    pub server_addr: String,

    #[serde(default)]
    pub metadata: MetadataConfig,

    pub violation_strategy: StrategyKind,

    pub breakglass_annotation: String,

    #[serde(default = "default_global_allowlist")]
    pub global_allowlist: Vec<String>,
}

impl Default for KritisConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            metadata: MetadataConfig::default(),
            violation_strategy: StrategyKind::default(),
            breakglass_annotation: DEFAULT_BREAKGLASS_ANNOTATION.to_string(),
            global_allowlist: default_global_allowlist(),
        }
    }
}

impl KritisConfig {
    /// Load the config from `config_path`, then from the file named by
    /// `KRITIS_CONFIG_PATH`. Without either the built-in defaults are used.
    pub fn new(config_path: Option<String>) -> Result<Self> {
        let config_path = config_path.or_else(|| {
            if let std::result::Result::Ok(env_path) = env::var(CONFIG_PATH_ENV) {
                debug!("Read kritis config path from env: {env_path}");
                return Some(env_path);
            }
            None
        });

        match config_path {
            Some(path) => {
                info!("Use configuration file {path}");
                if !Path::new(&path).exists() {
                    bail!("Config file {path} not found.")
                }
                Self::from_file(&path)
            }
            None => {
                info!("No config path specified, use a default config.");
                Ok(Self::default())
            }
        }
    }

    /// Load `KritisConfig` from a configuration file. Supported formats are
    /// all formats supported by the `config` crate.
    fn from_file(config_path: &str) -> Result<Self> {
        let c = Config::builder()
            .set_default("server_addr", DEFAULT_SERVER_ADDR)?
            .set_default("violation_strategy", StrategyKind::default().as_ref())?
            .set_default("breakglass_annotation", DEFAULT_BREAKGLASS_ANNOTATION)?
            .add_source(File::with_name(config_path))
            .build()?;

        let res = c.try_deserialize().context("invalid config")?;
        Ok(res)
    }

    /// Apply the cluster-wide `KritisConfig` resource on top of the file.
    pub fn apply_override(&mut self, spec: &KritisConfigSpec) {
        if let Some(backend) = &spec.metadata_backend {
            self.metadata.backend = backend.clone();
        }
        if let Some(addr) = &spec.server_addr {
            self.server_addr = addr.clone();
        }
        if let Some(grafeas) = &spec.grafeas {
            if let Some(addr) = &grafeas.addr {
                self.metadata.grafeas.addr = addr.clone();
            }
            if let Some(project) = &grafeas.project {
                self.metadata.grafeas.project = project.clone();
            }
        }
    }

    pub fn admission_config(&self) -> Result<AdmissionConfig> {
        Ok(AdmissionConfig {
            breakglass_annotation: self.breakglass_annotation.clone(),
            allowlist: self.global_allowlist()?,
        })
    }

    pub fn global_allowlist(&self) -> Result<GlobalAllowlist> {
        GlobalAllowlist::new(self.global_allowlist.iter().cloned())
            .context("build global allowlist")
    }
}
