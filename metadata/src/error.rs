// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported metadata backend: {0}")]
    UnsupportedBackend(String),

    #[error("Invalid metadata client config: {0}")]
    InvalidConfig(String),

    #[error("read {path} failed")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to metadata backend failed")]
    Http(#[from] reqwest::Error),

    #[error("metadata backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("image {0} is not hosted in Container Registry or Artifact Registry")]
    UnsupportedImage(String),

    #[error("get access token failed: {0}")]
    Token(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid note reference {0}, expected projects/<project>/notes/<note>")]
    InvalidNoteReference(String),

    #[error("unknown severity {0}")]
    InvalidSeverity(String),

    #[error("sign attestation failed")]
    Signature(#[from] signature::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
