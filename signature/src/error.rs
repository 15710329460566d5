// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid image reference `{reference}`: {reason}")]
    InvalidReference {
        reference: String,
        reason: &'static str,
    },

    #[error("{0} is not a fully qualified image")]
    NotFullyQualified(String),

    #[error("serialize signature payload failed")]
    Payload(#[from] serde_json::Error),

    #[error("no usable signing key in secret {0}")]
    NoSigningKey(String),

    #[error("signature verify failed: {0}")]
    Verification(String),

    #[error("openpgp error: {0:#}")]
    OpenPgp(#[from] anyhow::Error),

    #[error("armored output is not valid UTF-8")]
    Armor(#[from] std::string::FromUtf8Error),
}
