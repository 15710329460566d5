// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use async_trait::async_trait;
use signature::SigningSecret;

use crate::Result;

/// Data key of the armored public key in a signing secret.
pub const PUBLIC_KEY_DATA_KEY: &str = "public";

/// Data key of the armored private key in a signing secret.
pub const PRIVATE_KEY_DATA_KEY: &str = "private";

/// Resolves the name of a signing secret in a namespace to its key pair.
#[async_trait]
pub trait SecretFetcher: Send + Sync {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SigningSecret>;
}
