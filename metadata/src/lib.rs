// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

pub mod api;
pub use api::*;

pub mod error;
pub use error::*;

pub mod plugins;
pub use plugins::{new_client, new_read_only_client, MetadataBackend, MetadataConfig};
