// Copyright (c) 2026 The Kritis Authors
//
// SPDX-License-Identifier: Apache-2.0
//

pub mod simple_signing;
pub use simple_signing::AtomicContainerSig;
