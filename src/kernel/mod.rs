// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Modeling kernel hosting.
//!
//! The kernel is a core WebAssembly module hosted by wasmtime. Two variants
//! exist: a fast `single` kernel and a diagnostic `withExceptions` kernel that
//! can describe failure codes. Each worker owns one [`KernelSessionManager`]
//! which lazily instantiates a variant on first use and memoizes it.
//!
//! # Kernel ABI
//!
//! Every kernel module must export:
//! * `memory` - linear memory
//! * `kernel_version() -> i32` - must equal [`KERNEL_ABI_VERSION`]
//!
//! The diagnostic variant must also export
//! `describe_failure(code: i32, len_ptr: i32) -> i32`.

pub mod builtin;
pub mod detector;
pub mod error;
pub mod failure;
pub mod instance;
pub mod loader;
pub mod session;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::{KernelInitError, KernelResult};
pub use failure::FailureCode;
pub use instance::KernelSession;
pub use loader::{KernelSource, WasmKernelLoader};
pub use session::KernelSessionManager;

/// Kernel ABI version understood by this host.
pub const KERNEL_ABI_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelVariant {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "withExceptions")]
    WithExceptions,
}

impl KernelVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            KernelVariant::Single => "single",
            KernelVariant::WithExceptions => "withExceptions",
        }
    }

    pub fn other(self) -> Self {
        match self {
            KernelVariant::Single => KernelVariant::WithExceptions,
            KernelVariant::WithExceptions => KernelVariant::Single,
        }
    }

    pub fn from_exceptions(enabled: bool) -> Self {
        if enabled {
            KernelVariant::WithExceptions
        } else {
            KernelVariant::Single
        }
    }

    pub fn has_exceptions(self) -> bool {
        matches!(self, KernelVariant::WithExceptions)
    }
}

impl fmt::Display for KernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_wire_names() {
        assert_eq!(
            serde_json::to_string(&KernelVariant::WithExceptions).unwrap(),
            "\"withExceptions\""
        );
        assert_eq!(
            serde_json::from_str::<KernelVariant>("\"single\"").unwrap(),
            KernelVariant::Single
        );
        assert_eq!(KernelVariant::Single.other(), KernelVariant::WithExceptions);
        assert!(KernelVariant::from_exceptions(true).has_exceptions());
    }
}
