// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in kernel modules.
//!
//! Both variants are generated as WebAssembly text and assembled at load time.
//! The fast variant exports only the ABI handshake. The diagnostic variant
//! additionally embeds every [`FailureCode`] description in a data segment and
//! exports `describe_failure(code, len_ptr) -> ptr`, which writes the message
//! length to `len_ptr` and returns the message address (length 0 when the code
//! is unknown).

use crate::kernel::error::{KernelInitError, KernelResult};
use crate::kernel::failure::FailureCode;
use crate::kernel::{KernelVariant, KERNEL_ABI_VERSION};
use std::fmt::Write;

/// First byte of the diagnostic message table. Addresses below it are scratch.
const MESSAGE_TABLE_OFFSET: usize = 1024;

pub fn kernel_wat(variant: KernelVariant) -> String {
    match variant {
        KernelVariant::Single => single_kernel_wat(),
        KernelVariant::WithExceptions => diagnostic_kernel_wat(),
    }
}

pub fn builtin_kernel_bytes(variant: KernelVariant) -> KernelResult<Vec<u8>> {
    wat::parse_str(kernel_wat(variant))
        .map_err(|e| KernelInitError::InvalidWasmBinary(e.to_string()))
}

fn single_kernel_wat() -> String {
    format!(
        r#"(module
  (memory (export "memory") 1)
  (func (export "kernel_version") (result i32)
    i32.const {version}))
"#,
        version = KERNEL_ABI_VERSION
    )
}

fn diagnostic_kernel_wat() -> String {
    let mut data = String::new();
    let mut branches = String::new();
    let mut offset = MESSAGE_TABLE_OFFSET;

    for failure in FailureCode::ALL {
        let message = failure.description();
        // Infallible for String targets.
        let _ = writeln!(data, "  (data (i32.const {}) \"{}\")", offset, message);
        let _ = writeln!(
            branches,
            "    (if (i32.eq (local.get $code) (i32.const {code}))
      (then
        (i32.store (local.get $len_ptr) (i32.const {len}))
        (return (i32.const {offset}))))",
            code = failure.code(),
            len = message.len(),
            offset = offset,
        );
        offset += message.len();
    }

    format!(
        r#"(module
  (memory (export "memory") 1)
{data}  (func (export "kernel_version") (result i32)
    i32.const {version})
  (func (export "describe_failure") (param $code i32) (param $len_ptr i32) (result i32)
{branches}    (i32.store (local.get $len_ptr) (i32.const 0))
    (i32.const 0)))
"#,
        data = data,
        version = KERNEL_ABI_VERSION,
        branches = branches,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::detector::inspect_kernel_module;

    #[test]
    fn test_single_kernel_exports_handshake_only() {
        let bytes = builtin_kernel_bytes(KernelVariant::Single).unwrap();
        let summary = inspect_kernel_module(&bytes).unwrap();
        assert!(summary.exports("kernel_version"));
        assert!(summary.exports("memory"));
        assert!(!summary.exports("describe_failure"));
    }

    #[test]
    fn test_diagnostic_kernel_assembles_with_message_table() {
        let bytes = builtin_kernel_bytes(KernelVariant::WithExceptions).unwrap();
        let summary = inspect_kernel_module(&bytes).unwrap();
        assert!(summary.exports("describe_failure"));

        let wat = kernel_wat(KernelVariant::WithExceptions);
        for failure in FailureCode::ALL {
            assert!(wat.contains(failure.description()));
        }
    }
}
