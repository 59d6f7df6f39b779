// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Kernel binary encoding detection
//!
//! Uses wasmparser to confirm a kernel binary is a classic core module before
//! it is handed to wasmtime. Component Model binaries and legacy Preview 1
//! components are rejected.

use crate::kernel::error::{
    KernelInitError, KERNEL_COMPONENT_REJECTED, KERNEL_UNSUPPORTED_ENCODING,
};

use wasmparser::{Encoding, Parser, Payload};

/// Summary of a validated kernel binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    /// Names of all exports, in declaration order.
    pub exports: Vec<String>,
    /// Number of imports the module declares. Kernels are instantiated with none.
    pub import_count: usize,
}

impl ModuleSummary {
    pub fn exports(&self, name: &str) -> bool {
        self.exports.iter().any(|export| export == name)
    }
}

/// Walks the binary once, checking the encoding and collecting its exports.
///
/// # Errors
/// Returns an error if:
/// - The input is empty, truncated, or otherwise invalid
/// - The binary is a component, or a legacy Preview 1 component
pub fn inspect_kernel_module(bytes: &[u8]) -> Result<ModuleSummary, KernelInitError> {
    let parser = Parser::new(0);
    let mut encoding = None;
    let mut has_component_section = false;
    let mut exports = Vec::new();
    let mut import_count = 0;

    for payload in parser.parse_all(bytes) {
        let payload = payload?;
        match payload {
            Payload::Version { encoding: enc, .. } => {
                encoding = Some(enc);
                if enc == Encoding::Component {
                    break;
                }
            }
            Payload::CustomSection(reader) if reader.name() == "component" => {
                has_component_section = true;
            }
            Payload::ImportSection(reader) => {
                import_count += reader.count() as usize;
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    exports.push(export?.name.to_string());
                }
            }
            _ => {}
        }
    }

    let encoding = encoding
        .ok_or_else(|| KernelInitError::InvalidWasmBinary("Invalid WASM binary".to_string()))?;

    match encoding {
        Encoding::Component => Err(KernelInitError::UnsupportedEncoding(
            KERNEL_COMPONENT_REJECTED.to_string(),
        )),
        Encoding::Module if has_component_section => Err(KernelInitError::UnsupportedEncoding(
            KERNEL_UNSUPPORTED_ENCODING.to_string(),
        )),
        Encoding::Module => Ok(ModuleSummary {
            exports,
            import_count,
        }),
    }
}
