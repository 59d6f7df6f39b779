// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for kernel module loading and instantiation.
//!
//! Every stage between reading the module bytes and verifying the kernel ABI
//! reports through [`KernelInitError`]. Initialization failures are never
//! cached by the session manager, so these errors are always retryable.

use thiserror::Error;

/// Error message for unsupported legacy Preview 1 Component Model binaries.
pub const KERNEL_UNSUPPORTED_ENCODING: &str = "Unsupported kernel binary: legacy Preview 1 \
Component Model detected. Kernels must be classic core WASM modules.";

/// Error message for Component Model binaries, which cannot host the C-style kernel ABI.
pub const KERNEL_COMPONENT_REJECTED: &str = "Unsupported kernel binary: Component Model \
binaries are not supported. Kernels must be classic core WASM modules.";

#[derive(Error, Debug)]
pub enum KernelInitError {
    /// Invalid or malformed WASM binary format.
    #[error("Invalid WASM binary: {0}")]
    InvalidWasmBinary(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Kernel module too large: {size} bytes (max: {maximum} bytes)")]
    TooLarge { size: usize, maximum: usize },

    /// Module compilation or instantiation error.
    #[error("WASM module error: {0}")]
    ModuleError(String),

    #[error("Engine creation error: {0}")]
    EngineError(String),

    /// A required export is absent or has the wrong signature.
    #[error("Kernel module is missing export '{0}'")]
    MissingExport(&'static str),

    #[error("Kernel ABI version {found} is not supported (expected {expected})")]
    AbiMismatch { found: i32, expected: i32 },

    /// File I/O error during module loading.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wasmtime runtime execution error.
    #[error("WASM execution error: {0}")]
    ExecutionError(#[from] wasmtime::Error),

    /// WASM binary parsing error from wasmparser.
    #[error("WASM parser error: {0}")]
    ParserError(#[from] wasmparser::BinaryReaderError),
}

/// Result type alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelInitError>;
