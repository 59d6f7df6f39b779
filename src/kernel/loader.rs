// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Kernel module loading and instantiation
//!
//! Reads kernel bytes (built-in or from disk), validates the encoding with the
//! detector, compiles them on a fuel-metered engine and verifies the ABI
//! handshake before handing out a [`KernelSession`].

use crate::config::consts::{DEFAULT_FUEL_LEVEL, MAX_KERNEL_MODULE_SIZE};
use crate::config::KernelConfig;
use crate::kernel::builtin::builtin_kernel_bytes;
use crate::kernel::detector::inspect_kernel_module;
use crate::kernel::error::{KernelInitError, KernelResult};
use crate::kernel::instance::{KernelRuntime, KernelSession};
use crate::kernel::{KernelVariant, KERNEL_ABI_VERSION};
use crate::observability::messages::kernel::{KernelModuleLoadFailed, KernelModuleLoaded};
use crate::observability::messages::StructuredLog;
use crate::traits::KernelLoader;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use wasmtime::{Config, Engine, Instance, Module, Store};

/// Where a kernel variant's module bytes come from.
#[derive(Debug, Clone)]
pub enum KernelSource {
    Builtin,
    File(PathBuf),
    Bytes(Arc<Vec<u8>>),
}

impl KernelSource {
    fn describe(&self) -> String {
        match self {
            KernelSource::Builtin => "<builtin>".to_string(),
            KernelSource::File(path) => path.display().to_string(),
            KernelSource::Bytes(_) => "<memory>".to_string(),
        }
    }
}

/// Creates a Wasmtime engine for hosting kernel modules
///
/// Kernels are classic core modules, so the Component Model is disabled.
/// Fuel metering bounds every call into the kernel.
/// Disabled features: threads, SIMD, multi-memory, memory64
pub fn create_engine() -> KernelResult<Engine> {
    let mut config = Config::new();

    config.wasm_component_model(false);
    config.wasm_threads(false);
    config.wasm_simd(false);
    config.wasm_relaxed_simd(false);
    config.wasm_multi_memory(false);
    config.wasm_memory64(false);
    config.consume_fuel(true);
    config.epoch_interruption(false);

    Engine::new(&config).map_err(|e| KernelInitError::EngineError(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct WasmKernelLoader {
    single: KernelSource,
    with_exceptions: KernelSource,
    fuel: u64,
    max_module_size: usize,
}

impl Default for WasmKernelLoader {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WasmKernelLoader {
    /// Loader serving the built-in kernels for both variants.
    pub fn builtin() -> Self {
        Self {
            single: KernelSource::Builtin,
            with_exceptions: KernelSource::Builtin,
            fuel: DEFAULT_FUEL_LEVEL,
            max_module_size: MAX_KERNEL_MODULE_SIZE,
        }
    }

    pub fn from_config(config: &KernelConfig) -> Self {
        let source = |path: &Option<PathBuf>| match path {
            Some(path) => KernelSource::File(path.clone()),
            None => KernelSource::Builtin,
        };
        Self {
            single: source(&config.single_module),
            with_exceptions: source(&config.with_exceptions_module),
            fuel: config.fuel_level(),
            max_module_size: MAX_KERNEL_MODULE_SIZE,
        }
    }

    pub fn with_source(mut self, variant: KernelVariant, source: KernelSource) -> Self {
        match variant {
            KernelVariant::Single => self.single = source,
            KernelVariant::WithExceptions => self.with_exceptions = source,
        }
        self
    }

    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn source(&self, variant: KernelVariant) -> &KernelSource {
        match variant {
            KernelVariant::Single => &self.single,
            KernelVariant::WithExceptions => &self.with_exceptions,
        }
    }

    async fn read_source(&self, variant: KernelVariant) -> KernelResult<Vec<u8>> {
        let bytes = match self.source(variant) {
            KernelSource::Builtin => builtin_kernel_bytes(variant)?,
            KernelSource::File(path) => tokio::fs::read(path).await?,
            KernelSource::Bytes(bytes) => bytes.as_ref().clone(),
        };

        if bytes.len() > self.max_module_size {
            return Err(KernelInitError::TooLarge {
                size: bytes.len(),
                maximum: self.max_module_size,
            });
        }
        Ok(bytes)
    }

    /// Compile, instantiate and handshake a kernel from raw bytes.
    pub fn instantiate_bytes(
        &self,
        variant: KernelVariant,
        bytes: &[u8],
    ) -> KernelResult<KernelSession> {
        let summary = inspect_kernel_module(bytes)?;
        if summary.import_count > 0 {
            return Err(KernelInitError::ModuleError(format!(
                "Kernel modules may not import host functions ({} imports declared)",
                summary.import_count
            )));
        }

        let engine = create_engine()?;
        let module = Module::from_binary(&engine, bytes)
            .map_err(|e| KernelInitError::ModuleError(e.to_string()))?;

        let mut store = Store::new(&engine, ());
        store.set_fuel(self.fuel)?;
        let instance = Instance::new(&mut store, &module, &[])?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or(KernelInitError::MissingExport("memory"))?;
        let version_fn = instance
            .get_typed_func::<(), i32>(&mut store, "kernel_version")
            .map_err(|_| KernelInitError::MissingExport("kernel_version"))?;
        let version = version_fn.call(&mut store, ())?;
        if version != KERNEL_ABI_VERSION {
            return Err(KernelInitError::AbiMismatch {
                found: version,
                expected: KERNEL_ABI_VERSION,
            });
        }

        let describe = if variant.has_exceptions() {
            Some(
                instance
                    .get_typed_func::<(i32, i32), i32>(&mut store, "describe_failure")
                    .map_err(|_| KernelInitError::MissingExport("describe_failure"))?,
            )
        } else {
            None
        };

        Ok(KernelSession::new(
            variant,
            version,
            self.fuel,
            KernelRuntime {
                store,
                memory,
                describe,
            },
        ))
    }
}

#[async_trait]
impl KernelLoader for WasmKernelLoader {
    async fn instantiate(&self, variant: KernelVariant) -> KernelResult<KernelSession> {
        let source = self.source(variant).describe();
        let result = match self.read_source(variant).await {
            Ok(bytes) => self
                .instantiate_bytes(variant, &bytes)
                .map(|session| (session, bytes.len())),
            Err(e) => Err(e),
        };

        match result {
            Ok((session, size_bytes)) => {
                KernelModuleLoaded {
                    variant: variant.as_str(),
                    source: &source,
                    size_bytes,
                }
                .log();
                Ok(session)
            }
            Err(error) => {
                KernelModuleLoadFailed {
                    variant: variant.as_str(),
                    source: &source,
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }
}
