// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! An instantiated kernel module.

use crate::kernel::KernelVariant;
use std::sync::Mutex;
use wasmtime::{Memory, Store, TypedFunc};

/// Address the diagnostic kernel writes message lengths to.
const LENGTH_SCRATCH_ADDR: usize = 0;

pub(crate) struct KernelRuntime {
    pub(crate) store: Store<()>,
    pub(crate) memory: Memory,
    pub(crate) describe: Option<TypedFunc<(i32, i32), i32>>,
}

/// A live wasmtime instance of one kernel variant.
pub struct KernelSession {
    variant: KernelVariant,
    abi_version: i32,
    fuel: u64,
    runtime: Mutex<KernelRuntime>,
}

impl std::fmt::Debug for KernelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelSession")
            .field("variant", &self.variant)
            .field("abi_version", &self.abi_version)
            .finish()
    }
}

impl KernelSession {
    pub(crate) fn new(
        variant: KernelVariant,
        abi_version: i32,
        fuel: u64,
        runtime: KernelRuntime,
    ) -> Self {
        Self {
            variant,
            abi_version,
            fuel,
            runtime: Mutex::new(runtime),
        }
    }

    pub fn variant(&self) -> KernelVariant {
        self.variant
    }

    pub fn abi_version(&self) -> i32 {
        self.abi_version
    }

    pub fn has_diagnostics(&self) -> bool {
        self.runtime
            .lock()
            .map(|runtime| runtime.describe.is_some())
            .unwrap_or(false)
    }

    /// Ask the kernel for the message behind a failure code.
    ///
    /// Returns `None` for the fast kernel, for codes the kernel does not know,
    /// and when the call traps or returns an out-of-bounds message.
    pub fn describe_failure(&self, code: i32) -> Option<String> {
        let mut guard = self.runtime.lock().ok()?;
        let runtime = &mut *guard;
        let describe = runtime.describe.clone()?;

        if let Err(e) = runtime.store.set_fuel(self.fuel) {
            tracing::debug!("Failed to refuel kernel store: {}", e);
            return None;
        }

        let ptr = match describe.call(&mut runtime.store, (code, LENGTH_SCRATCH_ADDR as i32)) {
            Ok(ptr) => ptr,
            Err(e) => {
                tracing::debug!("describe_failure({}) trapped: {}", code, e);
                return None;
            }
        };

        let data = runtime.memory.data(&runtime.store);
        let len_bytes: [u8; 4] = data
            .get(LENGTH_SCRATCH_ADDR..LENGTH_SCRATCH_ADDR + 4)?
            .try_into()
            .ok()?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len == 0 || ptr <= 0 {
            return None;
        }

        let start = ptr as usize;
        let bytes = data.get(start..start.checked_add(len)?)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}
