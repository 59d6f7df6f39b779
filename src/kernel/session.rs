// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Kernel session management.
//!
//! Each variant moves through `Uninitialized -> Initializing -> Ready` inside
//! a `tokio::sync::OnceCell`. Concurrent callers of [`KernelSessionManager::initialize`]
//! wait on the same initialization; a failed initialization leaves the cell
//! empty so the next caller retries.

use crate::kernel::{KernelResult, KernelSession, KernelVariant};
use crate::observability::messages::kernel::{KernelInitFailed, KernelReady, KernelVariantToggled};
use crate::observability::messages::StructuredLog;
use crate::traits::KernelLoader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

pub struct KernelSessionManager {
    loader: Arc<dyn KernelLoader>,
    single: OnceCell<Arc<KernelSession>>,
    with_exceptions: OnceCell<Arc<KernelSession>>,
    exceptions: AtomicBool,
}

impl KernelSessionManager {
    pub fn new(loader: Arc<dyn KernelLoader>) -> Self {
        Self {
            loader,
            single: OnceCell::new(),
            with_exceptions: OnceCell::new(),
            exceptions: AtomicBool::new(false),
        }
    }

    fn cell(&self, variant: KernelVariant) -> &OnceCell<Arc<KernelSession>> {
        match variant {
            KernelVariant::Single => &self.single,
            KernelVariant::WithExceptions => &self.with_exceptions,
        }
    }

    pub fn active_variant(&self) -> KernelVariant {
        KernelVariant::from_exceptions(self.exceptions.load(Ordering::SeqCst))
    }

    pub fn is_exceptions_enabled(&self) -> bool {
        self.exceptions.load(Ordering::SeqCst)
    }

    /// Whether the active variant has finished initializing.
    pub fn is_ready(&self) -> bool {
        self.cell(self.active_variant()).initialized()
    }

    /// The active variant's session, if already initialized.
    pub fn current(&self) -> Option<Arc<KernelSession>> {
        self.cell(self.active_variant()).get().cloned()
    }

    pub async fn initialize(&self, variant: KernelVariant) -> KernelResult<Arc<KernelSession>> {
        let session = self
            .cell(variant)
            .get_or_try_init(|| async {
                let started = Instant::now();
                match self.loader.instantiate(variant).await {
                    Ok(session) => {
                        KernelReady {
                            variant: variant.as_str(),
                            duration: started.elapsed(),
                        }
                        .log();
                        Ok(Arc::new(session))
                    }
                    Err(error) => {
                        KernelInitFailed {
                            variant: variant.as_str(),
                            error: &error,
                        }
                        .log();
                        Err(error)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(session))
    }

    /// Initialize and return the active variant's session.
    pub async fn active(&self) -> KernelResult<Arc<KernelSession>> {
        self.initialize(self.active_variant()).await
    }

    /// Select a variant and make sure it is initialized.
    ///
    /// On failure the previously active variant is restored.
    pub async fn set_exceptions(&self, enabled: bool) -> KernelResult<KernelVariant> {
        let previous = self.exceptions.swap(enabled, Ordering::SeqCst);
        let variant = KernelVariant::from_exceptions(enabled);
        match self.initialize(variant).await {
            Ok(_) => Ok(variant),
            Err(e) => {
                self.exceptions.store(previous, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    pub async fn toggle_exceptions(&self) -> KernelResult<KernelVariant> {
        let from = self.active_variant();
        let to = self.set_exceptions(!from.has_exceptions()).await?;
        KernelVariantToggled {
            from: from.as_str(),
            to: to.as_str(),
        }
        .log();
        Ok(to)
    }
}
