// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Binding between the script-facing modeling surface and a kernel session.

use crate::kernel::{KernelSession, KernelVariant};
use crate::observability::messages::evaluator::LibraryBound;
use crate::observability::messages::StructuredLog;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// The `kernel` value user code receives.
///
/// It names the session the modeling functions are bound to. Shapes built
/// through its methods are the same native shapes the bare constructors make.
#[derive(Debug, Clone)]
pub struct KernelHandle {
    session: Arc<KernelSession>,
}

impl KernelHandle {
    pub fn variant(&self) -> KernelVariant {
        self.session.variant()
    }

    pub fn session(&self) -> &Arc<KernelSession> {
        &self.session
    }
}

/// Tracks which kernel session the modeling functions are bound to.
///
/// Binding is idempotent per session: repeated builds against the same
/// session reuse the existing binding.
#[derive(Debug, Default)]
pub struct ModelingLibrary {
    bound: RwLock<Option<Arc<KernelSession>>>,
    binds: AtomicUsize,
}

impl ModelingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, session: &Arc<KernelSession>) -> KernelHandle {
        let already_bound = self
            .bound
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, session));

        if !already_bound {
            *self
                .bound
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(session));
            let binds = self.binds.fetch_add(1, Ordering::SeqCst) + 1;
            LibraryBound {
                variant: session.variant().as_str(),
                binds,
            }
            .log();
        }

        KernelHandle {
            session: Arc::clone(session),
        }
    }

    /// Number of times a new session has been bound.
    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn bound_variant(&self) -> Option<KernelVariant> {
        self.bound
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|session| session.variant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::WasmKernelLoader;
    use crate::modeling::Shape;
    use crate::traits::KernelLoader;

    #[tokio::test]
    async fn test_bind_once_per_session() {
        let loader = WasmKernelLoader::builtin();
        let single = Arc::new(loader.instantiate(KernelVariant::Single).await.unwrap());
        let diagnostic = Arc::new(
            loader
                .instantiate(KernelVariant::WithExceptions)
                .await
                .unwrap(),
        );

        let library = ModelingLibrary::new();
        assert_eq!(library.bound_variant(), None);

        library.bind(&single);
        library.bind(&single);
        assert_eq!(library.bind_count(), 1);

        let handle = library.bind(&diagnostic);
        assert_eq!(handle.variant(), KernelVariant::WithExceptions);
        assert_eq!(library.bind_count(), 2);
        assert_eq!(library.bound_variant(), Some(KernelVariant::WithExceptions));
    }

    #[tokio::test]
    async fn test_kernel_methods_match_bare_constructors() {
        let loader = WasmKernelLoader::builtin();
        let session = Arc::new(
            loader
                .instantiate(KernelVariant::WithExceptions)
                .await
                .unwrap(),
        );
        let handle = ModelingLibrary::new().bind(&session);

        let mut engine = rhai::Engine::new();
        crate::modeling::api::register(&mut engine);
        let mut scope = rhai::Scope::new();
        scope.push("k", handle);

        let variant = engine
            .eval_with_scope::<String>(&mut scope, "k.variant")
            .unwrap();
        assert_eq!(variant, KernelVariant::WithExceptions.as_str());

        let via_kernel = engine
            .eval_with_scope::<Shape>(&mut scope, "k.makeBox(2)")
            .unwrap();
        let bare = engine
            .eval_with_scope::<Shape>(&mut scope, "makeBox(2)")
            .unwrap();
        assert_eq!(via_kernel, bare);
    }
}
