// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::kernel::{KernelResult, KernelSession, KernelVariant};

/// Produces initialized kernel sessions for the session manager.
#[async_trait]
pub trait KernelLoader: Send + Sync {
    async fn instantiate(&self, variant: KernelVariant) -> KernelResult<KernelSession>;
}
