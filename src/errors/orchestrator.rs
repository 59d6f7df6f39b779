// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{KernelError, WorkerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// A request reached the worker but failed there.
    #[error("{}", .0.message)]
    Kernel(KernelError),
}

impl From<KernelError> for OrchestratorError {
    fn from(err: KernelError) -> Self {
        OrchestratorError::Kernel(err)
    }
}
