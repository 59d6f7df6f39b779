// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ExportError;
use crate::kernel::error::KernelInitError;
use thiserror::Error;

/// Failures at the worker boundary that are not part of a build result.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// An export was requested for a shape id with no successful build.
    #[error("Shape '{0}' has not been computed yet")]
    ShapeNotComputed(String),

    /// The worker failed its health check.
    #[error("Worker is unresponsive: {0}")]
    Unresponsive(String),

    /// The worker thread is gone or dropped the reply.
    #[error("Worker disconnected")]
    Disconnected,

    /// The worker thread could not be started.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Kernel initialization failed: {0}")]
    KernelInit(#[from] KernelInitError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
