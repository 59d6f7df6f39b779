// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The worker process boundary.
//!
//! A worker owns the kernel sessions, the evaluator with its module cache and
//! the shapes produced by the latest build. Callers talk to it only through
//! [`WorkerRpc`](crate::traits::WorkerRpc) messages; failures inside user
//! code come back as values, never as transport errors.

pub mod handle;
pub mod protocol;
pub mod state;


pub use handle::{ThreadWorkerSpawner, WorkerHandle, WORKER_THREAD_NAME};
pub use protocol::{BuildResult, ParameterInfo, Parameters, RpcResponse, WorkerRequest};
pub use state::{WorkerState, DEFAULT_SHAPE_ID};
