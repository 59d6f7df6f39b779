// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod kernel_loader;
pub mod worker;

pub use kernel_loader::KernelLoader;
pub use worker::{WorkerRpc, WorkerSpawner};
