// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // YAML config + validation
pub mod errors;        // error taxonomy and the wire error
pub mod evaluator;     // sandboxed script evaluation
pub mod export;        // STL / STEP writers
pub mod kernel;        // WASM kernel sessions
pub mod modeling;      // shapes, primitives, tessellation
pub mod observability;
pub mod orchestrator;  // debounced builds over a worker
pub mod render;        // shape normalization and geometry results
pub mod traits;        // seams between layers
pub mod worker;        // worker thread and its RPC surface
