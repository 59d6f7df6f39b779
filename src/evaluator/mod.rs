// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Evaluation of user modeling code.
//!
//! * `sandbox` - the resource-limited script engine and both evaluation strategies
//! * `module_cache` - compiled modules keyed by source hash
//! * `metadata` - declared defaults, names and schemas

pub mod metadata;
pub mod module_cache;
pub mod sandbox;

pub use module_cache::{CompiledModule, ModuleCache};
pub use sandbox::{select_strategy, Evaluation, Evaluator, Strategy};
