// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod evaluation;
mod export;
mod kernel_error;
mod orchestrator;
mod render;
mod worker;

pub use config::{ConfigError, ValidationError};
pub use evaluation::{EvalResult, EvaluationError, ScriptFrame};
pub use export::ExportError;
pub use kernel_error::{ErrorKind, KernelError, StackFrame, SCRIPT_FILE_NAME};
pub use orchestrator::OrchestratorError;
pub use render::RenderError;
pub use worker::{WorkerError, WorkerResult};
