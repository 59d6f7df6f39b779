// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors produced while compiling or running user modeling code.
//!
//! Rhai reports failures as nested `EvalAltResult` values: every script
//! function call on the path to the failure wraps the inner error in an
//! `ErrorInFunctionCall`. The conversions here unwind that nesting into a
//! flat list of [`ScriptFrame`]s so the wire error can carry a stack.

use rhai::{EvalAltResult, ParseError, Position};
use thiserror::Error;

/// One script function frame on the path to a runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFrame {
    pub function_name: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The source failed to parse.
    #[error("{message}")]
    Compilation {
        message: String,
        line: u32,
        column: u32,
    },

    /// The script threw while executing.
    #[error("{message}")]
    Runtime {
        message: String,
        line: u32,
        column: u32,
        /// Innermost frame first.
        frames: Vec<ScriptFrame>,
    },

    /// A numeric failure code was thrown by the modeling kernel or the script.
    #[error("Kernel failure code {code}")]
    Kernel {
        code: i32,
        line: u32,
        column: u32,
        frames: Vec<ScriptFrame>,
    },

    /// Neither of the accepted entry points is defined.
    #[error("No entry point found: expected {expected}")]
    MissingEntryPoint { expected: &'static str },

    /// The worker was terminated while the script was running.
    #[error("Evaluation terminated")]
    Terminated,
}

/// Result type alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvaluationError>;

fn line_and_column(pos: Position) -> (u32, u32) {
    (
        pos.line().unwrap_or(0) as u32,
        pos.position().unwrap_or(0) as u32,
    )
}

impl EvaluationError {
    pub fn from_parse(err: &ParseError) -> Self {
        let (line, column) = line_and_column(err.1);
        EvaluationError::Compilation {
            message: err.0.to_string(),
            line,
            column,
        }
    }

    pub fn from_eval(err: &EvalAltResult) -> Self {
        let mut frames = Vec::new();
        let mut current = err;
        while let EvalAltResult::ErrorInFunctionCall(name, _, inner, pos) = current {
            let (line, column) = line_and_column(*pos);
            // Nested calls may arrive pre-joined as "inner < outer".
            for function_name in name.split(" < ").collect::<Vec<_>>().into_iter().rev() {
                frames.push(ScriptFrame {
                    function_name: function_name.to_string(),
                    line,
                    column,
                });
            }
            current = inner;
        }
        frames.reverse();

        let (line, column) = line_and_column(current.position());
        match current {
            EvalAltResult::ErrorTerminated(..) => EvaluationError::Terminated,
            EvalAltResult::ErrorRuntime(value, _) => match value.as_int() {
                Ok(code) => EvaluationError::Kernel {
                    code: code as i32,
                    line,
                    column,
                    frames,
                },
                Err(_) => EvaluationError::Runtime {
                    message: value.to_string(),
                    line,
                    column,
                    frames,
                },
            },
            other => EvaluationError::Runtime {
                message: other.to_string(),
                line,
                column,
                frames,
            },
        }
    }
}

impl From<Box<EvalAltResult>> for EvaluationError {
    fn from(err: Box<EvalAltResult>) -> Self {
        EvaluationError::from_eval(&err)
    }
}

impl From<ParseError> for EvaluationError {
    fn from(err: ParseError) -> Self {
        EvaluationError::from_parse(&err)
    }
}
