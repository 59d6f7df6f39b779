// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Serializable error returned across the worker boundary.
//!
//! Every failure inside a build is converted into a [`KernelError`] and handed
//! back as a value; nothing evaluated by the worker is allowed to surface as a
//! transport failure.

use crate::errors::{EvaluationError, RenderError};
use crate::kernel::error::KernelInitError;
use serde::{Deserialize, Serialize};

/// File name reported in stack frames for user modeling code.
pub const SCRIPT_FILE_NAME: &str = "model.rhai";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Compilation,
    Runtime,
    Kernel,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub file_name: String,
    pub function_name: String,
    pub line_number: u32,
    pub column_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_frames: Option<Vec<StackFrame>>,
    pub start_line_number: u32,
    pub start_column: u32,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

impl KernelError {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            stack_frames: None,
            start_line_number: 0,
            start_column: 0,
            kind: ErrorKind::Unknown,
        }
    }

    /// Convert an evaluation failure, translating numeric kernel codes with
    /// `describe` when the active kernel can explain them.
    pub fn from_evaluation<F>(err: &EvaluationError, describe: F) -> Self
    where
        F: Fn(i32) -> Option<String>,
    {
        match err {
            EvaluationError::Compilation {
                message,
                line,
                column,
            } => Self {
                message: message.clone(),
                stack: None,
                stack_frames: None,
                start_line_number: *line,
                start_column: *column,
                kind: ErrorKind::Compilation,
            },
            EvaluationError::Runtime {
                message,
                line,
                column,
                frames,
            } => Self::with_frames(message.clone(), *line, *column, frames, ErrorKind::Runtime),
            EvaluationError::Kernel {
                code,
                line,
                column,
                frames,
            } => {
                let message = describe(*code).unwrap_or_else(|| format!("Kernel error {}", code));
                Self::with_frames(message, *line, *column, frames, ErrorKind::Kernel)
            }
            EvaluationError::MissingEntryPoint { .. } => Self {
                kind: ErrorKind::Runtime,
                ..Self::unknown(err.to_string())
            },
            EvaluationError::Terminated => Self::unknown(err.to_string()),
        }
    }

    fn with_frames(
        message: String,
        line: u32,
        column: u32,
        frames: &[crate::errors::ScriptFrame],
        kind: ErrorKind,
    ) -> Self {
        let stack_frames: Vec<StackFrame> = frames
            .iter()
            .map(|frame| StackFrame {
                file_name: SCRIPT_FILE_NAME.to_string(),
                function_name: frame.function_name.clone(),
                line_number: frame.line,
                column_number: frame.column,
            })
            .collect();

        let stack = if stack_frames.is_empty() {
            None
        } else {
            let mut stack = message.clone();
            for frame in &stack_frames {
                stack.push_str(&format!(
                    "\n    at {} ({}:{}:{})",
                    frame.function_name, frame.file_name, frame.line_number, frame.column_number
                ));
            }
            Some(stack)
        };

        Self {
            message,
            stack,
            stack_frames: if stack_frames.is_empty() {
                None
            } else {
                Some(stack_frames)
            },
            start_line_number: line,
            start_column: column,
            kind,
        }
    }
}

impl From<&RenderError> for KernelError {
    fn from(err: &RenderError) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            ..Self::unknown(err.to_string())
        }
    }
}

impl From<&KernelInitError> for KernelError {
    fn from(err: &KernelInitError) -> Self {
        Self::unknown(format!("Kernel initialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScriptFrame;

    fn kernel_failure(code: i32) -> EvaluationError {
        EvaluationError::Kernel {
            code,
            line: 4,
            column: 9,
            frames: vec![ScriptFrame {
                function_name: "main".to_string(),
                line: 7,
                column: 1,
            }],
        }
    }

    #[test]
    fn test_kernel_code_translated_when_described() {
        let err = KernelError::from_evaluation(&kernel_failure(1), |code| {
            (code == 1).then(|| "Dimension must be positive".to_string())
        });
        assert_eq!(err.message, "Dimension must be positive");
        assert_eq!(err.kind, ErrorKind::Kernel);
        assert_eq!(err.start_line_number, 4);
        assert_eq!(err.start_column, 9);
    }

    #[test]
    fn test_kernel_code_formatted_without_diagnostics() {
        let err = KernelError::from_evaluation(&kernel_failure(42), |_| None);
        assert_eq!(err.message, "Kernel error 42");
        let frames = err.stack_frames.expect("frames");
        assert_eq!(frames[0].function_name, "main");
        assert_eq!(frames[0].file_name, SCRIPT_FILE_NAME);
        assert!(err.stack.unwrap().contains("at main (model.rhai:7:1)"));
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let err = KernelError::from_evaluation(
            &EvaluationError::Compilation {
                message: "Expecting ';'".to_string(),
                line: 2,
                column: 5,
            },
            |_| None,
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "compilation");
        assert_eq!(json["startLineNumber"], 2);
        assert_eq!(json["startColumn"], 5);
        assert!(json.get("stackFrames").is_none());
    }
}
