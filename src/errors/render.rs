// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// User code returned something that is neither a solid nor a drawing.
    #[error("Unsupported shape at index {index}: expected a solid or a drawing, got {type_name}")]
    UnsupportedShape { index: usize, type_name: String },
}
