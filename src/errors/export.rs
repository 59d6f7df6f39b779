// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    /// Drawings carry no volume and cannot be written as a mesh or solid.
    #[error("Shape '{name}' cannot be exported as {format}")]
    UnsupportedShape { name: String, format: String },

    #[error("Failed to tessellate '{name}' for export: {message}")]
    Tessellation { name: String, message: String },

    #[error("Unknown export format '{0}'")]
    UnknownFormat(String),
}
