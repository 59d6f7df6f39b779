// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for user-code evaluation.
//!
//! This module contains message types for logging events related to:
//! * Binding the modeling library to a kernel session
//! * Script evaluation and strategy selection
//! * Debug shapes registered by user code
//! * Metadata extraction fallbacks

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Modeling library bound to a new kernel session.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LibraryBound<'a> {
    pub variant: &'a str,
    /// Total binds over the worker's lifetime, this one included.
    pub binds: usize,
}

impl Display for LibraryBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Modeling library bound to '{}' kernel session (bind #{})",
            self.variant, self.binds
        )
    }
}

impl StructuredLog for LibraryBound<'_> {
    fn log(&self) {
        tracing::info!(variant = self.variant, binds = self.binds, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("library_bound", span_name = name, variant = self.variant)
    }
}

/// Evaluation of user code started.
///
/// # Log Level
/// `debug!` - Per-build detail
///
/// # Example
/// ```
/// use shapeforge::observability::messages::evaluator::EvaluationStarted;
///
/// let msg = EvaluationStarted {
///     strategy: "module",
///     source_len: 240,
///     parameter_count: 3,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct EvaluationStarted<'a> {
    pub strategy: &'a str,
    pub source_len: usize,
    pub parameter_count: usize,
}

impl Display for EvaluationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Evaluating {} bytes of user code with {} strategy and {} parameters",
            self.source_len, self.strategy, self.parameter_count
        )
    }
}

impl StructuredLog for EvaluationStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            strategy = self.strategy,
            source_len = self.source_len,
            parameter_count = self.parameter_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "evaluation",
            span_name = name,
            strategy = self.strategy,
            source_len = self.source_len,
        )
    }
}

/// User code passed a shape to `debug()`.
///
/// # Log Level
/// `debug!` - Routed through the script engine's debug channel
pub struct DebugShapeRegistered<'a> {
    pub shape_type: &'a str,
    pub index: usize,
}

impl Display for DebugShapeRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Debug {} registered as Debug {}", self.shape_type, self.index)
    }
}

impl StructuredLog for DebugShapeRegistered<'_> {
    fn log(&self) {
        tracing::debug!(shape_type = self.shape_type, index = self.index, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("debug_shape", span_name = name, index = self.index)
    }
}

/// Reading a metadata binding failed; the caller falls back to empty.
///
/// # Log Level
/// `debug!` - Expected for code that is still being typed
pub struct MetadataExtractionFailed<'a> {
    pub binding: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for MetadataExtractionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Could not extract '{}': {}", self.binding, self.error)
    }
}

impl StructuredLog for MetadataExtractionFailed<'_> {
    fn log(&self) {
        tracing::debug!(binding = self.binding, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("metadata_extraction", span_name = name, binding = self.binding)
    }
}
