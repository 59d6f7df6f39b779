// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the worker thread.
//!
//! This module contains message types for logging events related to:
//! * Worker thread startup and shutdown
//! * Request handling
//! * Build, render and export outcomes

use crate::errors::KernelError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Worker thread started and is accepting requests.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerStarted<'a> {
    pub thread_name: &'a str,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker thread '{}' started", self.thread_name)
    }
}

impl StructuredLog for WorkerStarted<'_> {
    fn log(&self) {
        tracing::info!(thread_name = self.thread_name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker", span_name = name, thread_name = self.thread_name)
    }
}

/// Worker thread exited its request loop.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerStopped<'a> {
    pub thread_name: &'a str,
    pub requests_handled: u64,
}

impl Display for WorkerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker thread '{}' stopped after {} requests",
            self.thread_name, self.requests_handled
        )
    }
}

impl StructuredLog for WorkerStopped<'_> {
    fn log(&self) {
        tracing::info!(
            thread_name = self.thread_name,
            requests_handled = self.requests_handled,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker_stopped", span_name = name, thread_name = self.thread_name)
    }
}

/// A request was taken off the worker queue.
///
/// # Log Level
/// `debug!` - Per-request detail
pub struct RequestReceived<'a> {
    pub operation: &'a str,
}

impl Display for RequestReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Handling worker request {}", self.operation)
    }
}

impl StructuredLog for RequestReceived<'_> {
    fn log(&self) {
        tracing::debug!(operation = self.operation, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("worker_request", span_name = name, operation = self.operation)
    }
}

/// User code evaluated and rendered.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shapeforge::observability::messages::worker::BuildCompleted;
/// use std::time::Duration;
///
/// let msg = BuildCompleted {
///     shape_count: 2,
///     duration: Duration::from_millis(85),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BuildCompleted {
    pub shape_count: usize,
    pub duration: Duration,
}

impl Display for BuildCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Build completed: {} shapes in {:?}",
            self.shape_count, self.duration
        )
    }
}

impl StructuredLog for BuildCompleted {
    fn log(&self) {
        tracing::info!(
            shape_count = self.shape_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "build_completed",
            span_name = name,
            shape_count = self.shape_count,
            duration = ?self.duration,
        )
    }
}

/// A build failed inside user code or the kernel.
///
/// # Log Level
/// `warn!` - User code errors are expected while editing
pub struct BuildFailed<'a> {
    pub error: &'a KernelError,
}

impl Display for BuildFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Build failed at {}:{}: {}",
            self.error.start_line_number, self.error.start_column, self.error.message
        )
    }
}

impl StructuredLog for BuildFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            error_type = ?self.error.kind,
            line = self.error.start_line_number,
            column = self.error.start_column,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("build_failed", span_name = name, error_type = ?self.error.kind)
    }
}

/// One shape could not be tessellated and renders as empty geometry.
///
/// # Log Level
/// `warn!` - Degraded output, the build still succeeds
pub struct ShapeTessellationFailed<'a> {
    pub shape_name: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ShapeTessellationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to tessellate shape '{}', rendering it empty: {}",
            self.shape_name, self.error
        )
    }
}

impl StructuredLog for ShapeTessellationFailed<'_> {
    fn log(&self) {
        tracing::warn!(shape_name = self.shape_name, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("tessellation_failed", span_name = name, shape_name = self.shape_name)
    }
}

/// Shapes exported to an interchange format.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExportCompleted<'a> {
    pub format: &'a str,
    pub shape_id: &'a str,
    pub artifact_count: usize,
}

impl Display for ExportCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Exported '{}' as {} ({} artifacts)",
            self.shape_id, self.format, self.artifact_count
        )
    }
}

impl StructuredLog for ExportCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            format = self.format,
            shape_id = self.shape_id,
            artifact_count = self.artifact_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "export",
            span_name = name,
            format = self.format,
            shape_id = self.shape_id,
        )
    }
}
