// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the build orchestrator.
//!
//! This module contains message types for logging events related to:
//! * Worker spawning and health checks
//! * Debounced build dispatch and stale responses
//! * Export failures and session shutdown

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A worker was spawned and its kernel initialized.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerSpawned<'a> {
    pub variant: &'a str,
}

impl Display for WorkerSpawned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker spawned with the '{}' kernel", self.variant)
    }
}

impl StructuredLog for WorkerSpawned<'_> {
    fn log(&self) {
        tracing::info!(variant = self.variant, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker_spawned", span_name = name, variant = self.variant)
    }
}

/// The current worker failed its health check and will be replaced.
///
/// # Log Level
/// `warn!` - Recoverable failure
///
/// # Example
/// ```rust
/// use shapeforge::observability::messages::orchestrator::WorkerUnresponsive;
/// use shapeforge::observability::messages::StructuredLog;
///
/// WorkerUnresponsive {
///     reason: "Worker disconnected",
/// }
/// .log();
/// ```
pub struct WorkerUnresponsive<'a> {
    pub reason: &'a str,
}

impl Display for WorkerUnresponsive<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker is unresponsive, respawning: {}", self.reason)
    }
}

impl StructuredLog for WorkerUnresponsive<'_> {
    fn log(&self) {
        tracing::warn!(reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("worker_unresponsive", span_name = name, reason = self.reason)
    }
}

/// A debounced build was sent to the worker.
///
/// # Log Level
/// `debug!` - Per-build detail
pub struct BuildDispatched {
    pub generation: u64,
    pub parameter_count: usize,
}

impl Display for BuildDispatched {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching build {} with {} parameters",
            self.generation, self.parameter_count
        )
    }
}

impl StructuredLog for BuildDispatched {
    fn log(&self) {
        tracing::debug!(
            generation = self.generation,
            parameter_count = self.parameter_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("build", span_name = name, generation = self.generation)
    }
}

/// A build response arrived after a newer one had been applied.
///
/// # Log Level
/// `debug!` - Expected during rapid edits
pub struct StaleResponseDiscarded {
    pub generation: u64,
    pub latest: u64,
}

impl Display for StaleResponseDiscarded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarding response for build {} (build {} already applied)",
            self.generation, self.latest
        )
    }
}

impl StructuredLog for StaleResponseDiscarded {
    fn log(&self) {
        tracing::debug!(generation = self.generation, latest = self.latest, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("stale_response", span_name = name, generation = self.generation)
    }
}

/// A build could not reach the worker at all.
///
/// # Log Level
/// `error!` - The preview will not update
pub struct BuildDispatchFailed<'a> {
    pub generation: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for BuildDispatchFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Build {} could not be dispatched: {}", self.generation, self.error)
    }
}

impl StructuredLog for BuildDispatchFailed<'_> {
    fn log(&self) {
        tracing::error!(generation = self.generation, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("build_dispatch_failed", span_name = name, generation = self.generation)
    }
}

/// An export request failed.
///
/// # Log Level
/// `warn!` - Surfaced to the caller through the build state
pub struct ExportFailed<'a> {
    pub format: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ExportFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Export to {} failed: {}", self.format, self.error)
    }
}

impl StructuredLog for ExportFailed<'_> {
    fn log(&self) {
        tracing::warn!(format = self.format, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("export_failed", span_name = name, format = self.format)
    }
}

/// The build session stopped its worker and pending debounce.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SessionShutDown {
    pub had_worker: bool,
}

impl Display for SessionShutDown {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.had_worker {
            write!(f, "Build session shut down and worker terminated")
        } else {
            write!(f, "Build session shut down")
        }
    }
}

impl StructuredLog for SessionShutDown {
    fn log(&self) {
        tracing::info!(had_worker = self.had_worker, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("session_shutdown", span_name = name)
    }
}
