// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for kernel module loading and session lifecycle.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Kernel module compiled, instantiated and handshaken.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shapeforge::observability::messages::kernel::KernelModuleLoaded;
///
/// let msg = KernelModuleLoaded {
///     variant: "single",
///     source: "built-in",
///     size_bytes: 512,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct KernelModuleLoaded<'a> {
    pub variant: &'a str,
    pub source: &'a str,
    pub size_bytes: usize,
}

impl Display for KernelModuleLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} kernel module from {} ({} bytes)",
            self.variant, self.source, self.size_bytes
        )
    }
}

impl StructuredLog for KernelModuleLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            variant = self.variant,
            source = self.source,
            size_bytes = self.size_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "kernel_module_loaded",
            span_name = name,
            variant = self.variant,
            source = self.source,
        )
    }
}

/// Kernel module could not be loaded.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct KernelModuleLoadFailed<'a> {
    pub variant: &'a str,
    pub source: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for KernelModuleLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to load {} kernel module from {}: {}",
            self.variant, self.source, self.error
        )
    }
}

impl StructuredLog for KernelModuleLoadFailed<'_> {
    fn log(&self) {
        tracing::error!(
            variant = self.variant,
            source = self.source,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "kernel_module_load_failed",
            span_name = name,
            variant = self.variant,
            source = self.source,
        )
    }
}

/// Kernel session initialized and ready for builds.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shapeforge::observability::messages::kernel::KernelReady;
/// use std::time::Duration;
///
/// let msg = KernelReady {
///     variant: "withExceptions",
///     duration: Duration::from_millis(12),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct KernelReady<'a> {
    pub variant: &'a str,
    pub duration: Duration,
}

impl Display for KernelReady<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kernel session '{}' ready in {:?}",
            self.variant, self.duration
        )
    }
}

impl StructuredLog for KernelReady<'_> {
    fn log(&self) {
        tracing::info!(
            variant = self.variant,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "kernel_ready",
            span_name = name,
            variant = self.variant,
            duration = ?self.duration,
        )
    }
}

/// Kernel session initialization failed. The failure is not memoized.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct KernelInitFailed<'a> {
    pub variant: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for KernelInitFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Kernel session '{}' failed to initialize: {}",
            self.variant, self.error
        )
    }
}

impl StructuredLog for KernelInitFailed<'_> {
    fn log(&self) {
        tracing::error!(variant = self.variant, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("kernel_init_failed", span_name = name, variant = self.variant)
    }
}

/// The active kernel variant changed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct KernelVariantToggled<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for KernelVariantToggled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Kernel variant switched from {} to {}", self.from, self.to)
    }
}

impl StructuredLog for KernelVariantToggled<'_> {
    fn log(&self) {
        tracing::info!(from = self.from, to = self.to, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "kernel_variant_toggled",
            span_name = name,
            from = self.from,
            to = self.to,
        )
    }
}
