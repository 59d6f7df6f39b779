// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit that line with its fields attached at the
//! level the message documents.
//!
//! # Organization
//!
//! * `kernel` - kernel module loading, session initialization and toggling
//! * `evaluator` - script evaluation and metadata extraction
//! * `worker` - worker thread lifecycle, builds and exports
//! * `orchestrator` - debounced dispatch and worker supervision
//!
//! # Usage Pattern
//!
//! ```rust
//! use shapeforge::observability::messages::kernel::KernelVariantToggled;
//! use shapeforge::observability::messages::StructuredLog;
//!
//! KernelVariantToggled {
//!     from: "single",
//!     to: "withExceptions",
//! }
//! .log();
//! ```

use tracing::Span;

pub mod evaluator;
pub mod kernel;
pub mod orchestrator;
pub mod worker;

/// A log message that knows its level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// A span carrying the message's fields, named `name`.
    fn span(&self, name: &str) -> Span;
}
