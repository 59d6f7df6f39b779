// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the evaluation pipeline.
//!
//! Every diagnostic line is a typed message from [`messages`] rather than a
//! format string at the call site. Messages carry their own level and fields,
//! so a subscriber configured with `RUST_LOG` sees the same structure from
//! the kernel, the evaluator, the worker thread and the orchestrator.
//!
//! # Usage
//!
//! ```rust
//! use shapeforge::observability::messages::orchestrator::BuildDispatched;
//! use shapeforge::observability::messages::StructuredLog;
//!
//! let msg = BuildDispatched {
//!     generation: 3,
//!     parameter_count: 2,
//! };
//!
//! msg.log();
//! let _span = msg.span("preview").entered();
//! ```

pub mod messages;
