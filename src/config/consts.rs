// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default fuel level for kernel calls (100 million instructions)
pub const DEFAULT_FUEL_LEVEL: u64 = 100_000_000;
/// Minimum allowed fuel level (1 million instructions)
pub const MIN_FUEL_LEVEL: u64 = 1_000_000;
/// Maximum allowed fuel level (500 million instructions) - security limit
pub const MAX_FUEL_LEVEL: u64 = 500_000_000;
/// Largest kernel module accepted from disk (64 MB)
pub const MAX_KERNEL_MODULE_SIZE: usize = 64 * 1024 * 1024;

/// Script operations allowed per evaluation
pub const DEFAULT_MAX_OPERATIONS: u64 = 10_000_000;
pub const DEFAULT_MAX_CALL_LEVELS: usize = 64;
pub const DEFAULT_MAX_EXPR_DEPTH: usize = 128;
pub const DEFAULT_MAX_STRING_SIZE: usize = 1024 * 1024;
pub const DEFAULT_MAX_ARRAY_SIZE: usize = 100_000;
pub const DEFAULT_MAX_MAP_SIZE: usize = 10_000;

/// Linear deflection used for preview meshes
pub const DEFAULT_PREVIEW_TOLERANCE: f64 = 0.1;
/// Angular deflection used for preview meshes, in degrees
pub const DEFAULT_PREVIEW_ANGULAR_TOLERANCE: f64 = 30.0;
pub const DEFAULT_EXPORT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_EXPORT_ANGULAR_TOLERANCE: f64 = 30.0;

/// Quiet period before a mutation triggers a build
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const MAX_DEBOUNCE_MS: u64 = 10_000;
