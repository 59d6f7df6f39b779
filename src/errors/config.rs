// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while validating a loaded configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A tessellation tolerance is zero, negative or not finite
    InvalidTolerance {
        /// Dotted path of the offending field
        field: &'static str,
        value: f64,
    },
    /// An angular tolerance is outside (0, 180] degrees
    InvalidAngularTolerance {
        field: &'static str,
        value: f64,
    },
    /// The debounce interval exceeds the allowed maximum
    DebounceTooLong {
        debounce_ms: u64,
        maximum_ms: u64,
    },
    /// The kernel fuel level is outside the allowed bounds
    FuelOutOfBounds {
        fuel: u64,
        minimum: u64,
        maximum: u64,
    },
    /// An evaluator limit was configured as zero
    ZeroLimit {
        field: &'static str,
    },
    /// A configured kernel module path does not exist
    MissingKernelModule {
        variant: &'static str,
        path: PathBuf,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidTolerance { field, value } => {
                write!(f, "'{}' must be a positive, finite number (got {})", field, value)
            }
            ValidationError::InvalidAngularTolerance { field, value } => {
                write!(
                    f,
                    "'{}' must be greater than 0 and at most 180 degrees (got {})",
                    field, value
                )
            }
            ValidationError::DebounceTooLong {
                debounce_ms,
                maximum_ms,
            } => {
                write!(
                    f,
                    "Debounce interval of {}ms exceeds the maximum of {}ms",
                    debounce_ms, maximum_ms
                )
            }
            ValidationError::FuelOutOfBounds {
                fuel,
                minimum,
                maximum,
            } => {
                write!(
                    f,
                    "Kernel fuel {} is outside the allowed range [{}, {}]",
                    fuel, minimum, maximum
                )
            }
            ValidationError::ZeroLimit { field } => {
                write!(f, "'{}' must be greater than zero", field)
            }
            ValidationError::MissingKernelModule { variant, path } => {
                write!(
                    f,
                    "Kernel module for the '{}' variant not found at {}",
                    variant,
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
