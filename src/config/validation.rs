// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Every check runs and every failure is collected, so a single pass reports
//! all problems in a config file at once.

use crate::config::consts::{MAX_DEBOUNCE_MS, MAX_FUEL_LEVEL, MIN_FUEL_LEVEL};
use crate::config::Config;
use crate::errors::ValidationError;

fn check_tolerance(field: &'static str, value: Option<f64>, errors: &mut Vec<ValidationError>) {
    if let Some(value) = value {
        if !(value.is_finite() && value > 0.0) {
            errors.push(ValidationError::InvalidTolerance { field, value });
        }
    }
}

fn check_angular_tolerance(
    field: &'static str,
    value: Option<f64>,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(value) = value {
        if !(value > 0.0 && value <= 180.0) {
            errors.push(ValidationError::InvalidAngularTolerance { field, value });
        }
    }
}

fn check_limit<T: PartialEq + Default>(
    field: &'static str,
    value: Option<T>,
    errors: &mut Vec<ValidationError>,
) {
    if value.is_some_and(|v| v == T::default()) {
        errors.push(ValidationError::ZeroLimit { field });
    }
}

/// Validate a loaded configuration.
///
/// # Returns
/// `Ok(())` when the configuration is usable, otherwise every
/// [`ValidationError`] found.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let kernel = &config.kernel;
    if let Some(fuel) = kernel.fuel_level {
        if !(MIN_FUEL_LEVEL..=MAX_FUEL_LEVEL).contains(&fuel) {
            errors.push(ValidationError::FuelOutOfBounds {
                fuel,
                minimum: MIN_FUEL_LEVEL,
                maximum: MAX_FUEL_LEVEL,
            });
        }
    }
    for (variant, path) in [
        ("single", &kernel.single_module),
        ("withExceptions", &kernel.with_exceptions_module),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                errors.push(ValidationError::MissingKernelModule {
                    variant,
                    path: path.clone(),
                });
            }
        }
    }

    let evaluator = &config.evaluator;
    check_limit("evaluator.max_operations", evaluator.max_operations, &mut errors);
    check_limit("evaluator.max_call_levels", evaluator.max_call_levels, &mut errors);
    check_limit("evaluator.max_expr_depth", evaluator.max_expr_depth, &mut errors);
    check_limit("evaluator.max_string_size", evaluator.max_string_size, &mut errors);
    check_limit("evaluator.max_array_size", evaluator.max_array_size, &mut errors);
    check_limit("evaluator.max_map_size", evaluator.max_map_size, &mut errors);

    check_tolerance("preview.tolerance", config.preview.tolerance, &mut errors);
    check_angular_tolerance(
        "preview.angular_tolerance",
        config.preview.angular_tolerance,
        &mut errors,
    );
    check_tolerance("export.tolerance", config.export.tolerance, &mut errors);
    check_angular_tolerance(
        "export.angular_tolerance",
        config.export.angular_tolerance,
        &mut errors,
    );

    if let Some(debounce_ms) = config.orchestrator.debounce_ms {
        if debounce_ms > MAX_DEBOUNCE_MS {
            errors.push(ValidationError::DebounceTooLong {
                debounce_ms,
                maximum_ms: MAX_DEBOUNCE_MS,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
