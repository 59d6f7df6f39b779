// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_EXPORT_ANGULAR_TOLERANCE, DEFAULT_EXPORT_TOLERANCE,
    DEFAULT_FUEL_LEVEL, DEFAULT_MAX_ARRAY_SIZE, DEFAULT_MAX_CALL_LEVELS, DEFAULT_MAX_EXPR_DEPTH,
    DEFAULT_MAX_MAP_SIZE, DEFAULT_MAX_OPERATIONS, DEFAULT_MAX_STRING_SIZE,
    DEFAULT_PREVIEW_ANGULAR_TOLERANCE, DEFAULT_PREVIEW_TOLERANCE,
};
use crate::errors::ConfigError;
use crate::export::MeshConfig;
use crate::modeling::TessellationParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the evaluation pipeline.
///
/// Every section and every field is optional; missing values fall back to
/// the defaults in [`crate::config::consts`].
///
/// # Example
/// ```yaml
/// kernel:
///   exceptions: true
///   fuel_level: 200000000
///   with_exceptions_module: kernels/diagnostic.wasm
/// evaluator:
///   max_operations: 5000000
/// preview:
///   tolerance: 0.1
///   angular_tolerance: 30
/// export:
///   tolerance: 0.01
/// orchestrator:
///   debounce_ms: 250
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kernel: KernelConfig,
    pub evaluator: EvaluatorConfig,
    pub preview: PreviewConfig,
    pub export: ExportConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Kernel module selection and resource limits.
///
/// # Fields
/// * `single_module` - WASM module for the fast variant (built-in when absent)
/// * `with_exceptions_module` - WASM module for the diagnostic variant (built-in when absent)
/// * `fuel_level` - Fuel granted to each kernel call (defaults to 100M)
/// * `exceptions` - Start with the diagnostic variant active
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub single_module: Option<PathBuf>,
    pub with_exceptions_module: Option<PathBuf>,
    pub fuel_level: Option<u64>,
    pub exceptions: bool,
}

impl KernelConfig {
    pub fn fuel_level(&self) -> u64 {
        self.fuel_level.unwrap_or(DEFAULT_FUEL_LEVEL)
    }
}

/// Resource limits for the script engine running user code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub max_operations: Option<u64>,
    pub max_call_levels: Option<usize>,
    pub max_expr_depth: Option<usize>,
    pub max_string_size: Option<usize>,
    pub max_array_size: Option<usize>,
    pub max_map_size: Option<usize>,
}

impl EvaluatorConfig {
    pub fn max_operations(&self) -> u64 {
        self.max_operations.unwrap_or(DEFAULT_MAX_OPERATIONS)
    }

    pub fn max_call_levels(&self) -> usize {
        self.max_call_levels.unwrap_or(DEFAULT_MAX_CALL_LEVELS)
    }

    pub fn max_expr_depth(&self) -> usize {
        self.max_expr_depth.unwrap_or(DEFAULT_MAX_EXPR_DEPTH)
    }

    pub fn max_string_size(&self) -> usize {
        self.max_string_size.unwrap_or(DEFAULT_MAX_STRING_SIZE)
    }

    pub fn max_array_size(&self) -> usize {
        self.max_array_size.unwrap_or(DEFAULT_MAX_ARRAY_SIZE)
    }

    pub fn max_map_size(&self) -> usize {
        self.max_map_size.unwrap_or(DEFAULT_MAX_MAP_SIZE)
    }
}

/// Tessellation tolerances for preview meshes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub tolerance: Option<f64>,
    pub angular_tolerance: Option<f64>,
}

impl PreviewConfig {
    pub fn tessellation(&self) -> TessellationParams {
        TessellationParams::new(
            self.tolerance.unwrap_or(DEFAULT_PREVIEW_TOLERANCE),
            self.angular_tolerance
                .unwrap_or(DEFAULT_PREVIEW_ANGULAR_TOLERANCE),
        )
    }
}

/// Default tessellation tolerances for exports, used when a request carries
/// no mesh configuration of its own.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub tolerance: Option<f64>,
    pub angular_tolerance: Option<f64>,
}

impl ExportConfig {
    pub fn mesh_config(&self) -> MeshConfig {
        MeshConfig {
            tolerance: self.tolerance.unwrap_or(DEFAULT_EXPORT_TOLERANCE),
            angular_tolerance: self
                .angular_tolerance
                .unwrap_or(DEFAULT_EXPORT_ANGULAR_TOLERANCE),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Quiet period after the last change before a build is dispatched.
    pub debounce_ms: Option<u64>,
}

impl OrchestratorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }
}

/// Load a config from a YAML file. An empty file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}

/// Load a config from a YAML file and validate it.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
kernel:
  exceptions: true
  fuel_level: 200000000
evaluator:
  max_operations: 5000
preview:
  tolerance: 0.5
export:
  angular_tolerance: 15
orchestrator:
  debounce_ms: 50
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.kernel.exceptions);
        assert_eq!(cfg.kernel.fuel_level(), 200_000_000);
        assert_eq!(cfg.evaluator.max_operations(), 5000);
        assert_eq!(cfg.preview.tessellation().tolerance, 0.5);
        assert_eq!(
            cfg.preview.tessellation().angular_tolerance,
            DEFAULT_PREVIEW_ANGULAR_TOLERANCE
        );
        assert_eq!(cfg.export.mesh_config().angular_tolerance, 15.0);
        assert_eq!(cfg.orchestrator.debounce(), Duration::from_millis(50));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let file = write_config("preview:\n  tolerance: 0.2\n");
        let cfg = load_config(file.path()).unwrap();
        assert!(!cfg.kernel.exceptions);
        assert_eq!(cfg.kernel.single_module, None);
        assert_eq!(cfg.kernel.fuel_level(), DEFAULT_FUEL_LEVEL);
        assert_eq!(cfg.evaluator.max_call_levels(), DEFAULT_MAX_CALL_LEVELS);
        assert_eq!(cfg.export.mesh_config(), MeshConfig::default());
        assert_eq!(
            cfg.orchestrator.debounce(),
            Duration::from_millis(DEFAULT_DEBOUNCE_MS)
        );
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.evaluator.max_operations(), DEFAULT_MAX_OPERATIONS);
    }

    #[test]
    fn test_load_and_validate_rejects_invalid_tolerance() {
        let file = write_config("preview:\n  tolerance: -1\n");
        let err = load_and_validate_config(file.path()).unwrap_err();
        match err {
            ConfigError::Invalid(errors) => assert_eq!(errors.len(), 1),
            other => panic!("Expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let file = write_config("kernel: [not, a, map]\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        assert!(matches!(
            load_config("/nonexistent/shapeforge.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
