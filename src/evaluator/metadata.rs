// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declared metadata of a model source.
//!
//! Models may declare `defaultParams`, `defaultName` and `schema` as top-level
//! bindings (inline sources) or exports (module sources). Extraction never
//! fails: anything that cannot be evaluated or converted degrades to an empty
//! value and is logged at debug level.

use crate::evaluator::sandbox::{select_strategy, Evaluator, Strategy};
use crate::modeling::KernelHandle;
use crate::observability::messages::evaluator::MetadataExtractionFailed;
use crate::observability::messages::StructuredLog;
use crate::worker::protocol::{ParameterInfo, Parameters};
use rhai::Dynamic;
use serde_json::{json, Map, Value};

const DEFAULT_PARAMS: &str = "defaultParams";
const DEFAULT_NAME: &str = "defaultName";
const SCHEMA: &str = "schema";

fn declared(
    evaluator: &Evaluator,
    source: &str,
    kernel: &KernelHandle,
    binding: &'static str,
) -> Option<Dynamic> {
    let result = match select_strategy(source) {
        Strategy::Inline => evaluator.inline_binding(source, kernel, binding),
        Strategy::Module => evaluator.compiled_module(source).map(|module| match binding {
            DEFAULT_PARAMS => module.default_params.clone(),
            DEFAULT_NAME => module.default_name.clone().map(Dynamic::from),
            _ => module.schema.clone(),
        }),
    };

    match result {
        Ok(value) => value,
        Err(error) => {
            MetadataExtractionFailed {
                binding,
                error: &error,
            }
            .log();
            None
        }
    }
}

fn to_json(binding: &'static str, value: &Dynamic) -> Option<Value> {
    match rhai::serde::from_dynamic::<Value>(value) {
        Ok(json) => Some(json),
        Err(error) => {
            MetadataExtractionFailed {
                binding,
                error: &error,
            }
            .log();
            None
        }
    }
}

pub fn extract_default_parameters(
    evaluator: &Evaluator,
    source: &str,
    kernel: &KernelHandle,
) -> Parameters {
    declared(evaluator, source, kernel, DEFAULT_PARAMS)
        .and_then(|value| to_json(DEFAULT_PARAMS, &value))
        .and_then(|json| match json {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}

pub fn extract_default_name(
    evaluator: &Evaluator,
    source: &str,
    kernel: &KernelHandle,
) -> Option<String> {
    declared(evaluator, source, kernel, DEFAULT_NAME).and_then(|value| value.into_string().ok())
}

pub fn extract_schema(evaluator: &Evaluator, source: &str, kernel: &KernelHandle) -> Option<Value> {
    declared(evaluator, source, kernel, SCHEMA)
        .and_then(|value| to_json(SCHEMA, &value))
        .filter(Value::is_object)
}

/// Default parameters plus a JSON schema, declared or inferred.
pub fn extract_parameters(
    evaluator: &Evaluator,
    source: &str,
    kernel: &KernelHandle,
) -> ParameterInfo {
    let default_parameters = extract_default_parameters(evaluator, source, kernel);
    let json_schema = extract_schema(evaluator, source, kernel)
        .unwrap_or_else(|| infer_json_schema(&default_parameters));
    ParameterInfo {
        default_parameters,
        json_schema,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn infer_json_schema(defaults: &Parameters) -> Value {
    let properties: Map<String, Value> = defaults
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                json!({ "type": json_type(value), "default": value }),
            )
        })
        .collect();
    json!({ "type": "object", "properties": properties })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluatorConfig;
    use crate::kernel::{KernelVariant, WasmKernelLoader};
    use crate::modeling::ModelingLibrary;
    use crate::traits::KernelLoader;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    async fn setup() -> (Evaluator, KernelHandle) {
        let session = WasmKernelLoader::builtin()
            .instantiate(KernelVariant::Single)
            .await
            .unwrap();
        let kernel = ModelingLibrary::new().bind(&Arc::new(session));
        let evaluator = Evaluator::new(
            &EvaluatorConfig::default(),
            Arc::new(AtomicBool::new(false)),
        );
        (evaluator, kernel)
    }

    #[tokio::test]
    async fn test_inline_metadata() {
        let (evaluator, kernel) = setup().await;
        let source = r#"
            let defaultParams = #{ width: 10, ratio: 0.5, label: "a", hollow: false };
            const defaultName = "Bracket";
            fn main(k, p) { makeBox(p.width) }
        "#;

        let params = extract_default_parameters(&evaluator, source, &kernel);
        assert_eq!(params["width"], json!(10));
        assert_eq!(
            extract_default_name(&evaluator, source, &kernel).as_deref(),
            Some("Bracket")
        );

        let info = extract_parameters(&evaluator, source, &kernel);
        let properties = &info.json_schema["properties"];
        assert_eq!(properties["width"]["type"], "integer");
        assert_eq!(properties["ratio"]["type"], "number");
        assert_eq!(properties["label"]["type"], "string");
        assert_eq!(properties["hollow"]["type"], "boolean");
        assert_eq!(properties["width"]["default"], 10);
    }

    #[tokio::test]
    async fn test_module_metadata_uses_declared_schema() {
        let (evaluator, kernel) = setup().await;
        let source = r#"
            export const defaultParams = #{ size: 3 };
            export const schema = #{ "type": "object", title: "Custom" };
            fn build(p) { makeBox(p.size) }
        "#;
        let info = extract_parameters(&evaluator, source, &kernel);
        assert_eq!(info.default_parameters["size"], json!(3));
        assert_eq!(info.json_schema["title"], "Custom");
        assert_eq!(extract_default_name(&evaluator, source, &kernel), None);
    }

    #[tokio::test]
    async fn test_broken_sources_degrade_to_empty() {
        let (evaluator, kernel) = setup().await;
        let source = "let defaultParams = #{ a: ";
        assert!(extract_default_parameters(&evaluator, source, &kernel).is_empty());
        assert_eq!(extract_schema(&evaluator, source, &kernel), None);

        let info = extract_parameters(&evaluator, source, &kernel);
        assert_eq!(info.json_schema["type"], "object");
    }
}
