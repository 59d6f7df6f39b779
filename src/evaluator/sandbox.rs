// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sandboxed evaluation of user modeling code.
//!
//! User code runs in a Rhai engine with resource limits, no module resolver
//! and an explicit set of bindings: the modeling library, `debug(shape)` and
//! the kernel handle. Two strategies exist, chosen syntactically:
//!
//! * **Inline** - the source is compiled together with a trailer that calls
//!   `main(kernel, params)`. Nothing is cached.
//! * **Module** - sources with a top-level `export` are compiled and their
//!   top-level statements evaluated once into a module, which is cached by
//!   source hash. The entry point is `build(params)`, else `main(kernel, params)`.
//!
//! In both cases `params` is the declared `defaultParams` merged with the
//! caller's parameters, the caller winning on conflicts.

use crate::config::EvaluatorConfig;
use crate::errors::{EvalResult, EvaluationError};
use crate::evaluator::module_cache::{CompiledModule, ModuleCache};
use crate::modeling::{api, KernelHandle, Shape};
use crate::observability::messages::evaluator::{DebugShapeRegistered, EvaluationStarted};
use crate::observability::messages::StructuredLog;
use crate::worker::protocol::Parameters;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{CallFnOptions, Dynamic, Engine, Map, Module, Scope, AST};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Appended to inline sources. `__input_params` is pushed into the scope.
/// Yields `[result, defaultName]` so the name needs no second run.
const INLINE_TRAILER: &str = "[main(kernel, __merge_params(\
if is_def_var(\"defaultParams\") { defaultParams } else { #{} }, __input_params)), \
if is_def_var(\"defaultName\") { defaultName } else { () }]";

const INLINE_ENTRY: &str = "main(kernel, params)";
const MODULE_ENTRY: &str = "build(params) or main(kernel, params)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Inline,
    Module,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Inline => "inline",
            Strategy::Module => "module",
        }
    }
}

/// A source is a module when it has an `export` statement at the top level.
pub fn select_strategy(source: &str) -> Strategy {
    if has_top_level_export(source) {
        Strategy::Module
    } else {
        Strategy::Inline
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scan past comments and string literals, tracking nesting, and look for
/// `export` where a top-level statement begins.
fn has_top_level_export(source: &str) -> bool {
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    let mut depth = 0usize;
    let mut statement_start = true;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i = skip_block_comment(&chars, i);
                continue;
            }
            '"' | '`' | '\'' => {
                i = skip_quoted(&chars, i);
                statement_start = false;
                continue;
            }
            '{' | '(' | '[' => {
                depth += 1;
                statement_start = false;
            }
            '}' | ')' | ']' => {
                depth = depth.saturating_sub(1);
                statement_start = c == '}' && depth == 0;
            }
            ';' => statement_start = depth == 0,
            c if c.is_whitespace() => {}
            c if is_ident_char(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                let is_export = chars[start..i].iter().copied().eq("export".chars());
                if is_export && depth == 0 && statement_start {
                    return true;
                }
                statement_start = false;
                continue;
            }
            _ => statement_start = false,
        }
        i += 1;
    }
    false
}

/// Index just past the block comment starting at `i`. Block comments nest.
fn skip_block_comment(chars: &[char], mut i: usize) -> usize {
    let mut nesting = 0usize;
    while i < chars.len() {
        if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
            nesting += 1;
            i += 2;
        } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
            nesting = nesting.saturating_sub(1);
            i += 2;
            if nesting == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    i
}

/// Index just past the string or character literal starting at `i`.
fn skip_quoted(chars: &[char], mut i: usize) -> usize {
    let quote = chars[i];
    i += 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if quote != '`' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn merge_params(defaults: Option<&Dynamic>, input: Dynamic) -> Dynamic {
    let mut merged = defaults
        .and_then(|d| d.clone().try_cast::<Map>())
        .unwrap_or_default();
    if let Some(input) = input.try_cast::<Map>() {
        merged.extend(input);
    }
    Dynamic::from_map(merged)
}

fn params_to_dynamic(params: &Parameters) -> EvalResult<Dynamic> {
    Ok(rhai::serde::to_dynamic(params)?)
}

/// Result of one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Whatever the entry point returned.
    pub value: Dynamic,
    /// The declared `defaultName`, when it is a string.
    pub default_name: Option<String>,
}

pub struct Evaluator {
    engine: Engine,
    cache: ModuleCache,
    debug_shapes: Arc<Mutex<Vec<Shape>>>,
}

impl Evaluator {
    /// Build an engine with `limits`. Execution stops at the next progress
    /// check once `abort` is set.
    pub fn new(limits: &EvaluatorConfig, abort: Arc<AtomicBool>) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(limits.max_operations());
        engine.set_max_call_levels(limits.max_call_levels());
        engine.set_max_expr_depths(limits.max_expr_depth(), limits.max_expr_depth());
        engine.set_max_string_size(limits.max_string_size());
        engine.set_max_array_size(limits.max_array_size());
        engine.set_max_map_size(limits.max_map_size());
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");

        engine.on_progress(move |_| {
            if abort.load(Ordering::SeqCst) {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });
        engine.on_print(|text| tracing::info!(target: "shapeforge::script", "{}", text));
        engine.on_debug(|text, _source, pos| {
            tracing::debug!(target: "shapeforge::script", line = pos.line().unwrap_or(0), "{}", text)
        });

        api::register(&mut engine);

        let debug_shapes: Arc<Mutex<Vec<Shape>>> = Arc::default();
        let collector = Arc::clone(&debug_shapes);
        engine.register_fn("debug", move |shape: Shape| -> String {
            let mut shapes = collector
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            shapes.push(shape.clone());
            let message = DebugShapeRegistered {
                shape_type: shape.type_name(),
                index: shapes.len() - 1,
            };
            message.to_string()
        });
        engine.register_fn("__merge_params", |defaults: Dynamic, input: Dynamic| {
            merge_params(Some(&defaults), input)
        });

        Self {
            engine,
            cache: ModuleCache::new(),
            debug_shapes,
        }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Run `source` once, returning its entry point's result and declared name.
    pub fn evaluate(
        &self,
        source: &str,
        kernel: &KernelHandle,
        params: &Parameters,
    ) -> EvalResult<Evaluation> {
        let strategy = select_strategy(source);
        EvaluationStarted {
            strategy: strategy.as_str(),
            source_len: source.len(),
            parameter_count: params.len(),
        }
        .log();

        let input = params_to_dynamic(params)?;
        match strategy {
            Strategy::Inline => self.evaluate_inline(source, kernel, input),
            Strategy::Module => self.evaluate_module(source, kernel, input),
        }
    }

    /// Debug shapes registered since the last call.
    pub fn take_debug_shapes(&self) -> Vec<Shape> {
        std::mem::take(
            &mut *self
                .debug_shapes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    fn inline_scope(kernel: &KernelHandle) -> Scope<'static> {
        let mut scope = Scope::new();
        scope.push("kernel", kernel.clone());
        scope
    }

    fn evaluate_inline(
        &self,
        source: &str,
        kernel: &KernelHandle,
        input: Dynamic,
    ) -> EvalResult<Evaluation> {
        let harness = format!("{}\n;\n{}", source, INLINE_TRAILER);
        let ast = self.engine.compile(&harness)?;
        if !defines(&ast, "main", 2) {
            return Err(EvaluationError::MissingEntryPoint {
                expected: INLINE_ENTRY,
            });
        }

        let mut scope = Self::inline_scope(kernel);
        scope.push_constant("__input_params", input);
        let output = self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast)?;

        let mut parts = output.try_cast::<rhai::Array>().unwrap_or_default().into_iter();
        let value = parts.next().unwrap_or(Dynamic::UNIT);
        let default_name = parts.next().and_then(|name| name.into_string().ok());
        Ok(Evaluation {
            value,
            default_name,
        })
    }

    fn evaluate_module(
        &self,
        source: &str,
        kernel: &KernelHandle,
        input: Dynamic,
    ) -> EvalResult<Evaluation> {
        let module = self.compiled_module(source)?;
        let params = merge_params(module.default_params.as_ref(), input);
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let mut scope = Scope::new();

        let result = if module.has_build {
            self.engine.call_fn_with_options::<Dynamic>(
                options,
                &mut scope,
                &module.ast,
                "build",
                (params,),
            )
        } else if module.has_main {
            self.engine.call_fn_with_options::<Dynamic>(
                options,
                &mut scope,
                &module.ast,
                "main",
                (kernel.clone(), params),
            )
        } else {
            return Err(EvaluationError::MissingEntryPoint {
                expected: MODULE_ENTRY,
            });
        };
        Ok(Evaluation {
            value: result?,
            default_name: module.default_name.clone(),
        })
    }

    /// The cached module for `source`, compiling it on first use.
    pub fn compiled_module(&self, source: &str) -> EvalResult<Arc<CompiledModule>> {
        self.cache
            .get_or_build(source, |source| self.compile_module(source))
    }

    fn compile_module(&self, source: &str) -> EvalResult<CompiledModule> {
        let ast = self.engine.compile(source)?;
        let module = Module::eval_ast_as_new(Scope::new(), &ast, &self.engine)?;

        Ok(CompiledModule {
            source: source.to_string(),
            default_params: module.get_var("defaultParams"),
            default_name: module
                .get_var("defaultName")
                .and_then(|name| name.into_string().ok()),
            schema: module.get_var("schema"),
            has_build: defines(&ast, "build", 1),
            has_main: defines(&ast, "main", 2),
            ast,
        })
    }

    /// Value of a top-level binding in an inline source, `None` when unbound.
    pub(crate) fn inline_binding(
        &self,
        source: &str,
        kernel: &KernelHandle,
        name: &str,
    ) -> EvalResult<Option<Dynamic>> {
        let harness = format!(
            "{}\n;\nif is_def_var(\"{name}\") {{ {name} }} else {{ () }}",
            source,
            name = name
        );
        let ast = self.engine.compile(&harness)?;
        let mut scope = Self::inline_scope(kernel);
        let value = self.engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast)?;
        Ok((!value.is_unit()).then_some(value))
    }
}

fn defines(ast: &AST, name: &str, arity: usize) -> bool {
    ast.iter_functions()
        .any(|f| f.name == name && f.params.len() == arity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{KernelVariant, WasmKernelLoader};
    use crate::modeling::ModelingLibrary;
    use crate::traits::KernelLoader;
    use serde_json::json;

    async fn kernel() -> KernelHandle {
        let session = WasmKernelLoader::builtin()
            .instantiate(KernelVariant::Single)
            .await
            .unwrap();
        ModelingLibrary::new().bind(&Arc::new(session))
    }

    fn evaluator() -> (Evaluator, Arc<AtomicBool>) {
        let abort = Arc::new(AtomicBool::new(false));
        (
            Evaluator::new(&EvaluatorConfig::default(), Arc::clone(&abort)),
            abort,
        )
    }

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(select_strategy("fn main(k, p) { 1 }"), Strategy::Inline);
        assert_eq!(
            select_strategy("export const defaultName = \"x\";\nfn build(p) { 1 }"),
            Strategy::Module
        );
        assert_eq!(
            select_strategy("  export let a = 1;"),
            Strategy::Module
        );
        assert_eq!(select_strategy("let exported = 1;"), Strategy::Inline);
        assert_eq!(
            select_strategy("fn build(p) { 1 }\nexport const defaultName = \"x\";"),
            Strategy::Module
        );
    }

    #[test]
    fn test_export_outside_top_level_statements_is_inline() {
        let commented = "/* notes\nexport const size = 1;\n*/\nfn main(k, p) { 1 }";
        assert_eq!(select_strategy(commented), Strategy::Inline);

        let nested_comment = "/* outer /* inner */\nexport let a = 1; */ fn main(k, p) { 1 }";
        assert_eq!(select_strategy(nested_comment), Strategy::Inline);

        let line_comment = "// export let a = 1;\nfn main(k, p) { 1 }";
        assert_eq!(select_strategy(line_comment), Strategy::Inline);

        let in_string = "let note = \"line one\nexport let a = 1;\";\nfn main(k, p) { note }";
        assert_eq!(select_strategy(in_string), Strategy::Inline);

        let in_backticks = "let note = `first\nexport let a = 1`;\nfn main(k, p) { note }";
        assert_eq!(select_strategy(in_backticks), Strategy::Inline);

        let in_body = "fn main(k, p) {\n  export let a = 1;\n  a\n}";
        assert_eq!(select_strategy(in_body), Strategy::Inline);
    }

    #[tokio::test]
    async fn test_commented_export_keeps_inline_defaults() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let source = r#"
            /*
            export const defaultParams = #{ width: 99 };
            */
            let defaultParams = #{ width: 4 };
            const defaultName = "Slab";
            fn main(k, p) { p.width }
        "#;
        let evaluation = evaluator
            .evaluate(source, &kernel, &Parameters::new())
            .unwrap();
        assert_eq!(evaluation.value.as_int().unwrap(), 4);
        assert_eq!(evaluation.default_name.as_deref(), Some("Slab"));
    }

    #[tokio::test]
    async fn test_inline_main_receives_kernel_and_params() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let source = "fn main(k, p) { k.makeBox(p.size) }";
        let result = evaluator
            .evaluate(source, &kernel, &params(json!({"size": 5})))
            .unwrap()
            .value;
        let shape = result.try_cast::<Shape>().unwrap();
        assert!(shape.as_solid().is_some());
    }

    #[tokio::test]
    async fn test_inline_merges_default_params() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let source = r#"
            let defaultParams = #{ width: 1, height: 2 };
            fn main(k, p) { p.width * 10 + p.height }
        "#;
        let result = evaluator
            .evaluate(source, &kernel, &params(json!({"width": 3})))
            .unwrap()
            .value;
        assert_eq!(result.as_int().unwrap(), 32);

        let result = evaluator
            .evaluate("fn main(k, p) { p.len() }", &kernel, &Parameters::new())
            .unwrap()
            .value;
        assert_eq!(result.as_int().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_inline_without_main_is_missing_entry_point() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let err = evaluator
            .evaluate("let x = makeBox(1);", &kernel, &Parameters::new())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MissingEntryPoint { .. }));
    }

    #[tokio::test]
    async fn test_module_build_entry_is_cached() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let source = r#"
            export const defaultParams = #{ radius: 2 };
            export const defaultName = "Peg";
            fn build(p) { makeCylinder(p.radius, 10) }
        "#;
        for _ in 0..3 {
            let result = evaluator
                .evaluate(source, &kernel, &Parameters::new())
                .unwrap()
                .value;
            assert!(result.is::<Shape>());
        }
        assert_eq!(evaluator.cache().compile_count(), 1);

        let module = evaluator.compiled_module(source).unwrap();
        assert!(module.has_build);
        assert_eq!(module.default_name.as_deref(), Some("Peg"));
    }

    #[tokio::test]
    async fn test_module_falls_back_to_main() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let source = "export const size = 1;\nfn main(k, p) { k.variant }";
        let result = evaluator
            .evaluate(source, &kernel, &Parameters::new())
            .unwrap()
            .value;
        assert_eq!(result.into_string().unwrap(), "single");

        let err = evaluator
            .evaluate("export const size = 1;", &kernel, &Parameters::new())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MissingEntryPoint { .. }));
    }

    #[tokio::test]
    async fn test_debug_shapes_are_collected() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let source = "fn main(k, p) { debug(makeSphere(1)); makeBox(1) }";
        evaluator
            .evaluate(source, &kernel, &Parameters::new())
            .unwrap();
        assert_eq!(evaluator.take_debug_shapes().len(), 1);
        assert!(evaluator.take_debug_shapes().is_empty());
    }

    #[tokio::test]
    async fn test_abort_flag_terminates_execution() {
        let (evaluator, abort) = evaluator();
        let kernel = kernel().await;
        abort.store(true, Ordering::SeqCst);
        let err = evaluator
            .evaluate("fn main(k, p) { loop { } }", &kernel, &Parameters::new())
            .unwrap_err();
        assert_eq!(err, EvaluationError::Terminated);
    }

    #[tokio::test]
    async fn test_runaway_script_hits_operation_limit() {
        let abort = Arc::new(AtomicBool::new(false));
        let limits = EvaluatorConfig {
            max_operations: Some(10_000),
            ..Default::default()
        };
        let evaluator = Evaluator::new(&limits, abort);
        let kernel = kernel().await;
        let err = evaluator
            .evaluate("fn main(k, p) { loop { } }", &kernel, &Parameters::new())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Runtime { .. }));
    }

    #[tokio::test]
    async fn test_eval_is_disabled() {
        let (evaluator, _) = evaluator();
        let kernel = kernel().await;
        let err = evaluator
            .evaluate(
                "fn main(k, p) { eval(\"1\") }",
                &kernel,
                &Parameters::new(),
            )
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Compilation { .. }));
    }
}
