// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! State owned by one worker thread and the handlers for every request.
//!
//! Nothing here is shared with other threads: the evaluator, module cache,
//! kernel sessions and the shapes-by-id map live and die with the worker.

use crate::config::Config;
use crate::errors::{EvaluationError, KernelError, WorkerError, WorkerResult};
use crate::evaluator::metadata::{extract_default_name, extract_parameters, extract_schema};
use crate::evaluator::Evaluator;
use crate::export::{export_shapes, ExportArtifact, ExportFormat, MeshConfig};
use crate::kernel::{KernelInitError, KernelSessionManager, KernelVariant};
use crate::modeling::{
    EdgeInfo, FaceInfo, KernelHandle, ModelingLibrary, Shape, Solid, TessellationParams,
};
use crate::observability::messages::worker::{BuildCompleted, BuildFailed, ExportCompleted};
use crate::observability::messages::StructuredLog;
use crate::render::{normalize_with, render_shapes, GeometryResult, NormalizedShape};
use crate::traits::KernelLoader;
use crate::worker::protocol::{BuildResult, ParameterInfo, Parameters, WorkerRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Shape id the latest successful build is stored under.
pub const DEFAULT_SHAPE_ID: &str = "defaultShape";

const DEBUG_COLOR: &str = "#ff0000";
const DEBUG_OPACITY: f64 = 0.5;

pub struct WorkerState {
    evaluator: Evaluator,
    kernels: KernelSessionManager,
    library: ModelingLibrary,
    shapes_by_id: HashMap<String, Vec<NormalizedShape>>,
    preview: TessellationParams,
    export_defaults: MeshConfig,
}

impl WorkerState {
    pub fn new(config: &Config, loader: Arc<dyn KernelLoader>, abort: Arc<AtomicBool>) -> Self {
        Self {
            evaluator: Evaluator::new(&config.evaluator, abort),
            kernels: KernelSessionManager::new(loader),
            library: ModelingLibrary::new(),
            shapes_by_id: HashMap::new(),
            preview: config.preview.tessellation(),
            export_defaults: config.export.mesh_config(),
        }
    }

    pub fn kernels(&self) -> &KernelSessionManager {
        &self.kernels
    }

    pub fn library(&self) -> &ModelingLibrary {
        &self.library
    }

    /// Dispatch one request and send its reply. A dropped receiver is ignored.
    pub async fn handle(&mut self, request: WorkerRequest) {
        match request {
            WorkerRequest::Ready { reply } => {
                let _ = reply.send(true);
            }
            WorkerRequest::Initialize {
                with_exceptions,
                reply,
            } => {
                let _ = reply.send(self.initialize(with_exceptions).await);
            }
            WorkerRequest::BuildShapes {
                code,
                params,
                reply,
            } => {
                let _ = reply.send(self.build_shapes(&code, &params).await);
            }
            WorkerRequest::ExtractParameters { code, reply } => {
                let _ = reply.send(self.extract_parameters(&code).await);
            }
            WorkerRequest::ExtractDefaultName { code, reply } => {
                let _ = reply.send(self.extract_default_name(&code).await);
            }
            WorkerRequest::ExtractSchema { code, reply } => {
                let _ = reply.send(self.extract_schema(&code).await);
            }
            WorkerRequest::ExportShape {
                format,
                shape_id,
                mesh_config,
                reply,
            } => {
                let _ = reply.send(self.export_shape(format, shape_id.as_deref(), mesh_config));
            }
            WorkerRequest::FaceInfo {
                shape_index,
                face_index,
                shape_id,
                reply,
            } => {
                let _ = reply.send(self.face_info(shape_id.as_deref(), shape_index, face_index));
            }
            WorkerRequest::EdgeInfo {
                shape_index,
                edge_index,
                shape_id,
                reply,
            } => {
                let _ = reply.send(self.edge_info(shape_id.as_deref(), shape_index, edge_index));
            }
            WorkerRequest::ToggleExceptions { reply } => {
                let _ = reply.send(self.kernels.toggle_exceptions().await);
            }
            WorkerRequest::IsExceptionsEnabled { reply } => {
                let _ = reply.send(self.kernels.is_exceptions_enabled());
            }
        }
    }

    pub async fn initialize(&self, with_exceptions: bool) -> Result<KernelVariant, KernelInitError> {
        let variant = self.kernels.set_exceptions(with_exceptions).await?;
        self.kernel().await?;
        Ok(variant)
    }

    async fn kernel(&self) -> Result<KernelHandle, KernelInitError> {
        let session = self.kernels.active().await?;
        Ok(self.library.bind(&session))
    }

    async fn kernel_for_build(&self) -> BuildResult<KernelHandle> {
        self.kernel().await.map_err(|e| KernelError::from(&e))
    }

    /// Translate kernel failure codes with the active session when it can.
    fn to_kernel_error(&self, err: &EvaluationError) -> KernelError {
        let session = self.kernels.current();
        KernelError::from_evaluation(err, |code| {
            session
                .as_ref()
                .and_then(|session| session.describe_failure(code))
        })
    }

    pub async fn build_shapes(
        &mut self,
        code: &str,
        params: &Parameters,
    ) -> BuildResult<Vec<GeometryResult>> {
        let started = Instant::now();
        let result = self.run_build(code, params).await;
        match &result {
            Ok(geometry) => BuildCompleted {
                shape_count: geometry.len(),
                duration: started.elapsed(),
            }
            .log(),
            Err(error) => BuildFailed { error }.log(),
        }
        result
    }

    async fn run_build(
        &mut self,
        code: &str,
        params: &Parameters,
    ) -> BuildResult<Vec<GeometryResult>> {
        let kernel = self.kernel_for_build().await?;
        // Leftovers from metadata runs or a failed build.
        self.evaluator.take_debug_shapes();

        let evaluation = self
            .evaluator
            .evaluate(code, &kernel, params)
            .map_err(|e| self.to_kernel_error(&e))?;
        let debug_shapes = self.evaluator.take_debug_shapes();

        let mut built = Vec::new();
        let default_name = evaluation.default_name.as_deref();
        let shapes = normalize_with(evaluation.value, default_name, |mut shapes| {
            built = shapes.clone();
            shapes.extend(debug_shapes.into_iter().enumerate().map(debug_shape));
            shapes
        })
        .map_err(|e| KernelError::from(&e))?;

        let geometry = render_shapes(&shapes, &self.preview);
        self.shapes_by_id.insert(DEFAULT_SHAPE_ID.to_string(), built);
        Ok(geometry)
    }

    pub async fn extract_parameters(&self, code: &str) -> BuildResult<ParameterInfo> {
        let kernel = self.kernel_for_build().await?;
        Ok(extract_parameters(&self.evaluator, code, &kernel))
    }

    pub async fn extract_default_name(&self, code: &str) -> BuildResult<Option<String>> {
        let kernel = self.kernel_for_build().await?;
        Ok(extract_default_name(&self.evaluator, code, &kernel))
    }

    /// The declared schema, or an empty object.
    pub async fn extract_schema(&self, code: &str) -> BuildResult<Value> {
        let kernel = self.kernel_for_build().await?;
        Ok(extract_schema(&self.evaluator, code, &kernel)
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    pub fn export_shape(
        &self,
        format: ExportFormat,
        shape_id: Option<&str>,
        mesh_config: Option<MeshConfig>,
    ) -> WorkerResult<Vec<ExportArtifact>> {
        let shape_id = shape_id.unwrap_or(DEFAULT_SHAPE_ID);
        let shapes = self
            .shapes_by_id
            .get(shape_id)
            .ok_or_else(|| WorkerError::ShapeNotComputed(shape_id.to_string()))?;
        let artifacts = export_shapes(shapes, format, mesh_config.unwrap_or(self.export_defaults))?;
        ExportCompleted {
            format: format.as_str(),
            shape_id,
            artifact_count: artifacts.len(),
        }
        .log();
        Ok(artifacts)
    }

    fn solid(&self, shape_id: Option<&str>, shape_index: usize) -> Option<&Solid> {
        self.shapes_by_id
            .get(shape_id.unwrap_or(DEFAULT_SHAPE_ID))?
            .get(shape_index)?
            .shape
            .as_solid()
    }

    pub fn face_info(
        &self,
        shape_id: Option<&str>,
        shape_index: usize,
        face_index: usize,
    ) -> Option<FaceInfo> {
        self.solid(shape_id, shape_index)?.face_info(face_index)
    }

    pub fn edge_info(
        &self,
        shape_id: Option<&str>,
        shape_index: usize,
        edge_index: usize,
    ) -> Option<EdgeInfo> {
        self.solid(shape_id, shape_index)?.edge_info(edge_index)
    }
}

fn debug_shape((index, shape): (usize, Shape)) -> NormalizedShape {
    NormalizedShape {
        shape,
        name: format!("Debug {}", index),
        color: Some(DEBUG_COLOR.to_string()),
        opacity: Some(DEBUG_OPACITY),
        stroke_type: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::WasmKernelLoader;
    use serde_json::json;

    fn state() -> WorkerState {
        WorkerState::new(
            &Config::default(),
            Arc::new(WasmKernelLoader::builtin()),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_build_stores_default_shape() {
        let mut state = state();
        let geometry = state
            .build_shapes("fn main(k, p) { [makeBox(p.size), drawCircle(2)] }", &params(json!({"size": 3})))
            .await
            .unwrap();
        assert_eq!(geometry.len(), 2);
        assert_eq!(geometry[0].name(), "AnyShape 0");
        assert!(matches!(geometry[1], GeometryResult::Svg(_)));

        assert!(state.face_info(None, 0, 0).is_some());
        assert!(state.face_info(None, 0, 99).is_none());
        // Drawings have no faces to inspect.
        assert!(state.edge_info(None, 1, 0).is_none());
        assert!(state.edge_info(Some("other"), 0, 0).is_none());
    }

    #[tokio::test]
    async fn test_debug_shapes_are_rendered_but_not_stored() {
        let mut state = state();
        let source = r#"
            fn main(k, p) {
                let base = makeBox(4);
                debug(makeSphere(1));
                base
            }
        "#;
        let geometry = state.build_shapes(source, &Parameters::new()).await.unwrap();
        assert_eq!(geometry.len(), 2);
        match &geometry[1] {
            GeometryResult::Mesh(mesh) => {
                assert_eq!(mesh.name, "Debug 0");
                assert_eq!(mesh.color.as_deref(), Some("#ff0000"));
                assert_eq!(mesh.opacity, Some(0.5));
            }
            other => panic!("Expected a debug mesh, got {:?}", other),
        }
        assert!(state.face_info(None, 1, 0).is_none());
    }

    #[tokio::test]
    async fn test_build_failure_keeps_previous_shapes() {
        let mut state = state();
        state
            .build_shapes("fn main(k, p) { makeBox(1) }", &Parameters::new())
            .await
            .unwrap();
        let err = state
            .build_shapes("fn main(k, p) { 42 }", &Parameters::new())
            .await
            .unwrap_err();
        assert!(err.message.contains("Unsupported shape"));
        assert!(state.export_shape(ExportFormat::Stl, None, None).is_ok());
    }

    #[tokio::test]
    async fn test_library_bound_once_across_builds() {
        let mut state = state();
        for _ in 0..3 {
            state
                .build_shapes("fn main(k, p) { makeBox(1) }", &Parameters::new())
                .await
                .unwrap();
        }
        assert_eq!(state.library().bind_count(), 1);
    }

    #[tokio::test]
    async fn test_schema_defaults_to_empty_object() {
        let state = state();
        let schema = state.extract_schema("fn main(k, p) { makeBox(1) }").await.unwrap();
        assert_eq!(schema, json!({}));
    }

    #[tokio::test]
    async fn test_top_level_runs_once_per_build() {
        let mut state = state();
        let source = r#"
            const defaultName = "Widget";
            debug(makeSphere(1));
            fn main(k, p) { makeBox(2) }
        "#;
        let geometry = state.build_shapes(source, &Parameters::new()).await.unwrap();
        let names: Vec<_> = geometry.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["Widget", "Debug 0"]);
        assert!(state.evaluator.take_debug_shapes().is_empty());
    }
}
