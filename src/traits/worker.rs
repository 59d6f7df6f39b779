// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::WorkerResult;
use crate::export::{ExportArtifact, ExportFormat, MeshConfig};
use crate::kernel::KernelVariant;
use crate::modeling::{EdgeInfo, FaceInfo};
use crate::render::GeometryResult;
use crate::worker::protocol::{BuildResult, ParameterInfo, Parameters};

/// The RPC surface of a kernel worker.
///
/// The outer `WorkerResult` reports transport and lifecycle failures only.
/// Failures inside user code come back as the inner `BuildResult` error.
#[async_trait]
pub trait WorkerRpc: Send + Sync {
    async fn ready(&self) -> WorkerResult<bool>;

    async fn initialize(&self, with_exceptions: bool) -> WorkerResult<KernelVariant>;

    async fn build_shapes_from_code(
        &self,
        code: String,
        params: Parameters,
    ) -> WorkerResult<BuildResult<Vec<GeometryResult>>>;

    async fn extract_parameters_from_code(
        &self,
        code: String,
    ) -> WorkerResult<BuildResult<ParameterInfo>>;

    async fn extract_default_name_from_code(
        &self,
        code: String,
    ) -> WorkerResult<BuildResult<Option<String>>>;

    async fn extract_schema_from_code(
        &self,
        code: String,
    ) -> WorkerResult<BuildResult<serde_json::Value>>;

    async fn export_shape(
        &self,
        format: ExportFormat,
        shape_id: Option<String>,
        mesh_config: Option<MeshConfig>,
    ) -> WorkerResult<Vec<ExportArtifact>>;

    async fn face_info(
        &self,
        shape_index: usize,
        face_index: usize,
        shape_id: Option<String>,
    ) -> WorkerResult<Option<FaceInfo>>;

    async fn edge_info(
        &self,
        shape_index: usize,
        edge_index: usize,
        shape_id: Option<String>,
    ) -> WorkerResult<Option<EdgeInfo>>;

    async fn toggle_exceptions(&self) -> WorkerResult<KernelVariant>;

    async fn is_exceptions_enabled(&self) -> WorkerResult<bool>;

    /// Stop the worker. Pending and later calls fail with `Disconnected`.
    fn terminate(&self);
}

/// Starts workers for the build orchestrator.
pub trait WorkerSpawner: Send + Sync {
    fn spawn(&self) -> WorkerResult<Arc<dyn WorkerRpc>>;
}
