// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Messages exchanged with the worker thread.
//!
//! Each [`WorkerRequest`] carries a `oneshot` sender for its reply. Build
//! operations reply with a [`BuildResult`], whose error side is the
//! serializable [`KernelError`].

use crate::errors::{KernelError, WorkerResult};
use crate::export::{ExportArtifact, ExportFormat, MeshConfig};
use crate::kernel::error::KernelInitError;
use crate::kernel::KernelVariant;
use crate::modeling::{EdgeInfo, FaceInfo};
use crate::render::GeometryResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

/// Build parameters: a JSON object of primitive values.
pub type Parameters = serde_json::Map<String, Value>;

/// Outcome of an operation that runs user code.
pub type BuildResult<T> = Result<T, KernelError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub default_parameters: Parameters,
    pub json_schema: Value,
}

/// JSON envelope for a [`BuildResult`]: `{success: true, data}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<KernelError>,
}

impl<T> From<BuildResult<T>> for RpcResponse<T> {
    fn from(result: BuildResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                success: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

impl<T> RpcResponse<T> {
    pub fn into_result(self) -> BuildResult<T> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(error)) => Err(error),
            _ => Err(KernelError::unknown("Malformed worker response")),
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

pub enum WorkerRequest {
    Ready {
        reply: Reply<bool>,
    },
    Initialize {
        with_exceptions: bool,
        reply: Reply<Result<KernelVariant, KernelInitError>>,
    },
    BuildShapes {
        code: String,
        params: Parameters,
        reply: Reply<BuildResult<Vec<GeometryResult>>>,
    },
    ExtractParameters {
        code: String,
        reply: Reply<BuildResult<ParameterInfo>>,
    },
    ExtractDefaultName {
        code: String,
        reply: Reply<BuildResult<Option<String>>>,
    },
    ExtractSchema {
        code: String,
        reply: Reply<BuildResult<Value>>,
    },
    ExportShape {
        format: ExportFormat,
        shape_id: Option<String>,
        mesh_config: Option<MeshConfig>,
        reply: Reply<WorkerResult<Vec<ExportArtifact>>>,
    },
    FaceInfo {
        shape_index: usize,
        face_index: usize,
        shape_id: Option<String>,
        reply: Reply<Option<FaceInfo>>,
    },
    EdgeInfo {
        shape_index: usize,
        edge_index: usize,
        shape_id: Option<String>,
        reply: Reply<Option<EdgeInfo>>,
    },
    ToggleExceptions {
        reply: Reply<Result<KernelVariant, KernelInitError>>,
    },
    IsExceptionsEnabled {
        reply: Reply<bool>,
    },
}

impl WorkerRequest {
    /// Operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            WorkerRequest::Ready { .. } => "ready",
            WorkerRequest::Initialize { .. } => "initialize",
            WorkerRequest::BuildShapes { .. } => "buildShapesFromCode",
            WorkerRequest::ExtractParameters { .. } => "extractParametersFromCode",
            WorkerRequest::ExtractDefaultName { .. } => "extractDefaultNameFromCode",
            WorkerRequest::ExtractSchema { .. } => "extractSchemaFromCode",
            WorkerRequest::ExportShape { .. } => "exportShape",
            WorkerRequest::FaceInfo { .. } => "faceInfo",
            WorkerRequest::EdgeInfo { .. } => "edgeInfo",
            WorkerRequest::ToggleExceptions { .. } => "toggleExceptions",
            WorkerRequest::IsExceptionsEnabled { .. } => "isExceptionsEnabled",
        }
    }
}
