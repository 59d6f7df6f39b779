// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Thread-backed worker and its RPC handle.
//!
//! Each worker is a dedicated OS thread running a current-thread tokio
//! runtime. Requests arrive over an unbounded channel and are handled one at
//! a time, in order. Every request carries its own `oneshot` reply channel.

use crate::config::Config;
use crate::errors::{WorkerError, WorkerResult};
use crate::export::{ExportArtifact, ExportFormat, MeshConfig};
use crate::kernel::KernelVariant;
use crate::modeling::{EdgeInfo, FaceInfo};
use crate::observability::messages::worker::{RequestReceived, WorkerStarted, WorkerStopped};
use crate::observability::messages::StructuredLog;
use crate::render::GeometryResult;
use crate::traits::{KernelLoader, WorkerRpc, WorkerSpawner};
use crate::worker::protocol::{BuildResult, ParameterInfo, Parameters, WorkerRequest};
use crate::worker::state::WorkerState;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

pub const WORKER_THREAD_NAME: &str = "kernel-worker";

/// Client side of a worker thread.
///
/// Dropping the handle terminates the worker.
pub struct WorkerHandle {
    sender: Mutex<Option<mpsc::UnboundedSender<WorkerRequest>>>,
    abort: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// Start a worker thread with its own kernel sessions and module cache.
    pub fn spawn(config: Arc<Config>, loader: Arc<dyn KernelLoader>) -> WorkerResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WorkerRequest>();
        let abort = Arc::new(AtomicBool::new(false));
        let worker_abort = Arc::clone(&abort);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                WorkerStarted {
                    thread_name: WORKER_THREAD_NAME,
                }
                .log();
                let mut state = WorkerState::new(&config, loader, Arc::clone(&worker_abort));
                let mut requests_handled = 0u64;

                runtime.block_on(async {
                    while let Some(request) = receiver.recv().await {
                        // Requests still queued at termination are dropped unanswered.
                        if worker_abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let message = RequestReceived {
                            operation: request.name(),
                        };
                        message.log();
                        let span = message.span("worker_request");
                        state.handle(request).instrument(span).await;
                        requests_handled += 1;
                    }
                });

                WorkerStopped {
                    thread_name: WORKER_THREAD_NAME,
                    requests_handled,
                }
                .log();
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            abort,
        })
    }

    async fn call<T>(&self, request: impl FnOnce(oneshot::Sender<T>) -> WorkerRequest) -> WorkerResult<T> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(WorkerError::Disconnected)?;
        let (reply, response) = oneshot::channel();
        sender
            .send(request(reply))
            .map_err(|_| WorkerError::Disconnected)?;
        response.await.map_err(|_| WorkerError::Disconnected)
    }
}

#[async_trait]
impl WorkerRpc for WorkerHandle {
    async fn ready(&self) -> WorkerResult<bool> {
        self.call(|reply| WorkerRequest::Ready { reply }).await
    }

    async fn initialize(&self, with_exceptions: bool) -> WorkerResult<KernelVariant> {
        Ok(self
            .call(|reply| WorkerRequest::Initialize {
                with_exceptions,
                reply,
            })
            .await??)
    }

    async fn build_shapes_from_code(
        &self,
        code: String,
        params: Parameters,
    ) -> WorkerResult<BuildResult<Vec<GeometryResult>>> {
        self.call(|reply| WorkerRequest::BuildShapes {
            code,
            params,
            reply,
        })
        .await
    }

    async fn extract_parameters_from_code(
        &self,
        code: String,
    ) -> WorkerResult<BuildResult<ParameterInfo>> {
        self.call(|reply| WorkerRequest::ExtractParameters { code, reply })
            .await
    }

    async fn extract_default_name_from_code(
        &self,
        code: String,
    ) -> WorkerResult<BuildResult<Option<String>>> {
        self.call(|reply| WorkerRequest::ExtractDefaultName { code, reply })
            .await
    }

    async fn extract_schema_from_code(
        &self,
        code: String,
    ) -> WorkerResult<BuildResult<serde_json::Value>> {
        self.call(|reply| WorkerRequest::ExtractSchema { code, reply })
            .await
    }

    async fn export_shape(
        &self,
        format: ExportFormat,
        shape_id: Option<String>,
        mesh_config: Option<MeshConfig>,
    ) -> WorkerResult<Vec<ExportArtifact>> {
        self.call(|reply| WorkerRequest::ExportShape {
            format,
            shape_id,
            mesh_config,
            reply,
        })
        .await?
    }

    async fn face_info(
        &self,
        shape_index: usize,
        face_index: usize,
        shape_id: Option<String>,
    ) -> WorkerResult<Option<FaceInfo>> {
        self.call(|reply| WorkerRequest::FaceInfo {
            shape_index,
            face_index,
            shape_id,
            reply,
        })
        .await
    }

    async fn edge_info(
        &self,
        shape_index: usize,
        edge_index: usize,
        shape_id: Option<String>,
    ) -> WorkerResult<Option<EdgeInfo>> {
        self.call(|reply| WorkerRequest::EdgeInfo {
            shape_index,
            edge_index,
            shape_id,
            reply,
        })
        .await
    }

    async fn toggle_exceptions(&self) -> WorkerResult<KernelVariant> {
        Ok(self
            .call(|reply| WorkerRequest::ToggleExceptions { reply })
            .await??)
    }

    async fn is_exceptions_enabled(&self) -> WorkerResult<bool> {
        self.call(|reply| WorkerRequest::IsExceptionsEnabled { reply })
            .await
    }

    fn terminate(&self) {
        self.abort.store(true, Ordering::SeqCst);
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Spawns [`WorkerHandle`]s sharing one configuration and kernel loader.
pub struct ThreadWorkerSpawner {
    config: Arc<Config>,
    loader: Arc<dyn KernelLoader>,
}

impl ThreadWorkerSpawner {
    pub fn new(config: Arc<Config>, loader: Arc<dyn KernelLoader>) -> Self {
        Self { config, loader }
    }
}

impl WorkerSpawner for ThreadWorkerSpawner {
    fn spawn(&self) -> WorkerResult<Arc<dyn WorkerRpc>> {
        let handle = WorkerHandle::spawn(Arc::clone(&self.config), Arc::clone(&self.loader))?;
        Ok(Arc::new(handle))
    }
}
