// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Debounced build session over a single kernel worker.
//!
//! Mutations to the code or parameters only mark the session as buffering.
//! Once the configured quiet period passes, one build is dispatched with the
//! latest inputs. Every dispatch takes a generation number; responses are
//! applied in generation order and older ones are dropped.
//!
//! The worker lives in a slot guarded by an async mutex held across spawn and
//! kernel initialization, so concurrent callers share one spawn. Before each
//! reuse the worker is health-checked with `ready()` and replaced if it fails.

use crate::config::Config;
use crate::errors::{OrchestratorError, WorkerError};
use crate::export::{ExportArtifact, ExportFormat, MeshConfig};
use crate::kernel::KernelVariant;
use crate::modeling::{EdgeInfo, FaceInfo};
use crate::observability::messages::orchestrator::{
    BuildDispatchFailed, BuildDispatched, ExportFailed, SessionShutDown, StaleResponseDiscarded,
    WorkerSpawned, WorkerUnresponsive,
};
use crate::observability::messages::StructuredLog;
use crate::orchestrator::debounce::Debouncer;
use crate::orchestrator::state::{BuildOutcome, BuildPhase, BuildState, SessionPhase};
use crate::traits::{WorkerRpc, WorkerSpawner};
use crate::worker::{ParameterInfo, Parameters};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Default)]
struct PendingInput {
    code: Option<String>,
    params: Parameters,
}

struct SessionInner {
    spawner: Arc<dyn WorkerSpawner>,
    worker: tokio::sync::Mutex<Option<Arc<dyn WorkerRpc>>>,
    state: watch::Sender<BuildState>,
    input: Mutex<PendingInput>,
    debouncer: Debouncer,
    lifetime: Mutex<CancellationToken>,
    with_exceptions: AtomicBool,
    latest_dispatched: AtomicU64,
}

/// Owns the worker for one editor and publishes its [`BuildState`].
///
/// Cloning is cheap and clones share the same session.
#[derive(Clone)]
pub struct BuildSession {
    inner: Arc<SessionInner>,
}

impl BuildSession {
    pub fn new(spawner: Arc<dyn WorkerSpawner>, config: &Config) -> Self {
        let (state, _) = watch::channel(BuildState::default());
        Self {
            inner: Arc::new(SessionInner {
                spawner,
                worker: tokio::sync::Mutex::new(None),
                state,
                input: Mutex::new(PendingInput::default()),
                debouncer: Debouncer::new(config.orchestrator.debounce()),
                lifetime: Mutex::new(CancellationToken::new()),
                with_exceptions: AtomicBool::new(config.kernel.exceptions),
                latest_dispatched: AtomicU64::new(0),
            }),
        }
    }

    /// Spawn and initialize the worker ahead of the first build.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        self.inner.acquire_worker().await.map(|_| ())
    }

    pub fn subscribe(&self) -> watch::Receiver<BuildState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> BuildState {
        self.inner.state.borrow().clone()
    }

    /// Replace the model source. Must be called within a tokio runtime.
    pub fn set_code(&self, code: impl Into<String>) {
        self.inner.lock_input().code = Some(code.into());
        self.schedule_build();
    }

    pub fn set_parameters(&self, params: Parameters) {
        self.inner.lock_input().params = params;
        self.schedule_build();
    }

    fn schedule_build(&self) {
        self.inner.state.send_modify(BuildState::mark_buffering);
        let inner = Arc::clone(&self.inner);
        let lifetime = self.inner.lifetime_token();
        let build_lifetime = lifetime.clone();
        self.inner.debouncer.schedule(&lifetime, async move {
            inner.dispatch_build(build_lifetime).await
        });
    }

    pub async fn extract_parameters(
        &self,
        code: impl Into<String>,
    ) -> Result<ParameterInfo, OrchestratorError> {
        let worker = self.inner.acquire_worker().await?;
        Ok(worker.extract_parameters_from_code(code.into()).await??)
    }

    /// Export the latest build. Failures are also recorded in
    /// [`BuildState::export_error`].
    pub async fn export(
        &self,
        format: ExportFormat,
        shape_id: Option<String>,
        mesh_config: Option<MeshConfig>,
    ) -> Result<Vec<ExportArtifact>, OrchestratorError> {
        let result = match self.inner.acquire_worker().await {
            Ok(worker) => worker
                .export_shape(format, shape_id, mesh_config)
                .await
                .map_err(OrchestratorError::from),
            Err(err) => Err(err),
        };

        match &result {
            Ok(_) => self.inner.state.send_modify(|state| state.export_error = None),
            Err(err) => {
                ExportFailed {
                    format: format.as_str(),
                    error: err,
                }
                .log();
                let message = err.to_string();
                self.inner
                    .state
                    .send_modify(|state| state.export_error = Some(message));
            }
        }
        result
    }

    /// Switch the kernel variant and rebuild the current code with it.
    pub async fn toggle_exceptions(&self) -> Result<KernelVariant, OrchestratorError> {
        let worker = self.inner.acquire_worker().await?;
        let variant = worker.toggle_exceptions().await?;
        self.inner
            .with_exceptions
            .store(variant.has_exceptions(), Ordering::SeqCst);

        if self.inner.lock_input().code.is_some() {
            self.schedule_build();
        }
        Ok(variant)
    }

    pub async fn face_info(
        &self,
        shape_index: usize,
        face_index: usize,
        shape_id: Option<String>,
    ) -> Result<Option<FaceInfo>, OrchestratorError> {
        let worker = self.inner.acquire_worker().await?;
        Ok(worker.face_info(shape_index, face_index, shape_id).await?)
    }

    pub async fn edge_info(
        &self,
        shape_index: usize,
        edge_index: usize,
        shape_id: Option<String>,
    ) -> Result<Option<EdgeInfo>, OrchestratorError> {
        let worker = self.inner.acquire_worker().await?;
        Ok(worker.edge_info(shape_index, edge_index, shape_id).await?)
    }

    /// Cancel any pending build and terminate the worker. The session can be
    /// started again afterwards.
    pub async fn shutdown(&self) {
        self.inner.debouncer.cancel();
        let previous = {
            let mut lifetime = self
                .inner
                .lifetime
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *lifetime, CancellationToken::new())
        };
        previous.cancel();

        let worker = self.inner.worker.lock().await.take();
        let had_worker = worker.is_some();
        if let Some(worker) = worker {
            worker.terminate();
        }

        self.inner.state.send_modify(|state| {
            state.session = SessionPhase::Idle;
            state.is_buffering = false;
            state.is_computing = false;
            if matches!(state.phase, BuildPhase::Buffering | BuildPhase::Evaluating) {
                state.phase = BuildPhase::Idle;
            }
        });
        SessionShutDown { had_worker }.log();
    }
}

impl SessionInner {
    fn lock_input(&self) -> std::sync::MutexGuard<'_, PendingInput> {
        self.input
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lifetime_token(&self) -> CancellationToken {
        self.lifetime
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_session_phase(&self, phase: SessionPhase) {
        self.state.send_modify(|state| state.session = phase);
    }

    /// Return a healthy worker, spawning one if the slot is empty or the
    /// current worker fails its health check.
    async fn acquire_worker(&self) -> Result<Arc<dyn WorkerRpc>, OrchestratorError> {
        let mut slot = self.worker.lock().await;

        let mut unresponsive = None;
        if let Some(worker) = slot.as_ref() {
            match worker.ready().await {
                Ok(true) => return Ok(Arc::clone(worker)),
                Ok(false) => unresponsive = Some("worker reported it is not ready".to_string()),
                Err(err) => unresponsive = Some(err.to_string()),
            }
        }
        if let Some(reason) = &unresponsive {
            WorkerUnresponsive { reason }.log();
            if let Some(worker) = slot.take() {
                worker.terminate();
            }
        }

        self.set_session_phase(SessionPhase::WorkerStarting);
        match self.spawn_worker().await {
            Ok(worker) => {
                *slot = Some(Arc::clone(&worker));
                self.set_session_phase(SessionPhase::WorkerReady);
                Ok(worker)
            }
            Err(err) => {
                self.set_session_phase(SessionPhase::Idle);
                Err(match unresponsive {
                    Some(reason) => WorkerError::Unresponsive(reason).into(),
                    None => err,
                })
            }
        }
    }

    async fn spawn_worker(&self) -> Result<Arc<dyn WorkerRpc>, OrchestratorError> {
        let worker = self.spawner.spawn()?;
        let with_exceptions = self.with_exceptions.load(Ordering::SeqCst);
        match worker.initialize(with_exceptions).await {
            Ok(variant) => {
                WorkerSpawned {
                    variant: variant.as_str(),
                }
                .log();
                Ok(worker)
            }
            Err(err) => {
                worker.terminate();
                Err(err.into())
            }
        }
    }

    /// Build the latest input under `lifetime`. A response that arrives after
    /// `lifetime` was cancelled by [`BuildSession::shutdown`] is dropped.
    async fn dispatch_build(&self, lifetime: CancellationToken) {
        if lifetime.is_cancelled() {
            return;
        }
        let (code, params) = {
            let input = self.lock_input();
            (input.code.clone(), input.params.clone())
        };
        let Some(code) = code else {
            self.state.send_modify(|state| {
                state.is_buffering = false;
                state.phase = BuildPhase::Idle;
            });
            return;
        };

        let generation = self.latest_dispatched.fetch_add(1, Ordering::SeqCst) + 1;
        let message = BuildDispatched {
            generation,
            parameter_count: params.len(),
        };
        message.log();
        self.state.send_modify(BuildState::mark_dispatched);

        let outcome = self
            .run_build(generation, code, params)
            .instrument(message.span("dispatch_build"))
            .await;

        if lifetime.is_cancelled() {
            return;
        }
        let latest_dispatched = self.latest_dispatched.load(Ordering::SeqCst);
        let mut superseded_by = None;
        self.state.send_modify(|state| {
            let latest = state.generation;
            if !state.complete(generation, latest_dispatched, outcome) {
                superseded_by = Some(latest);
            }
        });
        if let Some(latest) = superseded_by {
            StaleResponseDiscarded { generation, latest }.log();
        }
    }

    async fn run_build(&self, generation: u64, code: String, params: Parameters) -> BuildOutcome {
        let result = match self.acquire_worker().await {
            Ok(worker) => match worker.build_shapes_from_code(code, params).await {
                Ok(Ok(geometry)) => return BuildOutcome::Built(geometry),
                Ok(Err(err)) => return BuildOutcome::Failed(err),
                Err(err) => OrchestratorError::from(err),
            },
            Err(err) => err,
        };
        BuildDispatchFailed {
            generation,
            error: &result,
        }
        .log();
        BuildOutcome::Unavailable(result.to_string())
    }
}
