// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::Config;
use crate::errors::{KernelError, OrchestratorError, WorkerError, WorkerResult};
use crate::export::{ExportArtifact, ExportFormat, MeshConfig};
use crate::kernel::{KernelVariant, WasmKernelLoader};
use crate::modeling::{EdgeInfo, FaceInfo};
use crate::orchestrator::{BuildPhase, BuildSession, SessionPhase};
use crate::render::{GeometryResult, MeshGeometry};
use crate::traits::{WorkerRpc, WorkerSpawner};
use crate::worker::{BuildResult, ParameterInfo, Parameters, ThreadWorkerSpawner};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::span::{Attributes, Id};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

struct MockWorker {
    healthy: AtomicBool,
    terminated: AtomicBool,
    exceptions: AtomicBool,
    builds: Mutex<Vec<Parameters>>,
}

impl MockWorker {
    fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            terminated: AtomicBool::new(false),
            exceptions: AtomicBool::new(false),
            builds: Mutex::new(Vec::new()),
        }
    }

    fn builds(&self) -> Vec<Parameters> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerRpc for MockWorker {
    async fn ready(&self) -> WorkerResult<bool> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(WorkerError::Disconnected);
        }
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn initialize(&self, with_exceptions: bool) -> WorkerResult<KernelVariant> {
        self.exceptions.store(with_exceptions, Ordering::SeqCst);
        Ok(KernelVariant::from_exceptions(with_exceptions))
    }

    async fn build_shapes_from_code(
        &self,
        code: String,
        params: Parameters,
    ) -> WorkerResult<BuildResult<Vec<GeometryResult>>> {
        self.builds.lock().unwrap().push(params.clone());
        if code.contains("slow") {
            tokio::time::sleep(Duration::from_secs(10)).await;
            if self.terminated.load(Ordering::SeqCst) {
                return Ok(Err(KernelError::unknown("Evaluation terminated")));
            }
        }
        if code.contains("fail") {
            return Ok(Err(KernelError::unknown("boom")));
        }
        let size = params.get("size").cloned().unwrap_or_default();
        Ok(Ok(vec![GeometryResult::Mesh(MeshGeometry {
            name: format!("size {}", size),
            ..Default::default()
        })]))
    }

    async fn extract_parameters_from_code(
        &self,
        _code: String,
    ) -> WorkerResult<BuildResult<ParameterInfo>> {
        Ok(Ok(ParameterInfo {
            default_parameters: params(json!({ "size": 1 })),
            json_schema: json!({}),
        }))
    }

    async fn extract_default_name_from_code(
        &self,
        _code: String,
    ) -> WorkerResult<BuildResult<Option<String>>> {
        Ok(Ok(None))
    }

    async fn extract_schema_from_code(
        &self,
        _code: String,
    ) -> WorkerResult<BuildResult<serde_json::Value>> {
        Ok(Ok(json!({})))
    }

    async fn export_shape(
        &self,
        _format: ExportFormat,
        shape_id: Option<String>,
        _mesh_config: Option<MeshConfig>,
    ) -> WorkerResult<Vec<ExportArtifact>> {
        if self.builds.lock().unwrap().is_empty() {
            return Err(WorkerError::ShapeNotComputed(
                shape_id.unwrap_or_else(|| "defaultShape".to_string()),
            ));
        }
        Ok(vec![ExportArtifact {
            blob: b"solid".to_vec(),
            name: None,
        }])
    }

    async fn face_info(
        &self,
        _shape_index: usize,
        _face_index: usize,
        _shape_id: Option<String>,
    ) -> WorkerResult<Option<FaceInfo>> {
        Ok(None)
    }

    async fn edge_info(
        &self,
        _shape_index: usize,
        _edge_index: usize,
        _shape_id: Option<String>,
    ) -> WorkerResult<Option<EdgeInfo>> {
        Ok(None)
    }

    async fn toggle_exceptions(&self) -> WorkerResult<KernelVariant> {
        let enabled = !self.exceptions.load(Ordering::SeqCst);
        self.exceptions.store(enabled, Ordering::SeqCst);
        Ok(KernelVariant::from_exceptions(enabled))
    }

    async fn is_exceptions_enabled(&self) -> WorkerResult<bool> {
        Ok(self.exceptions.load(Ordering::SeqCst))
    }

    fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockSpawner {
    attempts: AtomicUsize,
    fail: AtomicBool,
    workers: Mutex<Vec<Arc<MockWorker>>>,
}

impl MockSpawner {
    fn spawned(&self) -> Vec<Arc<MockWorker>> {
        self.workers.lock().unwrap().clone()
    }

    fn latest(&self) -> Arc<MockWorker> {
        self.spawned().last().cloned().expect("a spawned worker")
    }
}

impl WorkerSpawner for MockSpawner {
    fn spawn(&self) -> WorkerResult<Arc<dyn WorkerRpc>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(WorkerError::Spawn(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no threads left",
            )));
        }
        let worker = Arc::new(MockWorker::new());
        self.workers.lock().unwrap().push(Arc::clone(&worker));
        Ok(worker)
    }
}

#[derive(Clone, Default)]
struct SpanRecorder {
    spans: Arc<Mutex<Vec<(&'static str, bool)>>>,
}

impl<S: tracing::Subscriber> Layer<S> for SpanRecorder {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        let metadata = attrs.metadata();
        let has_generation = metadata.fields().field("generation").is_some();
        self.spans
            .lock()
            .unwrap()
            .push((metadata.name(), has_generation));
    }
}

fn params(value: serde_json::Value) -> Parameters {
    value.as_object().cloned().unwrap_or_default()
}

fn mock_session() -> (BuildSession, Arc<MockSpawner>) {
    let spawner = Arc::new(MockSpawner::default());
    let session = BuildSession::new(spawner.clone(), &Config::default());
    (session, spawner)
}

const MODEL: &str = "fn main(k, p) { makeBox(p.size) }";

#[tokio::test(start_paused = true)]
async fn test_rapid_mutations_coalesce_into_one_build() {
    let (session, spawner) = mock_session();
    let mut updates = session.subscribe();

    session.set_code(MODEL);
    for size in 1..=5 {
        session.set_parameters(params(json!({ "size": size })));
        assert!(session.state().is_buffering);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    updates
        .wait_for(|state| state.phase == BuildPhase::Succeeded)
        .await
        .unwrap();

    let builds = spawner.latest().builds();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0]["size"], 5);

    let state = session.state();
    assert!(!state.is_buffering);
    assert!(!state.is_computing);
    assert_eq!(state.generation, 1);
    assert_eq!(state.mesh.as_ref().map(|m| m.name()), Some("size 5"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_keeps_previous_mesh() {
    let (session, _spawner) = mock_session();
    let mut updates = session.subscribe();

    session.set_parameters(params(json!({ "size": 2 })));
    session.set_code(MODEL);
    updates
        .wait_for(|state| state.phase == BuildPhase::Succeeded)
        .await
        .unwrap();

    session.set_code("fn main(k, p) { fail() }");
    updates
        .wait_for(|state| state.phase == BuildPhase::Failed)
        .await
        .unwrap();

    let state = session.state();
    assert_eq!(state.error.as_deref(), Some("boom"));
    assert_eq!(state.mesh.as_ref().map(|m| m.name()), Some("size 2"));
    assert!(!state.is_computing);
}

#[tokio::test(start_paused = true)]
async fn test_parameters_without_code_do_not_build() {
    let (session, spawner) = mock_session();
    session.set_parameters(params(json!({ "size": 2 })));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(spawner.attempts.load(Ordering::SeqCst), 0);
    let state = session.state();
    assert!(!state.is_buffering);
    assert_eq!(state.phase, BuildPhase::Idle);
}

#[tokio::test]
async fn test_concurrent_starts_share_one_spawn() {
    let (session, spawner) = mock_session();
    let other = session.clone();

    let (first, second) = tokio::join!(session.start(), other.start());
    first.unwrap();
    second.unwrap();

    assert_eq!(spawner.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(session.state().session, SessionPhase::WorkerReady);
}

#[tokio::test]
async fn test_unresponsive_worker_is_replaced() {
    let (session, spawner) = mock_session();
    session.start().await.unwrap();
    let first = spawner.latest();
    first.healthy.store(false, Ordering::SeqCst);

    let info = session.extract_parameters(MODEL).await.unwrap();
    assert_eq!(info.default_parameters["size"], 1);

    assert_eq!(spawner.spawned().len(), 2);
    assert!(first.terminated.load(Ordering::SeqCst));
    assert!(!spawner.latest().terminated.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_failed_spawn_is_retried_by_next_caller() {
    let (session, spawner) = mock_session();
    spawner.fail.store(true, Ordering::SeqCst);

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Worker(WorkerError::Spawn(_))));
    assert_eq!(session.state().session, SessionPhase::Idle);

    spawner.fail.store(false, Ordering::SeqCst);
    session.start().await.unwrap();
    assert_eq!(spawner.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(spawner.spawned().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_export_errors_are_recorded_in_state() {
    let (session, _spawner) = mock_session();
    let err = session
        .export(ExportFormat::Stl, Some("unknownId".to_string()), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Worker(WorkerError::ShapeNotComputed(_))
    ));
    assert!(session.state().export_error.unwrap().contains("unknownId"));

    let mut updates = session.subscribe();
    session.set_code(MODEL);
    updates
        .wait_for(|state| state.phase == BuildPhase::Succeeded)
        .await
        .unwrap();

    let artifacts = session.export(ExportFormat::Stl, None, None).await.unwrap();
    assert_eq!(artifacts.len(), 1);
    assert!(session.state().export_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_toggle_exceptions_rebuilds_with_new_variant() {
    let (session, spawner) = mock_session();
    let mut updates = session.subscribe();
    session.set_code(MODEL);
    updates
        .wait_for(|state| state.phase == BuildPhase::Succeeded && state.generation == 1)
        .await
        .unwrap();

    let variant = session.toggle_exceptions().await.unwrap();
    assert_eq!(variant, KernelVariant::WithExceptions);
    updates
        .wait_for(|state| state.generation == 2)
        .await
        .unwrap();
    assert_eq!(spawner.latest().builds().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_build_and_allows_restart() {
    let (session, spawner) = mock_session();
    session.start().await.unwrap();
    let first = spawner.latest();

    session.set_code(MODEL);
    session.shutdown().await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(first.builds().is_empty());
    assert!(first.terminated.load(Ordering::SeqCst));
    let state = session.state();
    assert_eq!(state.session, SessionPhase::Idle);
    assert!(!state.is_buffering);

    let mut updates = session.subscribe();
    session.set_code(MODEL);
    updates
        .wait_for(|state| state.phase == BuildPhase::Succeeded)
        .await
        .unwrap();
    assert_eq!(spawner.spawned().len(), 2);
    assert_eq!(spawner.latest().builds().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_response_of_in_flight_build() {
    let (session, spawner) = mock_session();
    let mut updates = session.subscribe();

    session.set_code("fn main(k, p) { slow() }");
    updates
        .wait_for(|state| state.phase == BuildPhase::Evaluating)
        .await
        .unwrap();
    session.shutdown().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(spawner.latest().builds().len(), 1);
    let state = session.state();
    assert_eq!(state.session, SessionPhase::Idle);
    assert_eq!(state.phase, BuildPhase::Idle);
    assert!(state.error.is_none());
    assert!(!state.is_computing);
    assert!(state.mesh.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dispatched_build_runs_inside_build_span() {
    let recorder = SpanRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let (session, _spawner) = mock_session();
    let mut updates = session.subscribe();
    session.set_code(MODEL);
    updates
        .wait_for(|state| state.phase == BuildPhase::Succeeded)
        .await
        .unwrap();

    let spans = recorder.spans.lock().unwrap().clone();
    assert!(spans.contains(&("build", true)), "spans: {:?}", spans);
}

#[tokio::test]
async fn test_session_drives_a_real_worker() {
    let mut config = Config::default();
    config.orchestrator.debounce_ms = Some(10);
    let config = Arc::new(config);
    let spawner = ThreadWorkerSpawner::new(
        Arc::clone(&config),
        Arc::new(WasmKernelLoader::builtin()),
    );
    let session = BuildSession::new(Arc::new(spawner), &config);
    let mut updates = session.subscribe();

    session.set_parameters(params(json!({ "size": 3 })));
    session.set_code(MODEL);
    tokio::time::timeout(
        Duration::from_secs(30),
        updates.wait_for(|state| state.phase == BuildPhase::Succeeded),
    )
    .await
    .expect("build finished in time")
    .unwrap();

    let state = session.state();
    let mesh = state.mesh.as_ref().and_then(|m| m.as_mesh()).expect("mesh");
    assert_eq!(mesh.name, "AnyShape");
    assert!(!mesh.faces.triangles.is_empty());

    let artifacts = session.export(ExportFormat::Step, None, None).await.unwrap();
    assert_eq!(artifacts.len(), 1);
    session.shutdown().await;
}
