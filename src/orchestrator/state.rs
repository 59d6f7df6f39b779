// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Snapshot of a build session, published to watchers on every change.

use crate::errors::KernelError;
use crate::render::GeometryResult;

/// Worker lifecycle as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    WorkerStarting,
    WorkerReady,
}

/// Progress of the most recent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildPhase {
    #[default]
    Idle,
    Buffering,
    Evaluating,
    Succeeded,
    Failed,
}

/// Outcome of one dispatched build.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Built(Vec<GeometryResult>),
    Failed(KernelError),
    /// The worker could not be reached.
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct BuildState {
    pub session: SessionPhase,
    pub phase: BuildPhase,
    /// Preview geometry from the last successful build.
    pub mesh: Option<GeometryResult>,
    pub error: Option<String>,
    pub export_error: Option<String>,
    pub is_computing: bool,
    pub is_buffering: bool,
    /// Generation of the last applied response.
    pub generation: u64,
}

impl BuildState {
    pub fn mark_buffering(&mut self) {
        self.is_buffering = true;
        self.phase = BuildPhase::Buffering;
    }

    pub fn mark_dispatched(&mut self) {
        self.is_buffering = false;
        self.is_computing = true;
        self.phase = BuildPhase::Evaluating;
    }

    /// Apply the response for `generation`.
    ///
    /// Returns false when a newer response was already applied; the outcome
    /// is then dropped. `is_computing` stays set only while a build newer
    /// than `generation` is still in flight.
    pub fn complete(
        &mut self,
        generation: u64,
        latest_dispatched: u64,
        outcome: BuildOutcome,
    ) -> bool {
        let stale = generation < self.generation;
        self.generation = self.generation.max(generation);
        self.is_computing = latest_dispatched > self.generation;
        if stale {
            return false;
        }

        match outcome {
            BuildOutcome::Built(geometry) => {
                self.mesh = geometry.into_iter().next();
                self.error = None;
                self.phase = BuildPhase::Succeeded;
            }
            BuildOutcome::Failed(err) => {
                self.error = Some(err.message);
                self.phase = BuildPhase::Failed;
            }
            BuildOutcome::Unavailable(message) => {
                self.error = Some(message);
                self.phase = BuildPhase::Failed;
            }
        }
        if self.is_buffering {
            self.phase = BuildPhase::Buffering;
        }
        true
    }
}
