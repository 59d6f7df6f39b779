// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Build orchestration: worker supervision, debouncing and published state.

pub mod debounce;
pub mod session;
pub mod state;

#[cfg(test)]
mod integration_tests;

pub use debounce::Debouncer;
pub use session::BuildSession;
pub use state::{BuildOutcome, BuildPhase, BuildState, SessionPhase};
