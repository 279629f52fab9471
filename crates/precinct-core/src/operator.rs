//! Operator control state for runtime simulation management.
//!
//! This module provides shared state used by the stepping loop and
//! whatever drives it (the engine binary, a signal handler, a control
//! API). The operator can pause/resume, switch turbo mode, change the
//! step interval, queue executions and tunable changes, request a reset,
//! and trigger a clean stop, all without restarting the process.
//!
//! # Architecture
//!
//! Control flags are atomics so the loop reads them without locking on
//! the hot path. The command queues and end reason sit behind
//! [`tokio::sync::Mutex`] because they are only touched between steps.
//! Session bounds (episode window, turbo interval, snapshot cadence) are
//! not held here: the loop reads them from the live configuration, which
//! queued tunables change.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use precinct_types::AgentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, Notify};

pub use crate::config::MAX_STEP_INTERVAL_MS;
use crate::config::WorldConfig;

/// Tunable key whose changes also move the live step interval.
pub const STEP_INTERVAL_KEY: &str = "world.step_interval_ms";

/// Reason why the stepping loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// The session ran its configured number of episodes.
    EpisodeWindowReached,
    /// An operator issued a stop command.
    OperatorStop,
    /// A step failed and the loop halted.
    StepFailed,
}

/// Shared operator control state.
///
/// Wrapped in [`std::sync::Arc`] and shared between the stepping loop and
/// its drivers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether stepping is paused.
    paused: AtomicBool,

    /// Wakes the loop on resume.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Whether a wipe-and-reinitialize has been requested.
    reset_requested: AtomicBool,

    /// Full-speed mode: the turbo interval applies and observers are
    /// notified only every Nth episode.
    turbo: AtomicBool,

    /// Delay between steps in normal mode.
    step_interval_ms: AtomicU64,

    /// Wall-clock time when the loop was created.
    started_at: DateTime<Utc>,

    /// Officers the operator wants executed before the next step.
    executions: Mutex<Vec<AgentId>>,

    /// Tunable changes to apply before the next step, in arrival order.
    tunables: Mutex<Vec<(String, Value)>>,

    /// Reason the loop ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create operator state from configuration.
    pub fn new(world: &WorldConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            reset_requested: AtomicBool::new(false),
            turbo: AtomicBool::new(false),
            step_interval_ms: AtomicU64::new(world.step_interval_ms),
            started_at: Utc::now(),
            executions: Mutex::new(Vec::new()),
            tunables: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether stepping is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause stepping. The loop sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume stepping and wake the loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until stepping is no longer paused or a stop is requested.
    ///
    /// Returns immediately if not paused.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop / Reset
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Request a wipe-and-reinitialize before the next step.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Release);
    }

    /// Check whether a reset is pending.
    pub fn is_reset_requested(&self) -> bool {
        self.reset_requested.load(Ordering::Acquire)
    }

    /// Clear a pending reset, returning whether there was one.
    pub fn take_reset_request(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }

    /// Record the reason the loop ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the loop ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        self.end_reason.lock().await.clone()
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    /// Check whether turbo mode is on.
    pub fn is_turbo(&self) -> bool {
        self.turbo.load(Ordering::Acquire)
    }

    /// Switch turbo mode, returning the previous setting.
    pub fn set_turbo(&self, on: bool) -> bool {
        self.turbo.swap(on, Ordering::AcqRel)
    }

    /// Normal-mode step interval in milliseconds.
    pub fn step_interval_ms(&self) -> u64 {
        self.step_interval_ms.load(Ordering::Acquire)
    }

    /// Set the normal-mode step interval.
    ///
    /// Returns the previous interval, or `None` if `ms` exceeds
    /// [`MAX_STEP_INTERVAL_MS`].
    pub fn set_step_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms > MAX_STEP_INTERVAL_MS {
            return None;
        }
        Some(self.step_interval_ms.swap(ms, Ordering::AcqRel))
    }

    /// The delay the loop should sleep after the current step, given the
    /// configured turbo interval.
    pub fn interval_ms(&self, turbo_interval_ms: u64) -> u64 {
        if self.is_turbo() {
            turbo_interval_ms
        } else {
            self.step_interval_ms()
        }
    }

    // -----------------------------------------------------------------------
    // Timing
    // -----------------------------------------------------------------------

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since the loop was created.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    // -----------------------------------------------------------------------
    // Executions
    // -----------------------------------------------------------------------

    /// Queue an officer for execution before the next step.
    pub async fn queue_execution(&self, id: AgentId) {
        let mut queue = self.executions.lock().await;
        queue.push(id);
    }

    /// Drain all queued executions, oldest first.
    pub async fn drain_executions(&self) -> Vec<AgentId> {
        let mut queue = self.executions.lock().await;
        std::mem::take(&mut *queue)
    }

    // -----------------------------------------------------------------------
    // Tunables
    // -----------------------------------------------------------------------

    /// Queue a tunable change for the loop to apply before the next step.
    ///
    /// The key and value are checked when applied; a rejected change is
    /// logged and the prior value kept.
    pub async fn queue_tunable(&self, key: impl Into<String>, value: Value) {
        let mut queue = self.tunables.lock().await;
        queue.push((key.into(), value));
    }

    /// Drain all queued tunable changes, oldest first.
    pub async fn drain_tunables(&self) -> Vec<(String, Value)> {
        let mut queue = self.tunables.lock().await;
        std::mem::take(&mut *queue)
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn state() -> OperatorState {
        let world = WorldConfig {
            step_interval_ms: 1000,
            turbo_interval_ms: 0,
            ..WorldConfig::default()
        };
        OperatorState::new(&world)
    }

    #[test]
    fn initial_state_is_running() {
        let state = state();
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
        assert!(!state.is_reset_requested());
        assert!(!state.is_turbo());
    }

    #[test]
    fn pause_and_resume() {
        let state = state();
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn reset_request_is_taken_once() {
        let state = state();
        state.request_reset();
        assert!(state.is_reset_requested());
        assert!(state.take_reset_request());
        assert!(!state.take_reset_request());
    }

    #[test]
    fn turbo_switches_the_interval() {
        let state = state();
        assert_eq!(state.interval_ms(5), 1000);
        assert!(!state.set_turbo(true));
        assert_eq!(state.interval_ms(5), 5);
        state.set_turbo(false);
        assert_eq!(state.interval_ms(5), 1000);
    }

    #[test]
    fn reject_oversized_interval() {
        let state = state();
        assert_eq!(state.set_step_interval_ms(20), Some(1000));
        assert!(state.set_step_interval_ms(MAX_STEP_INTERVAL_MS + 1).is_none());
        assert_eq!(state.step_interval_ms(), 20);
    }

    #[tokio::test]
    async fn queue_and_drain_executions() {
        let state = state();
        state.queue_execution(AgentId(3)).await;
        state.queue_execution(AgentId(5)).await;
        assert_eq!(state.drain_executions().await, vec![AgentId(3), AgentId(5)]);
        assert!(state.drain_executions().await.is_empty());
    }

    #[tokio::test]
    async fn queue_and_drain_tunables() {
        let state = state();
        state
            .queue_tunable("schedule.episode_window", Value::from(2))
            .await;
        state.queue_tunable(STEP_INTERVAL_KEY, Value::from("7")).await;

        let drained = state.drain_tunables().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, "schedule.episode_window");
        assert_eq!(drained[1].1, Value::from("7"));
        assert!(state.drain_tunables().await.is_empty());
    }

    #[tokio::test]
    async fn paused_loop_wakes_on_resume() {
        let state = std::sync::Arc::new(state());
        state.pause();
        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move { state.wait_if_paused().await })
        };
        tokio::task::yield_now().await;
        state.resume();
        assert!(waiter.await.is_ok());
    }
}
