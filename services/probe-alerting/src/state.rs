//! Per-target alert state

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::endpoint::TargetKey;

/// Alert state of a single target for a single alert condition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetState {
    pub alerted: bool,
    pub failing_since: Option<DateTime<Utc>>,
    pub condition_id: String,
    results: VecDeque<bool>,
}

impl TargetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a probe outcome in a window of the last `total` results,
    /// returning the number of failures currently in the window
    pub fn record(&mut self, success: bool, total: usize, now: DateTime<Utc>) -> u32 {
        self.results.push_back(success);
        while self.results.len() > total {
            self.results.pop_front();
        }

        let failures = self.failures();
        if failures == 0 {
            self.failing_since = None;
        } else if !success && self.failing_since.is_none() {
            self.failing_since = Some(now);
        }
        failures
    }

    /// Number of failures in the current window
    pub fn failures(&self) -> u32 {
        self.results.iter().filter(|ok| !**ok).count() as u32
    }

    /// Return to the not-alerted state once the target recovers
    pub fn reset(&mut self) {
        self.alerted = false;
        self.condition_id.clear();
    }

    /// Not alerted and no failure in the window: indistinguishable from a
    /// fresh state as far as alerting goes
    pub fn is_idle(&self) -> bool {
        !self.alerted && self.failures() == 0
    }
}

/// Target states keyed by [`Endpoint::key`](crate::endpoint::Endpoint::key).
///
/// The lock is held for the whole evaluate-and-notify step so that each
/// target has a single writer at a time. Idle states are evicted, so the
/// store only holds targets that are failing or alerted.
#[derive(Debug, Default)]
pub struct TargetStore {
    targets: Mutex<HashMap<TargetKey, TargetState>>,
}

impl TargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the state for `key`, creating it if
    /// needed. The state is dropped again if `f` leaves it idle.
    pub async fn with_state<R>(
        &self,
        key: &TargetKey,
        f: impl FnOnce(&mut TargetState) -> R,
    ) -> R {
        let mut targets = self.targets.lock().await;
        let state = targets.entry(key.clone()).or_default();
        let result = f(state);
        if state.is_idle() {
            targets.remove(key);
        }
        result
    }

    /// Snapshot of the state for `key`, if the target is failing or alerted
    pub async fn get(&self, key: &TargetKey) -> Option<TargetState> {
        self.targets.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.targets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.targets.lock().await.is_empty()
    }
}
