//! Distribution strategies.
//!
//! Four policies for choosing which processor receives a newly queued
//! task. Each variant is a pure function from `(task, processor sequence)`
//! to a processor index, so every algorithm can be unit-tested in
//! isolation.
//!
//! # Selection convention
//!
//! All variants choose exactly one processor. When no processor has
//! sufficient available capacity they still assign to a fallback rather
//! than leaving the task unassigned — once a processor exists, a task is
//! never stuck. Only `round_robin` falls back to a different processor
//! (index 0) than its scan; the other three fall back to their own top
//! pick, so their capacity check never changes the outcome.
//!
//! With an empty processor sequence every variant returns `None` and the
//! caller drops the task.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::models::{Processor, Task};

/// History window used by [`Algorithm::Adaptive`] to estimate recent load.
const ADAPTIVE_WINDOW: usize = 10;

/// A load-distribution policy, selectable by name at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// First processor in sequence order with enough available capacity;
    /// falls back to index 0.
    #[default]
    RoundRobin,
    /// Processor with the minimum current load, first index on ties.
    LeastLoaded,
    /// Processor with the minimum `load / speed` ratio, so faster
    /// processors absorb proportionally more work.
    Weighted,
    /// Score-based pick combining utilization, speed, and recent load
    /// history.
    Adaptive,
}

impl Algorithm {
    /// All variants, in presentation order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::RoundRobin,
        Algorithm::LeastLoaded,
        Algorithm::Weighted,
        Algorithm::Adaptive,
    ];

    /// The wire/control name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round_robin",
            Algorithm::LeastLoaded => "least_loaded",
            Algorithm::Weighted => "weighted",
            Algorithm::Adaptive => "adaptive",
        }
    }

    /// Chooses the processor that should receive `task`.
    ///
    /// Returns `None` only when `processors` is empty.
    pub fn select(&self, task: &Task, processors: &[Processor]) -> Option<usize> {
        match self {
            Algorithm::RoundRobin => round_robin(task, processors),
            Algorithm::LeastLoaded => least_loaded(task, processors),
            Algorithm::Weighted => weighted(task, processors),
            Algorithm::Adaptive => adaptive(task, processors),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Algorithm::RoundRobin),
            "least_loaded" => Ok(Algorithm::LeastLoaded),
            "weighted" => Ok(Algorithm::Weighted),
            "adaptive" => Ok(Algorithm::Adaptive),
            other => Err(SimError::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// Scans processors in sequence order for the first with enough available
/// capacity; assigns to index 0 when none qualifies.
fn round_robin(task: &Task, processors: &[Processor]) -> Option<usize> {
    if processors.is_empty() {
        return None;
    }
    processors
        .iter()
        .position(|p| p.available_capacity() >= task.load)
        .or(Some(0))
}

/// Picks the processor with the minimum current load. The capacity
/// fallback coincides with the primary pick, so the minimum-load
/// processor wins even when over-subscribed.
fn least_loaded(_task: &Task, processors: &[Processor]) -> Option<usize> {
    argmin(processors, |p| p.current_load())
}

/// Picks the processor with the minimum `current_load / processing_speed`
/// ratio. A stopped processor (speed <= 0) scores infinite and is only
/// chosen when every processor is stopped.
fn weighted(_task: &Task, processors: &[Processor]) -> Option<usize> {
    argmin(processors, |p| {
        if p.processing_speed <= 0.0 {
            f64::INFINITY
        } else {
            p.current_load() / p.processing_speed
        }
    })
}

/// Scores each processor by utilization, inverse speed, and the mean of
/// its last 10 history samples, then picks the minimum score.
fn adaptive(_task: &Task, processors: &[Processor]) -> Option<usize> {
    argmin(processors, |p| {
        if p.processing_speed <= 0.0 {
            return f64::INFINITY;
        }
        let recent = p.recent_average_load(ADAPTIVE_WINDOW);
        (p.current_load() / p.capacity) * (1.0 / p.processing_speed) * (1.0 + recent / 200.0)
    })
}

/// Index of the minimum-scoring processor, keeping the first index on
/// ties so selection is stable with respect to sequence order.
fn argmin(processors: &[Processor], score: impl Fn(&Processor) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, p) in processors.iter().enumerate() {
        let s = score(p);
        if best.map_or(true, |(_, b)| s < b) {
            best = Some((idx, s));
        }
    }
    best.map(|(idx, _)| idx)
}
