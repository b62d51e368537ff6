//! Task model.
//!
//! A task is a unit of work with a fixed load demand and a remaining
//! execution time that ticks down while it is owned by a processor.
//! Tasks carry no behavior of their own; identity is by `id`.

use serde::{Deserialize, Serialize};

/// A unit of work to be distributed onto a processor.
///
/// `load` is the demand the task places on a processor's capacity for its
/// whole lifetime and never changes after creation. `remaining_time` starts
/// equal to `execution_time` and decreases by the owning processor's speed
/// each tick; the task is complete once it reaches zero or below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique, monotonically assigned identifier. Never reused.
    pub id: u64,
    /// Fixed capacity demand in [0, 100].
    pub load: f64,
    /// Total work required, in ticks at speed 1.0.
    pub execution_time: f64,
    /// Work left; the task is complete when this drops to <= 0.
    pub remaining_time: f64,
}

impl Task {
    /// Creates a new task with `remaining_time` initialized to
    /// `execution_time`.
    pub fn new(id: u64, load: f64, execution_time: f64) -> Self {
        Self {
            id,
            load,
            execution_time,
            remaining_time: execution_time,
        }
    }

    /// Whether the task has finished executing.
    pub fn is_complete(&self) -> bool {
        self.remaining_time <= 0.0
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}
