//! Processor model.
//!
//! A processor owns zero or more tasks, accumulates their load, advances
//! their remaining time each tick, and records a bounded history of its
//! load for observation.
//!
//! Over-subscription is permitted by design: `add_task` performs no
//! capacity check (that is the distribution strategy's responsibility),
//! so `current_load` may exceed `capacity` and `available_capacity()` may
//! go negative.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::Task;

/// Number of load samples retained per processor, oldest evicted first.
pub const HISTORY_CAPACITY: usize = 100;

/// A processing unit that executes tasks at a configurable speed.
///
/// The invariant `current_load == Σ tasks[].load` holds at every
/// observation point; load is updated incrementally on add/remove and is
/// never mutated independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Processor {
    /// Stable identifier, assigned at creation.
    pub id: usize,
    /// Maximum aggregate load this processor nominally holds (soft limit).
    pub capacity: f64,
    /// Speed multiplier; each tick removes this much remaining time from
    /// every owned task. Mutable at any time.
    pub processing_speed: f64,
    current_load: f64,
    tasks: Vec<Task>,
    history: VecDeque<f64>,
}

impl Processor {
    /// Creates a processor with the default capacity of 100 and speed 1.0.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            capacity: 100.0,
            processing_speed: 1.0,
            current_load: 0.0,
            tasks: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the processing speed multiplier.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.processing_speed = speed;
        self
    }

    /// Assigns a task to this processor, unconditionally.
    ///
    /// No capacity check is performed here; callers that care about
    /// capacity (the distribution strategies) check before calling.
    pub fn add_task(&mut self, task: Task) {
        self.current_load += task.load;
        self.tasks.push(task);
    }

    /// Removes the task with the given id if this processor owns it.
    /// No-op otherwise.
    pub fn remove_task(&mut self, task_id: u64) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == task_id)?;
        let task = self.tasks.remove(idx);
        self.current_load -= task.load;
        Some(task)
    }

    /// Advances every owned task by one tick and returns the tasks that
    /// completed.
    ///
    /// Each task's remaining time drops by `processing_speed`, so faster
    /// processors finish tasks in fewer ticks. A history sample is
    /// appended on every call, including when no tasks are owned, so
    /// history stays one-entry-per-tick regardless of activity.
    pub fn process_tick(&mut self) -> Vec<Task> {
        for task in &mut self.tasks {
            task.remaining_time -= self.processing_speed;
        }

        let mut completed = Vec::new();
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].is_complete() {
                let task = self.tasks.remove(i);
                self.current_load -= task.load;
                completed.push(task);
            } else {
                i += 1;
            }
        }

        self.record_history();
        completed
    }

    /// Removes and returns all owned tasks, zeroing the load.
    ///
    /// Used when the processor is retired so its work can be re-queued.
    pub fn drain_tasks(&mut self) -> Vec<Task> {
        self.current_load = 0.0;
        std::mem::take(&mut self.tasks)
    }

    /// `capacity - current_load`; negative when over-subscribed.
    pub fn available_capacity(&self) -> f64 {
        self.capacity - self.current_load
    }

    /// Sum of the loads of all currently owned tasks.
    pub fn current_load(&self) -> f64 {
        self.current_load
    }

    /// Currently owned tasks.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of currently owned tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Recorded load samples, oldest first. At most
    /// [`HISTORY_CAPACITY`] entries.
    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    /// Mean of the most recent `n` history samples, or 0.0 if the history
    /// is empty. Used by the adaptive distribution strategy.
    pub fn recent_average_load(&self, n: usize) -> f64 {
        if self.history.is_empty() || n == 0 {
            return 0.0;
        }
        let start = self.history.len().saturating_sub(n);
        let window = self.history.len() - start;
        self.history.iter().skip(start).sum::<f64>() / window as f64
    }

    fn record_history(&mut self) {
        self.history.push_back(self.current_load);
        if self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_sum(p: &Processor) -> f64 {
        p.tasks().iter().map(|t| t.load).sum()
    }

    #[test]
    fn test_load_invariant_over_add_remove_sequences() {
        let mut p = Processor::new(0);
        for id in 0..20 {
            p.add_task(Task::new(id, (id % 7) as f64 * 3.0 + 1.0, 10.0));
            assert!((p.current_load() - load_sum(&p)).abs() < 1e-9);
        }
        for id in (0..20).step_by(2) {
            p.remove_task(id);
            assert!((p.current_load() - load_sum(&p)).abs() < 1e-9);
        }
        assert_eq!(p.task_count(), 10);
    }

    #[test]
    fn test_remove_absent_task_is_noop() {
        let mut p = Processor::new(0);
        p.add_task(Task::new(1, 30.0, 5.0));
        assert!(p.remove_task(99).is_none());
        assert_eq!(p.task_count(), 1);
        assert!((p.current_load() - 30.0).abs() < 1e-10);
    }

    #[test]
    fn test_over_subscription_allowed() {
        let mut p = Processor::new(0);
        p.add_task(Task::new(1, 80.0, 5.0));
        p.add_task(Task::new(2, 50.0, 5.0));
        assert!((p.current_load() - 130.0).abs() < 1e-10);
        assert!(p.available_capacity() < 0.0);
    }

    #[test]
    fn test_task_completes_after_exact_tick_count() {
        let mut p = Processor::new(0);
        p.add_task(Task::new(1, 20.0, 5.0));
        // Speed 1.0: remaining goes 4, 3, 2, 1, 0 → complete on tick 5.
        for _ in 0..4 {
            assert!(p.process_tick().is_empty());
        }
        let done = p.process_tick();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 1);
        assert_eq!(p.task_count(), 0);
        assert!((p.current_load()).abs() < 1e-10);
    }

    #[test]
    fn test_faster_processor_finishes_sooner() {
        let mut p = Processor::new(0).with_speed(2.5);
        p.add_task(Task::new(1, 20.0, 5.0));
        assert!(p.process_tick().is_empty()); // remaining 2.5
        assert_eq!(p.process_tick().len(), 1); // remaining 0.0
    }

    #[test]
    fn test_idle_tick_appends_history_without_load_change() {
        let mut p = Processor::new(0);
        let before = p.current_load();
        let completed = p.process_tick();
        assert!(completed.is_empty());
        assert_eq!(p.current_load(), before);
        assert_eq!(p.history().len(), 1);
        assert_eq!(p.history()[0], 0.0);
    }

    #[test]
    fn test_history_capped_with_fifo_eviction() {
        let mut p = Processor::new(0);
        // First 3 samples are 0.0, then a task raises the load.
        for _ in 0..3 {
            p.process_tick();
        }
        p.add_task(Task::new(1, 25.0, f64::MAX));
        for _ in 0..HISTORY_CAPACITY {
            p.process_tick();
            assert!(p.history().len() <= HISTORY_CAPACITY);
        }
        assert_eq!(p.history().len(), HISTORY_CAPACITY);
        // The zero-load samples were evicted oldest-first.
        assert!((p.history()[0] - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_history_samples_post_completion_load() {
        let mut p = Processor::new(0);
        p.add_task(Task::new(1, 40.0, 1.0));
        p.process_tick();
        // The sample reflects load after the completed task was removed.
        assert_eq!(p.history().len(), 1);
        assert!((p.history()[0]).abs() < 1e-10);
    }

    #[test]
    fn test_recent_average_load() {
        let mut p = Processor::new(0);
        assert_eq!(p.recent_average_load(10), 0.0);
        p.add_task(Task::new(1, 30.0, f64::MAX));
        for _ in 0..15 {
            p.process_tick();
        }
        assert!((p.recent_average_load(10) - 30.0).abs() < 1e-10);
        // Window shorter than requested uses what exists.
        let mut q = Processor::new(1);
        q.add_task(Task::new(2, 10.0, f64::MAX));
        q.process_tick();
        assert!((q.recent_average_load(10) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_drain_tasks_resets_load() {
        let mut p = Processor::new(0);
        p.add_task(Task::new(1, 30.0, 5.0));
        p.add_task(Task::new(2, 20.0, 5.0));
        let drained = p.drain_tasks();
        assert_eq!(drained.len(), 2);
        assert_eq!(p.task_count(), 0);
        assert!(p.current_load().abs() < 1e-10);
    }
}
