//! Load balancer: processor set, pending queue, and per-tick orchestration.
//!
//! The balancer owns the ordered processor sequence and a FIFO queue of
//! tasks awaiting assignment. Each simulation tick drains the queue
//! through the selected [`Algorithm`] and then advances every processor
//! by one tick, retiring completed tasks.
//!
//! All mutation is expected to happen on a single execution context (the
//! driver thread); the balancer itself is plain owned data with no
//! internal locking.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::error::SimError;
use crate::models::{Processor, Task};
use crate::snapshot::SimulationSnapshot;
use crate::strategy::Algorithm;

/// Orchestrates task distribution and per-tick processing over an ordered
/// set of processors.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    processors: Vec<Processor>,
    task_queue: VecDeque<Task>,
    algorithm: Algorithm,
    completed_tasks: u64,
    next_task_id: u64,
}

impl LoadBalancer {
    /// Creates a balancer with `num_processors` default processors.
    ///
    /// # Errors
    /// `InvalidProcessorCount` if `num_processors` is zero.
    pub fn new(num_processors: usize, algorithm: Algorithm) -> Result<Self, SimError> {
        if num_processors == 0 {
            return Err(SimError::InvalidProcessorCount(num_processors));
        }
        Ok(Self {
            processors: (0..num_processors).map(Processor::new).collect(),
            task_queue: VecDeque::new(),
            algorithm,
            completed_tasks: 0,
            next_task_id: 0,
        })
    }

    /// Checks task parameters: load in [0, 100] and a positive finite
    /// execution time.
    pub fn validate_task_params(load: f64, execution_time: f64) -> Result<(), SimError> {
        if !(0.0..=100.0).contains(&load) || !execution_time.is_finite() || execution_time <= 0.0 {
            return Err(SimError::InvalidTaskParameters {
                load,
                execution_time,
            });
        }
        Ok(())
    }

    /// Validates and enqueues a new task, returning its id.
    ///
    /// # Errors
    /// `InvalidTaskParameters` if `load` is outside [0, 100] or
    /// `execution_time` is not a positive finite number.
    pub fn add_task(&mut self, load: f64, execution_time: f64) -> Result<u64, SimError> {
        Self::validate_task_params(load, execution_time)?;
        let id = self.next_task_id;
        self.next_task_id += 1;
        trace!(task_id = id, load, execution_time, "task enqueued");
        self.task_queue.push_back(Task::new(id, load, execution_time));
        Ok(id)
    }

    /// Drains the entire pending queue once, dispatching each task
    /// through the currently selected algorithm.
    ///
    /// With an empty processor set every dequeued task is dropped
    /// silently, matching the permissive reference behavior.
    pub fn distribute_tasks(&mut self) {
        while let Some(task) = self.task_queue.pop_front() {
            match self.algorithm.select(&task, &self.processors) {
                Some(idx) => {
                    trace!(
                        task_id = task.id,
                        processor = self.processors[idx].id,
                        algorithm = %self.algorithm,
                        "task assigned"
                    );
                    self.processors[idx].add_task(task);
                }
                None => {
                    warn!(task_id = task.id, "no processors available, task dropped");
                }
            }
        }
    }

    /// Advances every processor by one tick and returns the tasks that
    /// completed across all of them.
    ///
    /// Idle processors are ticked too so each one gains exactly one
    /// history sample per cycle.
    pub fn process_cycle(&mut self) -> Vec<Task> {
        let mut completed = Vec::new();
        for processor in &mut self.processors {
            completed.extend(processor.process_tick());
        }
        self.completed_tasks += completed.len() as u64;
        if !completed.is_empty() {
            debug!(
                count = completed.len(),
                total = self.completed_tasks,
                "tasks completed"
            );
        }
        completed
    }

    /// Grows or shrinks the processor set.
    ///
    /// Growing appends processors with fresh sequential ids. Shrinking
    /// removes trailing processors and pushes every task they owned back
    /// onto the pending queue for redistribution on the next cycle.
    ///
    /// # Errors
    /// `InvalidProcessorCount` if `count` is zero.
    pub fn set_processor_count(&mut self, count: usize) -> Result<(), SimError> {
        if count == 0 {
            return Err(SimError::InvalidProcessorCount(count));
        }
        let current = self.processors.len();
        if count > current {
            for id in current..count {
                self.processors.push(Processor::new(id));
            }
            debug!(from = current, to = count, "processor set grown");
        } else if count < current {
            let mut requeued = 0;
            for mut retired in self.processors.drain(count..) {
                for task in retired.drain_tasks() {
                    requeued += 1;
                    self.task_queue.push_back(task);
                }
            }
            debug!(from = current, to = count, requeued, "processor set shrunk");
        }
        Ok(())
    }

    /// Sets a processor's speed multiplier. Negative speeds are clamped
    /// to zero; an unknown id is a no-op.
    pub fn set_processor_speed(&mut self, processor_id: usize, speed: f64) {
        if let Some(p) = self.processors.iter_mut().find(|p| p.id == processor_id) {
            p.processing_speed = speed.max(0.0);
        }
    }

    /// Selects the distribution algorithm; takes effect on the next
    /// distribution pass.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        debug!(algorithm = %algorithm, "algorithm changed");
        self.algorithm = algorithm;
    }

    /// Currently selected algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The ordered processor sequence.
    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    /// Number of processors.
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Tasks waiting in the pending queue.
    pub fn queue_depth(&self) -> usize {
        self.task_queue.len()
    }

    /// Total tasks completed since creation.
    pub fn completed_tasks(&self) -> u64 {
        self.completed_tasks
    }

    /// Captures a read-only snapshot of the current state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            processors: self.processors.iter().map(Into::into).collect(),
            queue_depth: self.task_queue.len(),
            completed_tasks: self.completed_tasks,
        }
    }
}
