//! Read-only observation types.
//!
//! A snapshot is a point-in-time copy of the simulation state, decoupled
//! from the live structures so a presentation layer can poll and render
//! without touching the driver thread's data.

use serde::{Deserialize, Serialize};

use crate::models::Processor;

/// Observable state of a single processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    /// Processor identifier.
    pub id: usize,
    /// Sum of the loads of currently owned tasks.
    pub current_load: f64,
    /// Nominal maximum aggregate load (soft limit).
    pub capacity: f64,
    /// Number of currently owned tasks.
    pub task_count: usize,
    /// Current speed multiplier.
    pub processing_speed: f64,
    /// Load samples, oldest first; at most 100 entries.
    pub history: Vec<f64>,
}

impl From<&Processor> for ProcessorSnapshot {
    fn from(p: &Processor) -> Self {
        Self {
            id: p.id,
            current_load: p.current_load(),
            capacity: p.capacity,
            task_count: p.task_count(),
            processing_speed: p.processing_speed,
            history: p.history().iter().copied().collect(),
        }
    }
}

/// Observable state of the whole simulation at one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Per-processor state, in sequence order.
    pub processors: Vec<ProcessorSnapshot>,
    /// Tasks waiting in the pending queue.
    pub queue_depth: usize,
    /// Total tasks completed since the balancer was created.
    pub completed_tasks: u64,
}

impl SimulationSnapshot {
    /// Mean current load across processors, or 0.0 with no processors.
    pub fn average_load(&self) -> f64 {
        if self.processors.is_empty() {
            return 0.0;
        }
        let total: f64 = self.processors.iter().map(|p| p.current_load).sum();
        total / self.processors.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    #[test]
    fn test_processor_snapshot_copies_state() {
        let mut p = Processor::new(3).with_capacity(80.0).with_speed(1.5);
        p.add_task(Task::new(0, 25.0, 10.0));
        p.process_tick();

        let snap = ProcessorSnapshot::from(&p);
        assert_eq!(snap.id, 3);
        assert!((snap.current_load - 25.0).abs() < 1e-10);
        assert!((snap.capacity - 80.0).abs() < 1e-10);
        assert_eq!(snap.task_count, 1);
        assert!((snap.processing_speed - 1.5).abs() < 1e-10);
        assert_eq!(snap.history, vec![25.0]);
    }

    #[test]
    fn test_average_load() {
        let mut a = Processor::new(0);
        a.add_task(Task::new(0, 40.0, 10.0));
        let mut b = Processor::new(1);
        b.add_task(Task::new(1, 20.0, 10.0));

        let snap = SimulationSnapshot {
            processors: vec![(&a).into(), (&b).into()],
            queue_depth: 0,
            completed_tasks: 0,
        };
        assert!((snap.average_load() - 30.0).abs() < 1e-10);
        assert_eq!(SimulationSnapshot::default().average_load(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let p = Processor::new(0);
        let snap = SimulationSnapshot {
            processors: vec![(&p).into()],
            queue_depth: 2,
            completed_tasks: 7,
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: SimulationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.queue_depth, 2);
        assert_eq!(back.completed_tasks, 7);
        assert_eq!(back.processors.len(), 1);
    }
}
