//! Simulation domain models.
//!
//! The two leaf types of the simulation: [`Task`], an immutable-identity
//! unit of work, and [`Processor`], which owns tasks and advances them
//! each tick while recording a bounded load history.

mod processor;
mod task;

pub use processor::{Processor, HISTORY_CAPACITY};
pub use task::Task;
