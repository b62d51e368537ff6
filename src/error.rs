//! Error types for simulation control operations.
//!
//! All errors are reported synchronously to the caller of the mutating
//! operation; none are fatal to the simulation loop.

use thiserror::Error;

/// Errors produced by [`LoadBalancer`](crate::LoadBalancer) and
/// [`SimulationDriver`](crate::SimulationDriver) control operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// An algorithm name that is not one of the four known strategies.
    #[error("unknown algorithm '{0}' (expected round_robin, least_loaded, weighted, or adaptive)")]
    InvalidAlgorithm(String),

    /// A processor count of zero.
    #[error("invalid processor count {0}: at least one processor is required")]
    InvalidProcessorCount(usize),

    /// Task parameters outside their valid ranges
    /// (load must be in [0, 100], execution time must be positive).
    #[error("invalid task parameters: load={load}, execution_time={execution_time}")]
    InvalidTaskParameters {
        /// Requested load.
        load: f64,
        /// Requested execution time.
        execution_time: f64,
    },

    /// A control command was issued while the driver loop is not running.
    #[error("simulation driver is not running")]
    Inactive,
}
