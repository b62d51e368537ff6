//! Load-balancing simulation engine.
//!
//! Simulates a pool of heterogeneous processors competing for generated
//! work under four interchangeable distribution policies. This crate is
//! the scheduling core only: the data model, the distribution algorithms,
//! and the fixed-tick loop that generates load, assigns it, advances
//! work, and retires completed tasks. Presentation is out of scope — the
//! core exposes read-only snapshots to poll and accepts control signals
//! (algorithm switch, resize, speed change, pause/resume, injection)
//! without any UI coupling.
//!
//! # Modules
//!
//! - **`models`**: leaf types — [`Task`] and [`Processor`] (with bounded
//!   load history)
//! - **`strategy`**: the four [`Algorithm`] variants as pure selection
//!   functions
//! - **`balancer`**: [`LoadBalancer`] — queue, distribution, per-tick
//!   processing
//! - **`generator`**: probabilistic Gaussian task source, seedable
//! - **`driver`**: [`SimulationDriver`] — background tick loop with
//!   queued control commands
//! - **`snapshot`**: read-only observation types
//!
//! # Example
//!
//! ```
//! use loadsim::{Algorithm, LoadBalancer};
//!
//! let mut balancer = LoadBalancer::new(3, Algorithm::LeastLoaded).unwrap();
//! balancer.add_task(40.0, 5.0).unwrap();
//! balancer.distribute_tasks();
//! for _ in 0..5 {
//!     balancer.process_cycle();
//! }
//! assert_eq!(balancer.completed_tasks(), 1);
//! ```
//!
//! This is a discrete-event teaching simulation, not a production
//! scheduler: there is no real OS scheduling, no IO multiplexing, and no
//! persistence.

pub mod balancer;
pub mod driver;
pub mod error;
pub mod generator;
pub mod models;
pub mod snapshot;
pub mod strategy;

pub use balancer::LoadBalancer;
pub use driver::{Observer, SimulationConfig, SimulationDriver, DEFAULT_TICK_INTERVAL};
pub use error::SimError;
pub use generator::{GeneratorConfig, TaskGenerator};
pub use models::{Processor, Task, HISTORY_CAPACITY};
pub use snapshot::{ProcessorSnapshot, SimulationSnapshot};
pub use strategy::Algorithm;
