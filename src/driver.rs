//! Fixed-tick simulation driver.
//!
//! Runs the simulation loop on one dedicated background thread: generate
//! work, distribute it, advance every processor, publish a snapshot.
//! All balancer mutation happens on that thread; external control arrives
//! as queued commands drained at the top of each tick, so control signals
//! are applied atomically with respect to an in-flight tick.
//!
//! Cancellation is cooperative: an `Active` flag is polled once per
//! iteration, and the loop exits within one tick interval of a stop
//! request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::balancer::LoadBalancer;
use crate::error::SimError;
use crate::generator::{GeneratorConfig, TaskGenerator};
use crate::snapshot::SimulationSnapshot;
use crate::strategy::Algorithm;

/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Callback invoked with a fresh snapshot after every processed tick.
pub type Observer = Arc<dyn Fn(&SimulationSnapshot) + Send + Sync>;

/// Initial simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of processors to create.
    pub num_processors: usize,
    /// Initially selected distribution algorithm.
    pub algorithm: Algorithm,
    /// Length of one simulation tick.
    pub tick_interval: Duration,
    /// Random task source; `None` runs injection-only (deterministic
    /// test scenarios).
    pub generator: Option<GeneratorConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_processors: 4,
            algorithm: Algorithm::RoundRobin,
            tick_interval: DEFAULT_TICK_INTERVAL,
            generator: Some(GeneratorConfig::default()),
        }
    }
}

impl SimulationConfig {
    /// Creates a config with the given processor count and algorithm.
    pub fn new(num_processors: usize, algorithm: Algorithm) -> Self {
        Self {
            num_processors,
            algorithm,
            ..Default::default()
        }
    }

    /// Sets the tick interval.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Sets the random task source.
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Disables random task generation; tasks arrive only via injection.
    pub fn without_generator(mut self) -> Self {
        self.generator = None;
        self
    }
}

/// Control signals delivered to the driver thread between ticks.
enum Command {
    SetAlgorithm(Algorithm),
    SetProcessorCount(usize),
    SetProcessorSpeed(usize, f64),
    SetGenerator(GeneratorConfig),
    InjectTask { load: f64, execution_time: f64 },
    Pause,
    Resume,
    Reset,
}

/// Owns the simulation lifecycle: a background tick loop over a
/// [`LoadBalancer`], with queued control commands and a pollable
/// snapshot.
///
/// # Example
///
/// ```
/// use loadsim::{SimulationConfig, SimulationDriver, Algorithm};
/// use std::time::Duration;
///
/// let config = SimulationConfig::new(3, Algorithm::LeastLoaded)
///     .with_tick_interval(Duration::from_millis(10))
///     .without_generator();
/// let mut driver = SimulationDriver::new(config).unwrap();
/// driver.start().unwrap();
/// driver.inject_task(40.0, 2.0).unwrap();
/// std::thread::sleep(Duration::from_millis(100));
/// assert_eq!(driver.snapshot().completed_tasks, 1);
/// driver.stop();
/// ```
pub struct SimulationDriver {
    config: SimulationConfig,
    observer: Option<Observer>,
    shared: Arc<Mutex<SimulationSnapshot>>,
    active: Arc<AtomicBool>,
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SimulationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationDriver")
            .field("config", &self.config)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl SimulationDriver {
    /// Creates a driver from a config. The loop does not run until
    /// [`start`](Self::start) is called.
    ///
    /// # Errors
    /// `InvalidProcessorCount` if the config asks for zero processors.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        if config.num_processors == 0 {
            return Err(SimError::InvalidProcessorCount(config.num_processors));
        }
        Ok(Self {
            config,
            observer: None,
            shared: Arc::new(Mutex::new(SimulationSnapshot::default())),
            active: Arc::new(AtomicBool::new(false)),
            commands: None,
            worker: None,
        })
    }

    /// Registers a callback invoked with a snapshot after every
    /// processed (non-paused) tick.
    pub fn with_observer(
        mut self,
        observer: impl Fn(&SimulationSnapshot) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Starts the tick loop on a background thread with a fresh
    /// [`LoadBalancer`]. No-op if already running.
    pub fn start(&mut self) -> Result<(), SimError> {
        if self.is_running() {
            return Ok(());
        }
        let balancer = LoadBalancer::new(self.config.num_processors, self.config.algorithm)?;
        let generator = self.config.generator.clone().map(TaskGenerator::new);
        let (tx, rx) = mpsc::channel();
        self.active.store(true, Ordering::SeqCst);
        *self.shared.lock().expect("snapshot lock poisoned") = balancer.snapshot();

        let mut worker = Worker {
            balancer,
            generator,
            paused: false,
            tick: self.config.tick_interval,
            shared: Arc::clone(&self.shared),
            observer: self.observer.clone(),
        };
        let active = Arc::clone(&self.active);
        let handle = thread::Builder::new()
            .name("loadsim-driver".to_string())
            .spawn(move || worker.run(rx, active))
            .expect("failed to spawn simulation thread");

        self.commands = Some(tx);
        self.worker = Some(handle);
        info!(
            processors = self.config.num_processors,
            algorithm = %self.config.algorithm,
            "simulation started"
        );
        Ok(())
    }

    /// Signals the loop to exit and joins the worker thread. The loop
    /// observes the flag within one tick interval.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.commands = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("simulation worker panicked");
            }
            info!("simulation stopped");
        }
    }

    /// Whether the tick loop is currently running.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.worker.is_some()
    }

    /// Selects the distribution algorithm by name.
    ///
    /// Takes effect on the next distribution pass when running; always
    /// recorded for subsequent starts.
    ///
    /// # Errors
    /// `InvalidAlgorithm` for an unknown name.
    pub fn set_algorithm(&mut self, name: &str) -> Result<(), SimError> {
        let algorithm: Algorithm = name.parse()?;
        self.config.algorithm = algorithm;
        if self.is_running() {
            self.send(Command::SetAlgorithm(algorithm))?;
        }
        Ok(())
    }

    /// Resizes the processor set; shrinking re-queues the removed
    /// processors' tasks.
    ///
    /// # Errors
    /// `InvalidProcessorCount` if `count` is zero.
    pub fn set_processor_count(&mut self, count: usize) -> Result<(), SimError> {
        if count == 0 {
            return Err(SimError::InvalidProcessorCount(count));
        }
        self.config.num_processors = count;
        if self.is_running() {
            self.send(Command::SetProcessorCount(count))?;
        }
        Ok(())
    }

    /// Sets one processor's speed multiplier on the running simulation.
    ///
    /// # Errors
    /// `Inactive` if the loop is not running.
    pub fn set_processor_speed(&mut self, processor_id: usize, speed: f64) -> Result<(), SimError> {
        self.send(Command::SetProcessorSpeed(processor_id, speed))
    }

    /// Retunes the random task source (rate, mean load, mean duration).
    pub fn set_generator(&mut self, generator: GeneratorConfig) -> Result<(), SimError> {
        self.config.generator = Some(generator.clone());
        if self.is_running() {
            self.send(Command::SetGenerator(generator))?;
        }
        Ok(())
    }

    /// Enqueues a task directly, bypassing the random generator.
    ///
    /// # Errors
    /// `InvalidTaskParameters` for out-of-range parameters; `Inactive`
    /// if the loop is not running.
    pub fn inject_task(&mut self, load: f64, execution_time: f64) -> Result<(), SimError> {
        LoadBalancer::validate_task_params(load, execution_time)?;
        self.send(Command::InjectTask {
            load,
            execution_time,
        })
    }

    /// Suspends generation, distribution, and processing. The loop keeps
    /// ticking and keeps applying control commands.
    pub fn pause(&mut self) -> Result<(), SimError> {
        self.send(Command::Pause)
    }

    /// Resumes a paused simulation.
    pub fn resume(&mut self) -> Result<(), SimError> {
        self.send(Command::Resume)
    }

    /// Replaces the balancer with a fresh instance of the same processor
    /// count and currently selected algorithm. Restarts the loop if it
    /// had exited.
    pub fn reset(&mut self) -> Result<(), SimError> {
        if self.is_running() {
            self.send(Command::Reset)
        } else {
            self.start()
        }
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> SimulationSnapshot {
        self.shared.lock().expect("snapshot lock poisoned").clone()
    }

    /// Current configuration (kept in sync with runtime control changes).
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn send(&self, command: Command) -> Result<(), SimError> {
        self.commands
            .as_ref()
            .ok_or(SimError::Inactive)?
            .send(command)
            .map_err(|_| SimError::Inactive)
    }
}

impl Drop for SimulationDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the driver thread.
struct Worker {
    balancer: LoadBalancer,
    generator: Option<TaskGenerator>,
    paused: bool,
    tick: Duration,
    shared: Arc<Mutex<SimulationSnapshot>>,
    observer: Option<Observer>,
}

impl Worker {
    fn run(&mut self, commands: Receiver<Command>, active: Arc<AtomicBool>) {
        while active.load(Ordering::SeqCst) {
            let started = Instant::now();

            loop {
                match commands.try_recv() {
                    Ok(command) => self.apply(command),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        active.store(false, Ordering::SeqCst);
                        return;
                    }
                }
            }

            if !self.paused {
                if let Some(generator) = self.generator.as_mut() {
                    if let Some((load, execution_time)) = generator.generate(self.tick) {
                        // Generated parameters are clamped into range, so
                        // rejection here indicates a generator bug.
                        if let Err(err) = self.balancer.add_task(load, execution_time) {
                            warn!(%err, "generated task rejected");
                        }
                    }
                }
                self.balancer.distribute_tasks();
                self.balancer.process_cycle();
            }

            let snapshot = self.balancer.snapshot();
            if !self.paused {
                if let Some(observer) = &self.observer {
                    observer(&snapshot);
                }
            }
            *self.shared.lock().expect("snapshot lock poisoned") = snapshot;

            thread::sleep(self.tick.saturating_sub(started.elapsed()));
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetAlgorithm(algorithm) => self.balancer.set_algorithm(algorithm),
            Command::SetProcessorCount(count) => {
                if let Err(err) = self.balancer.set_processor_count(count) {
                    warn!(%err, "processor count change rejected");
                }
            }
            Command::SetProcessorSpeed(id, speed) => {
                self.balancer.set_processor_speed(id, speed);
            }
            Command::SetGenerator(config) => match self.generator.as_mut() {
                Some(generator) => generator.set_config(config),
                None => self.generator = Some(TaskGenerator::new(config)),
            },
            Command::InjectTask {
                load,
                execution_time,
            } => {
                // Validated at the API edge.
                if let Err(err) = self.balancer.add_task(load, execution_time) {
                    warn!(%err, "injected task rejected");
                }
            }
            Command::Pause => {
                debug!("simulation paused");
                self.paused = true;
            }
            Command::Resume => {
                debug!("simulation resumed");
                self.paused = false;
            }
            Command::Reset => {
                match LoadBalancer::new(self.balancer.processor_count(), self.balancer.algorithm())
                {
                    Ok(fresh) => {
                        debug!("simulation reset");
                        self.balancer = fresh;
                    }
                    Err(err) => warn!(%err, "reset rejected"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST_TICK: Duration = Duration::from_millis(5);

    fn fast_config(num_processors: usize) -> SimulationConfig {
        SimulationConfig::new(num_processors, Algorithm::RoundRobin)
            .with_tick_interval(FAST_TICK)
            .without_generator()
    }

    fn settle() {
        // Generous headroom over the 5 ms tick so command effects land.
        thread::sleep(Duration::from_millis(80));
    }

    #[test]
    fn test_zero_processor_config_rejected() {
        let config = SimulationConfig::new(0, Algorithm::RoundRobin);
        assert_eq!(
            SimulationDriver::new(config).unwrap_err(),
            SimError::InvalidProcessorCount(0)
        );
    }

    #[test]
    fn test_inject_distribute_complete() {
        let mut driver = SimulationDriver::new(fast_config(2)).unwrap();
        driver.start().unwrap();
        driver.inject_task(40.0, 3.0).unwrap();
        settle();

        let snap = driver.snapshot();
        assert_eq!(snap.completed_tasks, 1);
        assert_eq!(snap.queue_depth, 0);
        driver.stop();
        assert!(!driver.is_running());
    }

    #[test]
    fn test_controls_require_running_loop() {
        let mut driver = SimulationDriver::new(fast_config(1)).unwrap();
        assert_eq!(driver.pause().unwrap_err(), SimError::Inactive);
        assert_eq!(driver.inject_task(10.0, 1.0).unwrap_err(), SimError::Inactive);
        // Config-level controls are recorded even while stopped.
        driver.set_algorithm("adaptive").unwrap();
        assert_eq!(driver.config().algorithm, Algorithm::Adaptive);
    }

    #[test]
    fn test_invalid_control_arguments() {
        let mut driver = SimulationDriver::new(fast_config(2)).unwrap();
        driver.start().unwrap();
        assert!(matches!(
            driver.set_algorithm("fastest"),
            Err(SimError::InvalidAlgorithm(_))
        ));
        assert_eq!(
            driver.set_processor_count(0).unwrap_err(),
            SimError::InvalidProcessorCount(0)
        );
        assert!(matches!(
            driver.inject_task(150.0, 1.0),
            Err(SimError::InvalidTaskParameters { .. })
        ));
        driver.stop();
    }

    #[test]
    fn test_pause_skips_processing_but_keeps_ticking() {
        let mut driver = SimulationDriver::new(fast_config(1)).unwrap();
        driver.start().unwrap();
        driver.pause().unwrap();
        settle();
        driver.inject_task(30.0, 1.0).unwrap();
        settle();

        // The injected task reached the balancer queue (commands are
        // still applied) but was neither distributed nor processed.
        let snap = driver.snapshot();
        assert_eq!(snap.queue_depth, 1);
        assert_eq!(snap.completed_tasks, 0);

        driver.resume().unwrap();
        settle();
        let snap = driver.snapshot();
        assert_eq!(snap.queue_depth, 0);
        assert_eq!(snap.completed_tasks, 1);
        driver.stop();
    }

    #[test]
    fn test_runtime_resize_and_speed_change() {
        let mut driver = SimulationDriver::new(fast_config(2)).unwrap();
        driver.start().unwrap();
        driver.set_processor_count(4).unwrap();
        driver.set_processor_speed(0, 2.0).unwrap();
        settle();

        let snap = driver.snapshot();
        assert_eq!(snap.processors.len(), 4);
        assert!((snap.processors[0].processing_speed - 2.0).abs() < 1e-10);
        driver.stop();
    }

    #[test]
    fn test_reset_keeps_count_and_clears_progress() {
        let mut driver = SimulationDriver::new(fast_config(3)).unwrap();
        driver.start().unwrap();
        driver.inject_task(20.0, 1.0).unwrap();
        settle();
        assert_eq!(driver.snapshot().completed_tasks, 1);

        driver.reset().unwrap();
        settle();
        let snap = driver.snapshot();
        assert_eq!(snap.processors.len(), 3);
        assert_eq!(snap.completed_tasks, 0);
        assert_eq!(snap.queue_depth, 0);
        driver.stop();
    }

    #[test]
    fn test_reset_restarts_a_stopped_driver() {
        let mut driver = SimulationDriver::new(fast_config(2)).unwrap();
        driver.start().unwrap();
        driver.stop();
        assert!(!driver.is_running());

        driver.reset().unwrap();
        assert!(driver.is_running());
        driver.inject_task(10.0, 1.0).unwrap();
        settle();
        assert_eq!(driver.snapshot().completed_tasks, 1);
        driver.stop();
    }

    #[test]
    fn test_observer_sees_processed_ticks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut driver = SimulationDriver::new(fast_config(2))
            .unwrap()
            .with_observer(move |snapshot| {
                sink.lock().expect("sink lock poisoned").push(snapshot.completed_tasks);
            });
        driver.start().unwrap();
        driver.inject_task(10.0, 1.0).unwrap();
        settle();
        driver.stop();

        let seen = seen.lock().expect("sink lock poisoned");
        assert!(!seen.is_empty());
        assert_eq!(*seen.last().unwrap(), 1);
    }

    #[test]
    fn test_generator_feeds_the_loop() {
        let config = SimulationConfig::new(2, Algorithm::LeastLoaded)
            .with_tick_interval(FAST_TICK)
            .with_generator(
                GeneratorConfig::default()
                    .with_rate(1000.0)
                    .with_mean_duration(1.0)
                    .with_seed(7),
            );
        let mut driver = SimulationDriver::new(config).unwrap();
        driver.start().unwrap();
        thread::sleep(Duration::from_millis(120));
        driver.stop();

        // Saturated rate: every tick emitted a task, and 1-tick durations
        // mean plenty completed.
        assert!(driver.snapshot().completed_tasks > 0);
    }
}
