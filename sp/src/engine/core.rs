//! Engine implementation

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::events::{EventSink, TracingSink};
use crate::pot::{Monitor, PotState, ShutdownHandle};
use crate::worker::{Cook, Savage, SavageOutcome};

use super::config::{EngineConfig, Policy, RunMode};
use super::report::RunReport;

/// One cook, one pot, a fixed tribe of savages
///
/// Owns the monitor every worker shares. Built once, consumed by [`Engine::run`].
pub struct Engine {
    config: EngineConfig,
    monitor: Arc<Monitor>,
    sink: Arc<dyn EventSink>,
}

/// Cancels the run when the owning worker thread unwinds
struct CancelOnPanic(Arc<Monitor>);

impl Drop for CancelOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(worker = ?thread::current().name(), "Engine: worker panicking, cancelling run");
            self.0.cancel();
        }
    }
}

/// Build an engine that logs its events through `tracing`
pub fn create_engine(capacity: usize, savages: usize, fair: bool) -> Result<Engine, EngineError> {
    Engine::new(EngineConfig::new(capacity, savages, Policy::from_fair(fair)))
}

impl Engine {
    /// Create an engine that logs its events through `tracing`
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create an engine that reports its events to `sink`
    pub fn with_sink(config: EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        debug!(?config, "Engine::with_sink: called");
        config.validate()?;
        let state = PotState::new(config.capacity, config.savages, config.policy.is_fair());
        Ok(Self {
            config,
            monitor: Arc::new(Monitor::new(state)),
            sink,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle that cancels the run from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.monitor.clone())
    }

    /// Run every worker until the mode's end condition, then join them all
    pub fn run(self, mode: RunMode) -> Result<RunReport, EngineError> {
        info!(
            capacity = self.config.capacity,
            savages = self.config.savages,
            policy = %self.config.policy,
            %mode,
            "Engine: starting run"
        );
        let started = Instant::now();

        let cook = Cook::new(self.monitor.clone(), self.sink.clone());
        let guard = CancelOnPanic(self.monitor.clone());
        let cook_handle = thread::Builder::new().name("cook".to_string()).spawn(move || {
            let _guard = guard;
            cook.run()
        })?;

        let savage_handles = match self.spawn_savages(mode.quota()) {
            Ok(handles) => handles,
            Err(e) => {
                error!(error = %e, "Engine: failed to spawn savages, cancelling");
                self.monitor.cancel();
                let _ = cook_handle.join();
                return Err(e);
            }
        };

        if let RunMode::Timed(duration) = mode {
            if self.monitor.wait_cancelled(duration) {
                info!("Engine: cancelled before the deadline");
            }
            self.monitor.cancel();
        }

        // A panicking worker cancels the run from its unwinding thread, so
        // every join below returns
        let mut outcomes = Vec::with_capacity(savage_handles.len());
        let mut panicked = None;
        for (id, handle) in savage_handles {
            match handle.join() {
                Ok(outcome) => outcomes.push(outcome),
                Err(_) => {
                    error!(savage = id, "Engine: savage panicked");
                    panicked.get_or_insert_with(|| format!("savage-{}", id));
                }
            }
        }

        // Every savage has left; the cook only stops through cancellation
        self.monitor.cancel();
        let cook_result = cook_handle.join();
        if let Some(worker) = panicked {
            return Err(EngineError::WorkerPanicked { worker });
        }
        let refills = cook_result.map_err(|_| {
            error!("Engine: cook panicked");
            EngineError::WorkerPanicked {
                worker: "cook".to_string(),
            }
        })?;

        let report = self.report(mode, &outcomes, refills, started);
        info!(
            total_bites = report.total_bites,
            refills = report.refills,
            final_servings = report.final_servings,
            cancelled = report.cancelled,
            "Engine: run finished"
        );
        Ok(report)
    }

    fn spawn_savages(&self, quota: Option<u64>) -> Result<Vec<(usize, JoinHandle<SavageOutcome>)>, EngineError> {
        let mut handles = Vec::with_capacity(self.config.savages);
        for id in 1..=self.config.savages {
            let savage = Savage::new(id, self.monitor.clone(), self.sink.clone(), self.config.pause);
            let guard = CancelOnPanic(self.monitor.clone());
            let spawned = thread::Builder::new().name(format!("savage-{}", id)).spawn(move || {
                let _guard = guard;
                savage.run(quota)
            });
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    // Already-running savages leave once the caller cancels
                    self.monitor.cancel();
                    for (_, handle) in handles {
                        let _ = handle.join();
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(handles)
    }

    fn report(&self, mode: RunMode, outcomes: &[SavageOutcome], refills: u64, started: Instant) -> RunReport {
        self.monitor.inspect(|state| {
            assert_eq!(refills, state.generation(), "cook refills disagree with the pot");
            assert_eq!(
                outcomes.iter().map(|o| o.bites).sum::<u64>(),
                state.total_bites(),
                "savage bites disagree with the pot"
            );
            let fairness = state.fairness();
            RunReport {
                policy: self.config.policy,
                mode,
                capacity: self.config.capacity,
                savages: self.config.savages,
                final_servings: state.pot().servings(),
                refills,
                bites_per_savage: state.bites().to_vec(),
                total_bites: state.total_bites(),
                round: fairness.map(|f| f.round()),
                natural_resets: fairness.map(|f| f.natural_resets()).unwrap_or_default(),
                forced_resets: fairness.map(|f| f.forced_resets()).unwrap_or_default(),
                cancelled: matches!(mode, RunMode::Timed(_)) || outcomes.iter().any(|o| o.cancelled),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use std::time::Duration;

    #[test]
    fn test_create_engine_validates() {
        assert!(create_engine(0, 3, false).is_err());
        assert!(create_engine(3, 0, true).is_err());
        assert!(create_engine(5, 7, true).is_ok());
    }

    #[test]
    fn test_single_shot_baseline() {
        let engine = create_engine(5, 7, false).unwrap();
        let report = engine.run(RunMode::SingleShot).unwrap();

        assert_eq!(report.total_bites, 7);
        assert_eq!(report.refills, 1);
        assert_eq!(report.final_servings, 3);
        assert!(report.bites_per_savage.iter().all(|b| *b == 1));
        assert!(!report.cancelled);
        assert_eq!(report.round, None);
    }

    #[test]
    fn test_cancel_before_run_ends_quickly() {
        let sink = Arc::new(RecordingSink::new());
        let engine = Engine::with_sink(EngineConfig::new(2, 4, Policy::Fair), sink).unwrap();
        engine.shutdown_handle().cancel();

        let report = engine.run(RunMode::Bites(100)).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.total_bites, 0);
    }

    /// Panics when savage 1 takes its first serving
    struct PanickingSink;

    impl EventSink for PanickingSink {
        fn record(&self, event: &crate::events::PotEvent) {
            if event.is_bite() && event.savage == Some(1) {
                panic!("sink failure");
            }
        }
    }

    #[test]
    fn test_worker_panic_stops_every_thread() {
        let config = EngineConfig::new(2, 4, Policy::Baseline)
            .with_pause(crate::worker::EatPause::new(Duration::from_millis(1), Duration::ZERO));
        let engine = Engine::with_sink(config, Arc::new(PanickingSink)).unwrap();
        let shutdown = engine.shutdown_handle();

        let started = Instant::now();
        let err = engine.run(RunMode::Bites(u64::MAX)).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        match err {
            EngineError::WorkerPanicked { worker } => assert_eq!(worker, "savage-1"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(shutdown.is_cancelled());
    }

    #[test]
    fn test_timed_run_stops() {
        let config = EngineConfig::new(3, 5, Policy::Fair)
            .with_pause(crate::worker::EatPause::new(Duration::from_millis(1), Duration::ZERO));
        let engine = Engine::new(config).unwrap();

        let started = Instant::now();
        let report = engine.run(RunMode::Timed(Duration::from_millis(100))).unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(report.cancelled);
        assert!(report.total_bites > 0);
        assert!(report.final_servings <= 3);
    }
}
