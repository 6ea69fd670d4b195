//! Shared fixtures for lifecycle BDD scenarios.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use lightsail_machine::test_support::{FakeKeygen, FakeLightsail};
use lightsail_machine::{MachineConfig, MachineDriver};
use rstest::fixture;
use tempfile::TempDir;

/// Result of the most recent `When` step.
#[derive(Clone, Debug)]
pub enum LifecycleOutcome {
    Success,
    Failure(String),
}

/// Scenario state shared by reference between steps. The provider double
/// already shares its state across clones; configuration and outcome are
/// updated in place.
#[derive(Debug)]
pub struct LifecycleContext {
    pub api: FakeLightsail,
    pub config: RefCell<MachineConfig>,
    pub outcome: RefCell<Option<LifecycleOutcome>>,
    _store: TempDir,
}

impl LifecycleContext {
    pub fn driver(&self) -> MachineDriver<FakeLightsail, FakeKeygen> {
        MachineDriver::new(
            self.api.clone(),
            FakeKeygen::new(),
            self.config.borrow().clone(),
        )
    }

    pub fn configure(&self, update: impl FnOnce(&mut MachineConfig)) {
        update(&mut self.config.borrow_mut());
    }

    pub fn record<E: std::fmt::Display>(&self, result: Result<(), E>) {
        *self.outcome.borrow_mut() = Some(match result {
            Ok(()) => LifecycleOutcome::Success,
            Err(err) => LifecycleOutcome::Failure(err.to_string()),
        });
    }
}

/// Runs `future` on a paused current-thread runtime so readiness polling
/// advances virtual time only.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap_or_else(|err| panic!("tokio runtime should build: {err}"));
    runtime.block_on(future)
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
    let mut config = MachineConfig::with_defaults("dev");
    config.store_path = root.to_string();
    config.poll_interval_secs = 1;
    config.wait_timeout_secs = 20;
    LifecycleContext {
        api: FakeLightsail::new(),
        config: RefCell::new(config),
        outcome: RefCell::new(None),
        _store: tmp,
    }
}
