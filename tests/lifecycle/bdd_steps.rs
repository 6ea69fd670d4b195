//! BDD step definitions for the machine lifecycle.

use lightsail_machine::PortRange;
use lightsail_machine::ProviderErrorKind;
use lightsail_machine::test_support::FakeOp;
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{LifecycleContext, LifecycleOutcome, block_on};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a machine named \"{name}\" in region \"{region}\" zone \"{zone}\"")]
fn machine_in_zone(
    lifecycle_context: &LifecycleContext,
    name: String,
    region: String,
    zone: String,
) {
    lifecycle_context.configure(|config| {
        config.machine_name = name;
        config.region = region;
        config.zone = zone;
    });
}

#[given("the machine uses bundle \"{bundle}\" and blueprint \"{blueprint}\"")]
fn machine_catalog(lifecycle_context: &LifecycleContext, bundle: String, blueprint: String) {
    lifecycle_context.configure(|config| {
        config.bundle = bundle;
        config.blueprint = blueprint;
    });
}

#[given("the instance never reaches the running state")]
fn never_running(lifecycle_context: &LifecycleContext) {
    lifecycle_context.api.set_boot_polls(u32::MAX);
}

#[given("opening the engine port fails")]
fn port_open_fails(lifecycle_context: &LifecycleContext) {
    lifecycle_context
        .api
        .fail(FakeOp::OpenPorts, ProviderErrorKind::Other, "firewall is locked");
}

#[given("the machine has been created")]
fn machine_created(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let driver = lifecycle_context.driver();
    block_on(driver.create())
        .map(|_| ())
        .map_err(|err| StepError::Assertion(format!("create should succeed: {err}")))
}

#[given("the instance and key pair were deleted out of band")]
fn deleted_out_of_band(lifecycle_context: &LifecycleContext) {
    let api = &lifecycle_context.api;
    for name in api.instance_names() {
        api.delete_instance_out_of_band(&name);
    }
    for name in api.key_pair_names() {
        api.delete_key_pair_out_of_band(&name);
    }
}

#[when("I create the machine")]
fn create_machine(lifecycle_context: &LifecycleContext) {
    let driver = lifecycle_context.driver();
    lifecycle_context.record(block_on(driver.create()).map(|_| ()));
}

#[when("I validate the configuration")]
fn validate_machine(lifecycle_context: &LifecycleContext) {
    let driver = lifecycle_context.driver();
    lifecycle_context.record(block_on(driver.validate_config()));
}

#[when("I remove the machine")]
fn remove_machine(lifecycle_context: &LifecycleContext) {
    let driver = lifecycle_context.driver();
    lifecycle_context.record(block_on(driver.remove()));
}

#[then("the operation succeeds")]
fn operation_succeeds(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match &*lifecycle_context.outcome.borrow() {
        Some(LifecycleOutcome::Success) => Ok(()),
        Some(LifecycleOutcome::Failure(message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the operation fails mentioning \"{snippet}\"")]
fn operation_fails(lifecycle_context: &LifecycleContext, snippet: String) -> Result<(), StepError> {
    let outcome = lifecycle_context.outcome.borrow();
    let Some(LifecycleOutcome::Failure(message)) = &*outcome else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    if message.contains(&snippet) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure mentioning {snippet:?}, got: {message}"
        )))
    }
}

#[then("no mutating provider calls were made")]
fn no_mutations(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.api.mutating_call_count() {
        0 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "expected no mutating calls, got {count}: {:?}",
            lifecycle_context.api.ops()
        ))),
    }
}

#[then("no instance or key pair remains")]
fn nothing_remains(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let instances = lifecycle_context.api.instance_names();
    let key_pairs = lifecycle_context.api.key_pair_names();
    if instances.is_empty() && key_pairs.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "leaked resources: instances {instances:?}, key pairs {key_pairs:?}"
        )))
    }
}

#[then("the machine address is \"{address}\"")]
fn machine_address(lifecycle_context: &LifecycleContext, address: String) -> Result<(), StepError> {
    let record = lifecycle_context
        .driver()
        .record()
        .map_err(|err| StepError::Assertion(err.to_string()))?
        .ok_or_else(|| StepError::Assertion(String::from("machine record missing")))?;
    if record.address.as_deref() == Some(address.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected address {address}, got {:?}",
            record.address
        )))
    }
}

#[then("the engine port {port} is open")]
fn engine_port_open(lifecycle_context: &LifecycleContext, port: u16) -> Result<(), StepError> {
    let api = &lifecycle_context.api;
    let opened: Vec<PortRange> = api
        .instance_names()
        .iter()
        .flat_map(|name| api.opened_ports(name))
        .collect();
    if opened.contains(&PortRange::single(port)) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected port {port} open, got {opened:?}"
        )))
    }
}

#[then("the local machine state is gone")]
fn local_state_gone(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let driver = lifecycle_context.driver();
    let dir = driver.store().machine_dir();
    if dir.exists() {
        Err(StepError::Assertion(format!("{dir} should have been removed")))
    } else {
        Ok(())
    }
}
