//! BDD scenarios for the machine lifecycle.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Provision a machine in ap-northeast-1"
)]
fn scenario_provision(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reject an inactive bundle before touching the provider"
)]
fn scenario_inactive_bundle(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Validation only reads from the provider"
)]
fn scenario_validation_read_only(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reject an unavailable zone"
)]
fn scenario_unavailable_zone(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Unwind a create that never reaches running"
)]
fn scenario_readiness_timeout(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Unwind a create whose engine port cannot be opened"
)]
fn scenario_port_failure(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Remove a machine deleted out of band"
)]
fn scenario_remove_out_of_band(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}
