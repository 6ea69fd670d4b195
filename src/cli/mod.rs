//! Command-line interface definitions for the `lightsail-machine` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `lightsail-machine` binary.
#[derive(Debug, Parser)]
#[command(
    name = "lightsail-machine",
    about = "Provision and manage docker hosts on AWS Lightsail",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Check configuration, credentials, and provider catalog.
    #[command(name = "validate", about = "Validate configuration against the provider")]
    Validate(MachineArgs),
    /// Provision a machine, or attach an existing host.
    #[command(name = "create", about = "Provision a machine")]
    Create(MachineArgs),
    /// Delete the machine's remote resources and local state.
    #[command(name = "rm", about = "Remove a machine")]
    Remove(MachineArgs),
    /// Power on a stopped machine.
    #[command(name = "start", about = "Start a machine")]
    Start(MachineArgs),
    /// Power off a running machine.
    #[command(name = "stop", about = "Stop a machine")]
    Stop(MachineArgs),
    /// Reboot a machine and wait until it runs again.
    #[command(name = "restart", about = "Restart a machine")]
    Restart(MachineArgs),
    /// Report whether the machine answers on its SSH port.
    #[command(name = "status", about = "Probe machine reachability")]
    Status(MachineArgs),
    /// Print the docker engine URL.
    #[command(name = "url", about = "Print the engine URL")]
    Url(MachineArgs),
}

/// Arguments shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct MachineArgs {
    /// Machine name used to namespace local state and remote resources.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
}
