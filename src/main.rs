//! Binary entry point for the `lightsail-machine` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use lightsail_machine::{
    ConfigError, DriverError, LightsailClient, MachineConfig, MachineDriver, ProcessCommandRunner,
};

mod cli;

use cli::{Cli, MachineArgs};

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            write_error(io::stderr(), &err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

const fn machine_args(cli: &Cli) -> &MachineArgs {
    match cli {
        Cli::Validate(args)
        | Cli::Create(args)
        | Cli::Remove(args)
        | Cli::Start(args)
        | Cli::Stop(args)
        | Cli::Restart(args)
        | Cli::Status(args)
        | Cli::Url(args) => args,
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let mut config = MachineConfig::load_without_cli_args()?;
    config.machine_name.clone_from(&machine_args(&cli).name);

    let api = LightsailClient::from_machine_config(&config).await;
    let driver = MachineDriver::new(api, ProcessCommandRunner, config);
    let mut stdout = io::stdout();

    match cli {
        Cli::Validate(_) => {
            driver.validate_config().await?;
            writeln!(stdout, "configuration is valid")?;
        }
        Cli::Create(_) => {
            let resource = driver.create().await?;
            writeln!(stdout, "{}", resource.address)?;
        }
        Cli::Remove(_) => driver.remove().await?,
        Cli::Start(_) => driver.start().await?,
        Cli::Stop(_) => driver.stop().await?,
        Cli::Restart(_) => driver.restart().await?,
        Cli::Status(_) => {
            let state = driver.probe_state().await?;
            writeln!(stdout, "{state}")?;
        }
        Cli::Url(_) => {
            let url = driver.resolve_url()?;
            writeln!(stdout, "{url}")?;
        }
    }
    Ok(())
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
