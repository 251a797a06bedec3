mod cli;
mod commands;
mod config;
mod error;
mod hardware;
mod output;
mod registry;

use clap::Parser;
use cli::{Cli, Commands};
use commands::{handle_check_command, handle_hardware_command, handle_register_command};
use output::print_error;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Hardware(cmd) => handle_hardware_command(cmd),
        Commands::Register(args) => handle_register_command(args),
        Commands::Check {
            employee_id,
            device,
            url,
        } => handle_check_command(employee_id, device.as_deref(), url.as_deref()),
    };

    if let Err(e) = result {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
