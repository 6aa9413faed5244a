use std::process::ExitCode;

use clap::Parser;
use log::{debug, warn};

use canupipe::core::runner;
use canupipe::runtime::{self, Commands, LogLevel};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// trace, debug, info, warn, error or off. RUST_LOG overrides it
    #[arg(long = "log-level", global = true, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    runtime::setup_global_logger(cli.log_level);
    debug!("Running {:?}", cli.command);

    // first Ctrl-C cancels running jobs, the second one gives up on them
    let handler = ctrlc::set_handler(|| {
        if runner::interrupt() {
            std::process::exit(130);
        }
        eprintln!("Interrupted, cancelling running jobs");
    });
    if let Err(e) = handler {
        warn!("Could not install the interrupt handler: {}", e);
    }

    let result = match cli.command {
        Commands::Run(mut cmd) => cmd.try_execute(),
        Commands::Split(mut cmd) => cmd.try_execute(),
        Commands::Correct(mut cmd) => cmd.try_execute(),
        Commands::Merge(mut cmd) => cmd.try_execute(),
        Commands::Assemble(mut cmd) => cmd.try_execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
