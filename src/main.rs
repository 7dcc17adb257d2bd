//! mcutest - hardware-in-the-loop bootloader test driver
//!
//! Builds or extracts firmware, flashes it with external tools and checks
//! the device console log for the expected output of every step.

use clap::Parser;
use mcutest::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "mcutest", about = "Hardware-in-the-loop bootloader test driver")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
