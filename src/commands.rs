//! CLI command definitions
//!
//! Defines the clap commands for the mcutest CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a test suite against a connected device
    Run {
        /// Path to the YAML test suite
        #[arg(long, short)]
        suite: PathBuf,

        /// Device console log written by the terminal logger
        #[arg(long)]
        device_log: PathBuf,

        /// Where to write the run transcript
        #[arg(long, default_value = "mcutest.log")]
        transcript: PathBuf,

        /// Zip of prebuilt artifacts; builds from source when absent
        #[arg(long)]
        prebuilt: Option<PathBuf>,

        /// Directory commands run in and artifacts are extracted to
        #[arg(long, default_value = ".")]
        workdir: PathBuf,

        /// Seconds to wait for each expected line (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Device log poll interval in milliseconds (overrides config)
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Alternative configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build every group and store its artifacts in a zip archive
    Package {
        /// Path to the YAML test suite
        #[arg(long, short)]
        suite: PathBuf,

        /// Archive to create
        #[arg(long, short, default_value = "test-images.zip")]
        output: PathBuf,

        /// Where to write the build transcript
        #[arg(long, default_value = "mcutest-package.log")]
        transcript: PathBuf,

        /// Directory build commands run in and artifacts are read from
        #[arg(long, default_value = ".")]
        workdir: PathBuf,

        /// Alternative configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a test suite and list its groups
    List {
        /// Path to the YAML test suite
        #[arg(long, short)]
        suite: PathBuf,
    },
}
