//! External command execution
//!
//! Build, flash and reset tools run one at a time with their combined
//! output going to the transcript. A running command is never interrupted.

use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::common::{display_command, Error, Result};
use crate::transcript::Transcript;

/// Run one command to completion
pub async fn run_command(argv: &[String], workdir: &Path, transcript: &mut Transcript) -> Result<()> {
    let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;
    let command = display_command(argv);

    transcript.command(&command)?;
    tracing::info!(command = %command, "Running command");

    let status = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(transcript.child_stdio()?)
        .stderr(transcript.child_stdio()?)
        .status()
        .await
        .map_err(|e| launch_error(argv, e))?;

    if !status.success() {
        tracing::warn!(command = %command, code = ?status.code(), "Command failed");
        transcript.fail(&format!("{} ({})", command, status))?;
        return Err(Error::command_failed(argv, status));
    }

    tracing::debug!(command = %command, "Command finished");
    Ok(())
}

/// Run commands in order, stopping at the first failure
pub async fn run_commands(
    commands: &[Vec<String>],
    workdir: &Path,
    transcript: &mut Transcript,
) -> Result<()> {
    for argv in commands {
        run_command(argv, workdir, transcript).await?;
    }
    Ok(())
}

fn launch_error(argv: &[String], e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound && which::which(&argv[0]).is_err() {
        Error::command_launch(argv, "not found in PATH")
    } else {
        Error::command_launch(argv, e)
    }
}
