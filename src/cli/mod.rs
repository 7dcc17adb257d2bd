//! CLI command handling
//!
//! Wires configuration, the device log tailer, the transcript and the
//! driver together for each subcommand.

use std::path::Path;

use colored::Colorize;

use crate::artifacts::{ArtifactPackager, ArtifactSource, ZipArtifacts};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::Result;
use crate::driver::{self, DriverOptions};
use crate::suite::TestSuite;
use crate::tail;
use crate::transcript::Transcript;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            suite,
            device_log,
            transcript,
            prebuilt,
            workdir,
            timeout,
            poll_interval_ms,
            config,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(secs) = timeout {
                config.timeouts.expect_secs = secs;
            }
            if let Some(ms) = poll_interval_ms {
                config.tailer.poll_interval_ms = ms;
            }

            let suite = TestSuite::load(&suite)?;
            let mut transcript = Transcript::create(&transcript)?;
            let mut artifacts = prebuilt.as_deref().map(ZipArtifacts::open).transpose()?;

            let mut log = tail::follow(
                &device_log,
                config.poll_interval(),
                config.tailer.channel_capacity,
            )
            .await?;

            let options = DriverOptions {
                workdir,
                expect_timeout: config.expect_timeout(),
            };
            let result = driver::run_suite(
                &suite,
                &mut log,
                &mut transcript,
                artifacts.as_mut().map(|a| a as &mut dyn ArtifactSource),
                &options,
            )
            .await;
            log.tailer.abort();

            let path = transcript.path().display().to_string();
            let result = keep_first_error(result, transcript.finish());

            let summary = result.map_err(|e| {
                tracing::error!(kind = e.kind(), error = %e, "Run failed");
                eprintln!("{} {}", "Transcript:".dimmed(), path);
                e
            })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} steps passed in {:.1}s, transcript at {}",
                    summary.steps, summary.elapsed_secs, path
                );
            }
            Ok(())
        }

        Commands::Package {
            suite,
            output,
            transcript,
            workdir,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let suite = TestSuite::load(&suite)?;
            let files = suite.artifact_files(&config.artifacts.files).to_vec();

            let mut transcript = Transcript::create(&transcript)?;
            let mut packager = ArtifactPackager::create(&output, &files)?;
            let options = DriverOptions {
                workdir,
                expect_timeout: config.expect_timeout(),
            };

            // Dropping an unfinished packager discards its partial archive
            let result = driver::package_suite(&suite, &mut packager, &mut transcript, &options).await;
            let captured = keep_first_error(result, transcript.finish())?;
            packager.finish()?;

            println!(
                "\n{} {}",
                "✓".green().bold(),
                format!("Captured {} groups into {}", captured, output.display()).green()
            );
            Ok(())
        }

        Commands::List { suite } => {
            let suite = TestSuite::load(&suite)?;
            println!(
                "{} groups, {} steps",
                suite.groups.len(),
                suite.step_count()
            );
            for group in &suite.groups {
                println!(
                    "  {:<16} {} ({} steps)",
                    group.short.cyan(),
                    group.name,
                    group.steps.len()
                );
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Combine a run's result with the outcome of closing its transcript
///
/// A transcript that fails to flush only fails an otherwise passing run.
fn keep_first_error<T>(result: Result<T>, finished: Result<()>) -> Result<T> {
    match (result, finished) {
        (result, Ok(())) => result,
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Err(flush)) => {
            tracing::warn!(error = %flush, "Failed to flush transcript");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use std::io;

    fn flush_failure() -> Result<()> {
        Err(Error::Io(io::Error::other("no space left on device")))
    }

    #[test]
    fn test_run_error_survives_flush_failure() {
        let run: Result<()> = Err(Error::expect_timeout("BOOT-OK", std::time::Duration::from_secs(10)));
        let err = keep_first_error(run, flush_failure()).unwrap_err();
        assert_eq!(err.kind(), "EXPECT_TIMEOUT");
    }

    #[test]
    fn test_flush_failure_fails_passing_run() {
        let err = keep_first_error(Ok(3), flush_failure()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_clean_finish_keeps_result() {
        assert_eq!(keep_first_error(Ok(3), Ok(())).unwrap(), 3);
        let run: Result<()> = Err(Error::LogStreamClosed);
        assert!(matches!(keep_first_error(run, Ok(())), Err(Error::LogStreamClosed)));
    }
}
