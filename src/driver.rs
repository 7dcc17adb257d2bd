//! Test driver
//!
//! Walks the suite group by group and step by step. Each step moves through
//! three stages: build (or extract prebuilt artifacts), run the action
//! commands, then wait for the expected line. The first error anywhere ends
//! the run; nothing is retried and no later step is attempted.
//!
//! The log tailer is checked before every stage and every command. Once it
//! has died nothing new is started against the device, and its error is the
//! one reported. A command already running is left to finish.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use colored::Colorize;
use serde::Serialize;
use crate::artifacts::{ArtifactPackager, ArtifactSource};
use crate::common::{Error, Result};
use crate::expect::expect_line;
use crate::runner::{run_command, run_commands};
use crate::suite::{TestGroup, TestStep, TestSuite};
use crate::tail::{DeviceLog, TailerHandle};
use crate::transcript::Transcript;

/// Stage of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildOrExtract,
    RunActionCommands,
    AwaitExpectation,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::BuildOrExtract => "build",
            Stage::RunActionCommands => "commands",
            Stage::AwaitExpectation => "expect",
        }
    }
}

/// Settings that apply to every step of a run
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Where commands run and artifacts are extracted
    pub workdir: PathBuf,
    /// Expectation timeout for steps without their own
    pub expect_timeout: Duration,
}

/// Outcome of a run in which every step passed
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub groups: usize,
    pub steps: usize,
    pub prebuilt: bool,
    pub elapsed_secs: f64,
}

/// Run every group of `suite` in order
///
/// With `artifacts` set, build commands are skipped and each step extracts
/// its group's prebuilt artifacts instead.
pub async fn run_suite(
    suite: &TestSuite,
    log: &mut DeviceLog,
    transcript: &mut Transcript,
    mut artifacts: Option<&mut dyn ArtifactSource>,
    options: &DriverOptions,
) -> Result<RunSummary> {
    let started = Instant::now();
    let prebuilt = artifacts.is_some();
    let mut steps = 0;

    for group in &suite.groups {
        println!(
            "\n{} {} {}",
            "Running Group:".blue().bold(),
            group.name.white().bold(),
            format!("({})", group.short).dimmed()
        );
        transcript.group(&group.name, &group.short)?;
        tracing::info!(group = %group.name, short = %group.short, "Starting group");

        for (i, step) in group.steps.iter().enumerate() {
            let step_num = i + 1;
            let result = run_step(
                group,
                step,
                step_num,
                log,
                transcript,
                artifacts.as_deref_mut(),
                options,
            )
            .await;

            // A closed stream means the tailer ended; report why
            let result = match result {
                Err(Error::LogStreamClosed) => Err(log.tailer.stopped().await),
                other => other,
            };

            if let Err(e) = result {
                println!("  {} Step {}: {}", "✗".red(), step_num, e);
                transcript.fail(&format!(
                    "group '{}' step {}: {}",
                    group.name, step_num, e
                ))?;
                return Err(e);
            }

            println!(
                "  {} Step {}: {}",
                "✓".green(),
                step_num,
                step.expect.dimmed()
            );
            transcript.pass(&format!("group '{}' step {}", group.name, step_num))?;
            steps += 1;
        }
    }

    let summary = RunSummary {
        groups: suite.groups.len(),
        steps,
        prebuilt,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };

    println!(
        "\n{} {}\n",
        "✓".green().bold(),
        format!("All {} groups passed ({} steps)", summary.groups, summary.steps)
            .green()
            .bold()
    );
    transcript.pass("all groups")?;
    tracing::info!(groups = summary.groups, steps = summary.steps, "Run complete");

    Ok(summary)
}

async fn run_step(
    group: &TestGroup,
    step: &TestStep,
    step_num: usize,
    log: &mut DeviceLog,
    transcript: &mut Transcript,
    artifacts: Option<&mut (dyn ArtifactSource + '_)>,
    options: &DriverOptions,
) -> Result<()> {
    enter(transcript, &mut log.tailer, group, step_num, Stage::BuildOrExtract).await?;
    match artifacts {
        Some(source) => {
            transcript.note(&format!("extracting prebuilt artifacts for '{}'", group.short))?;
            source.extract(&group.short, &options.workdir)?;
        }
        None => run_watched(&step.build, &mut log.tailer, options, transcript).await?,
    }

    enter(transcript, &mut log.tailer, group, step_num, Stage::RunActionCommands).await?;
    run_watched(&step.commands, &mut log.tailer, options, transcript).await?;

    enter(transcript, &mut log.tailer, group, step_num, Stage::AwaitExpectation).await?;
    let timeout = step.timeout(options.expect_timeout);
    transcript.note(&format!("waiting {:.1}s for '{}'", timeout.as_secs_f64(), step.expect))?;
    expect_line(&mut log.lines, &step.expect, timeout, transcript).await
}

async fn enter(
    transcript: &mut Transcript,
    tailer: &mut TailerHandle,
    group: &TestGroup,
    step_num: usize,
    stage: Stage,
) -> Result<()> {
    tailer.check().await?;
    log_stage(transcript, group, step_num, stage)
}

fn log_stage(transcript: &mut Transcript, group: &TestGroup, step_num: usize, stage: Stage) -> Result<()> {
    tracing::debug!(group = %group.short, step = step_num, stage = stage.label(), "Entering stage");
    transcript.stage(step_num, stage.label())
}

/// Run commands in order, refusing to start one once the tailer has died
async fn run_watched(
    commands: &[Vec<String>],
    tailer: &mut TailerHandle,
    options: &DriverOptions,
    transcript: &mut Transcript,
) -> Result<()> {
    for argv in commands {
        tailer.check().await?;
        run_command(argv, &options.workdir, transcript).await?;
    }
    Ok(())
}

/// Offline pass: build every group and store its artifacts in an archive
///
/// Returns the number of groups captured.
pub async fn package_suite(
    suite: &TestSuite,
    packager: &mut ArtifactPackager,
    transcript: &mut Transcript,
    options: &DriverOptions,
) -> Result<usize> {
    for group in &suite.groups {
        println!(
            "\n{} {} {}",
            "Building Group:".blue().bold(),
            group.name.white().bold(),
            format!("({})", group.short).dimmed()
        );
        transcript.group(&group.name, &group.short)?;

        for (i, step) in group.steps.iter().enumerate() {
            if step.build.is_empty() {
                continue;
            }
            log_stage(transcript, group, i + 1, Stage::BuildOrExtract)?;
            if let Err(e) = run_commands(&step.build, &options.workdir, transcript).await {
                println!("  {} Step {}: {}", "✗".red(), i + 1, e);
                return Err(e);
            }
        }

        packager.capture(&group.short, &options.workdir)?;
        transcript.pass(&format!("captured '{}'", group.short))?;
        println!("  {} captured {}", "✓".green(), group.short.dimmed());
    }

    Ok(suite.groups.len())
}
