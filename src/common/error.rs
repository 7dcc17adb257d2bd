//! Error types for the test driver
//!
//! Every stage returns one of these and the first one aborts the run.
//! Messages name the offending command, expectation or artifact so a
//! single diagnostic line is enough to start a post-mortem.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test driver
#[derive(Error, Debug)]
pub enum Error {
    // === Environment Errors ===
    #[error("Cannot open device log '{path}': {source}")]
    DeviceLogOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot seek to the end of device log '{path}': {source}")]
    DeviceLogSeek {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read device log: {0}")]
    DeviceLogRead(#[source] io::Error),

    #[error("Cannot create transcript '{path}': {source}")]
    TranscriptCreate {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot open artifact archive '{path}': {error}")]
    ArchiveOpen { path: String, error: String },

    #[error("Device log stream closed unexpectedly")]
    LogStreamClosed,

    // === Command Errors ===
    #[error("Empty command in test step")]
    EmptyCommand,

    #[error("Failed to launch '{command}': {reason}")]
    CommandLaunch { command: String, reason: String },

    #[error("Command '{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: String },

    // === Expectation Errors ===
    #[error("Timed out after {secs:.1}s waiting for '{expected}'")]
    ExpectTimeout { expected: String, secs: f64 },

    // === Artifact Errors ===
    #[error("No artifacts for '{0}' in archive")]
    MissingArtifact(String),

    #[error("Artifact archive error: {0}")]
    Archive(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid test suite: {0}")]
    SuiteParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a command failed error from an argument vector and exit status
    pub fn command_failed(argv: &[String], status: ExitStatus) -> Self {
        Self::CommandFailed {
            command: super::display_command(argv),
            code: status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none (terminated by signal)".to_string()),
        }
    }

    /// Create a launch failure error
    pub fn command_launch(argv: &[String], reason: impl ToString) -> Self {
        Self::CommandLaunch {
            command: super::display_command(argv),
            reason: reason.to_string(),
        }
    }

    /// Create an expectation timeout error
    pub fn expect_timeout(expected: &str, timeout: std::time::Duration) -> Self {
        Self::ExpectTimeout {
            expected: expected.to_string(),
            secs: timeout.as_secs_f64(),
        }
    }

    /// Stable code for the failure class, used in summaries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DeviceLogOpen { .. }
            | Error::DeviceLogSeek { .. }
            | Error::DeviceLogRead(_)
            | Error::TranscriptCreate { .. }
            | Error::ArchiveOpen { .. }
            | Error::Archive(_)
            | Error::LogStreamClosed
            | Error::Io(_)
            | Error::FileRead { .. } => "ENVIRONMENT",
            Error::EmptyCommand | Error::CommandLaunch { .. } | Error::CommandFailed { .. } => {
                "COMMAND_FAILED"
            }
            Error::ExpectTimeout { .. } => "EXPECT_TIMEOUT",
            Error::MissingArtifact(_) => "MISSING_ARTIFACT",
            Error::Config(_) | Error::ConfigParse(_) | Error::SuiteParse(_) => "CONFIG",
            Error::Json(_) | Error::Internal(_) => "INTERNAL",
        }
    }
}
