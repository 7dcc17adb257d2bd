//! Expectation matching against the device line stream
//!
//! Every step of a run shares one line channel. A wait consumes lines up to
//! and including the first match and leaves everything after it queued for
//! the next step.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::transcript::Transcript;

/// Wait until a line containing `expected` arrives or `timeout` elapses
///
/// Each consumed line is written to the transcript before it is tested.
/// Lines already queued when the wait starts are always examined, even
/// with a zero timeout.
pub async fn expect_line(
    lines: &mut mpsc::Receiver<String>,
    expected: &str,
    timeout: Duration,
    transcript: &mut Transcript,
) -> Result<()> {
    if expected.is_empty() {
        return Err(Error::Config("expected string must not be empty".to_string()));
    }

    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());

        // `timeout` polls the receiver before the timer, so a queued line
        // wins over an elapsed deadline
        match tokio::time::timeout(remaining, lines.recv()).await {
            Ok(Some(line)) => {
                transcript.device_line(&line)?;
                if line.contains(expected) {
                    tracing::debug!(expected, line = %line, "Expectation matched");
                    return Ok(());
                }
            }
            Ok(None) => {
                return Err(Error::LogStreamClosed);
            }
            Err(_) => {
                tracing::debug!(expected, timeout_secs = timeout.as_secs_f64(), "Expectation timed out");
                return Err(Error::expect_timeout(expected, timeout));
            }
        }
    }
}
