//! Fake device console for integration testing
//!
//! Appends lines to a log file the way a terminal logger would while a
//! device boots, optionally splitting each line across two writes so the
//! tailer sees partial lines.

use clap::Parser;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fake_console", about = "Append lines to a device log")]
struct Args {
    /// Log file to append to (created if missing)
    #[arg(long)]
    log: PathBuf,

    /// Pause before the first line and between lines
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Write each line in two halves with a pause in between
    #[arg(long)]
    split: bool,

    /// Terminate lines with \r\n like a serial terminal
    #[arg(long)]
    crlf: bool,

    /// Lines to write
    lines: Vec<String>,
}

fn main() {
    let args = Args::parse();
    let delay = Duration::from_millis(args.delay_ms);
    let eol = if args.crlf { "\r\n" } else { "\n" };

    let mut file = match OpenOptions::new().create(true).append(true).open(&args.log) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("fake_console: cannot open {}: {}", args.log.display(), e);
            std::process::exit(2);
        }
    };

    for line in &args.lines {
        sleep(delay);
        let data = format!("{}{}", line, eol);
        let result = if args.split {
            let mid = data.len() / 2;
            let (head, tail) = data.as_bytes().split_at(mid);
            file.write_all(head)
                .and_then(|_| file.flush())
                .and_then(|_| {
                    sleep(delay.max(Duration::from_millis(50)));
                    file.write_all(tail)
                })
        } else {
            file.write_all(data.as_bytes())
        };

        if let Err(e) = result.and_then(|_| file.flush()) {
            eprintln!("fake_console: write failed: {}", e);
            std::process::exit(2);
        }
    }
}
