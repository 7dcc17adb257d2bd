//! mcutest - hardware-in-the-loop bootloader test driver
//!
//! This library follows a device console log, runs build and flash tools,
//! and checks that each test step's expected output appears in time.

pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod expect;
pub mod runner;
pub mod suite;
pub mod tail;
pub mod transcript;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use suite::{TestGroup, TestStep, TestSuite};
