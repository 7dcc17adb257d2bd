//! Test suite definition
//!
//! Defines the data structures for deserializing YAML test suites. A suite
//! is an ordered list of groups; each group is an ordered list of steps that
//! build (optionally), run action commands, and wait for one expected line.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::common::{Error, Result};

/// Suite format versions this build understands
pub const SUPPORTED_VERSION: u32 = 1;

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TestSuite {
    /// Format version, must equal [`SUPPORTED_VERSION`]
    pub version: u32,
    /// Artifact file names; overrides the configured set when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<String>>,
    /// Groups, run in order
    pub groups: Vec<TestGroup>,
}

/// A named group of steps sharing one set of build artifacts
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TestGroup {
    /// Display name
    pub name: String,
    /// Short identifier, the artifact lookup key in a prebuilt archive
    pub short: String,
    /// Steps, run in order
    pub steps: Vec<TestStep>,
}

/// One build/flash/observe cycle
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TestStep {
    /// Commands that produce artifacts; skipped when running from an archive
    #[serde(default)]
    pub build: Vec<Vec<String>>,
    /// Commands that flash and reset the device
    pub commands: Vec<Vec<String>>,
    /// Substring that must appear in the device output
    pub expect: String,
    /// Overrides the configured expectation timeout for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl TestStep {
    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout_secs.map(Duration::from_secs).unwrap_or(default)
    }
}

impl TestSuite {
    /// Load and validate a suite from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a suite from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let suite: TestSuite =
            serde_yaml::from_str(content).map_err(|e| Error::SuiteParse(e.to_string()))?;
        suite.validate()?;
        Ok(suite)
    }

    /// Check the structural invariants the driver relies on
    pub fn validate(&self) -> Result<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(Error::SuiteParse(format!(
                "unsupported version {} (expected {})",
                self.version, SUPPORTED_VERSION
            )));
        }
        if self.groups.is_empty() {
            return Err(Error::SuiteParse("suite has no groups".to_string()));
        }
        if let Some(files) = &self.artifacts {
            if files.is_empty() || files.iter().any(|f| f.is_empty() || f.contains('/')) {
                return Err(Error::SuiteParse(
                    "artifacts must be a non-empty list of plain file names".to_string(),
                ));
            }
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(Error::SuiteParse(format!(
                    "group '{}' has an empty name",
                    group.short
                )));
            }
            if group.short.is_empty() || group.short.contains('/') {
                return Err(Error::SuiteParse(format!(
                    "group '{}' has an invalid short identifier '{}'",
                    group.name, group.short
                )));
            }
            if !seen.insert(group.short.as_str()) {
                return Err(Error::SuiteParse(format!(
                    "duplicate short identifier '{}'",
                    group.short
                )));
            }
            if group.steps.is_empty() {
                return Err(Error::SuiteParse(format!("group '{}' has no steps", group.name)));
            }

            for (i, step) in group.steps.iter().enumerate() {
                let at = format!("group '{}' step {}", group.name, i + 1);
                if step.commands.is_empty() {
                    return Err(Error::SuiteParse(format!("{}: no commands", at)));
                }
                if step
                    .build
                    .iter()
                    .chain(step.commands.iter())
                    .any(|argv| argv.is_empty() || argv[0].is_empty())
                {
                    return Err(Error::SuiteParse(format!("{}: empty command", at)));
                }
                if step.expect.is_empty() {
                    return Err(Error::SuiteParse(format!("{}: empty expect string", at)));
                }
            }
        }
        Ok(())
    }

    /// Artifact file names, preferring the suite's own list
    pub fn artifact_files<'a>(&'a self, configured: &'a [String]) -> &'a [String] {
        self.artifacts.as_deref().unwrap_or(configured)
    }

    pub fn step_count(&self) -> usize {
        self.groups.iter().map(|g| g.steps.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
version: 1
groups:
  - name: "Good RSA"
    short: goodrsa
    steps:
      - build:
          - [make, test-good-rsa]
        commands:
          - [pyocd, erase, --chip]
          - [make, flash_boot]
        expect: "Unable to find bootable image"
      - commands:
          - [make, flash_hello1]
        expect: "Hello World from hello1"
        timeout_secs: 20
  - name: "Overwrite"
    short: overwrite
    steps:
      - commands: [[make, flash_hello2]]
        expect: "Hello World from hello2"
"#;

    #[test]
    fn test_parse_suite() {
        let suite = TestSuite::from_yaml(SUITE).unwrap();
        assert_eq!(suite.groups.len(), 2);
        assert_eq!(suite.step_count(), 3);

        let first = &suite.groups[0];
        assert_eq!(first.short, "goodrsa");
        assert_eq!(first.steps[0].build, vec![vec!["make", "test-good-rsa"]]);
        assert!(first.steps[1].build.is_empty());
        assert_eq!(
            first.steps[1].timeout(Duration::from_secs(10)),
            Duration::from_secs(20)
        );
        assert_eq!(
            first.steps[0].timeout(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_artifact_override() {
        let configured = vec!["mcuboot.bin".to_string()];
        let suite = TestSuite::from_yaml(SUITE).unwrap();
        assert_eq!(suite.artifact_files(&configured), &configured[..]);

        let yaml = SUITE.replace("version: 1", "version: 1\nartifacts: [boot.bin, app.bin]");
        let suite = TestSuite::from_yaml(&yaml).unwrap();
        assert_eq!(suite.artifact_files(&configured), &["boot.bin", "app.bin"]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let yaml = SUITE.replace("version: 1", "version: 2");
        let err = TestSuite::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("unsupported version 2"));
    }

    #[test]
    fn test_rejects_empty_expect() {
        let yaml = SUITE.replace("\"Hello World from hello2\"", "\"\"");
        let err = TestSuite::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("empty expect string"));
    }

    #[test]
    fn test_rejects_duplicate_short() {
        let yaml = SUITE.replace("short: overwrite", "short: goodrsa");
        let err = TestSuite::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate short identifier"));
    }

    #[test]
    fn test_rejects_empty_command() {
        let yaml = SUITE.replace("[[make, flash_hello2]]", "[[]]");
        let err = TestSuite::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[test]
    fn test_rejects_missing_commands() {
        let yaml = r#"
version: 1
groups:
  - name: A
    short: a
    steps:
      - expect: "x"
"#;
        assert!(matches!(
            TestSuite::from_yaml(yaml),
            Err(Error::SuiteParse(_))
        ));
    }

    #[test]
    fn test_bundled_suite_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("suites/frdm-k64f.yaml");
        let suite = TestSuite::load(&path).unwrap();
        assert_eq!(suite.groups[0].short, "goodrsa");
        assert!(suite.artifacts.is_some());
    }
}
