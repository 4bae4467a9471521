//! TestNG child-process launch and outcome interpretation.
//!
//! The generated suite document is handed to TestNG running in a child JVM.
//! The launcher builds the command line (coverage agent, extra JVM
//! arguments, classpath, TestNG main class, report directory, suite path),
//! enforces the optional wall-clock bound, reads the run's results document
//! for the summary, and copies that document to the per-project location
//! failed-only selection reads on the next invocation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{CoverageConfig, RunnerConfig};
use crate::results::{self, ResultsError};

/// TestNG's command-line entry point.
const TESTNG_MAIN_CLASS: &str = "org.testng.TestNG";

/// Name TestNG gives its native results document.
const RESULTS_FILE_NAME: &str = "testng-results.xml";

/// Result type for launcher operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while launching TestNG.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to launch {0}: {1}")]
    LaunchFailed(String, String),

    #[error("TestNG run timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid JVM arguments: {0}")]
    BadJvmArgs(String),

    #[error("Failed to read run results: {0}")]
    Results(#[from] ResultsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one TestNG invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code of the child JVM.
    pub exit_code: i32,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Wall-clock duration of the child process.
    pub duration: Duration,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// TestNG signals failures through its exit status; both views must
    /// agree for the run to pass.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.failed == 0
    }

    /// Process exit code for this outcome.
    pub fn process_exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Launches TestNG for a generated suite document.
pub struct TestNgRunner {
    config: RunnerConfig,
    coverage: CoverageConfig,
    results_file: PathBuf,
}

impl TestNgRunner {
    /// Create a launcher.
    ///
    /// `results_file` is where the run's results document is persisted for
    /// the next failed-only selection.
    pub fn new(config: RunnerConfig, coverage: CoverageConfig, results_file: PathBuf) -> Self {
        Self {
            config,
            coverage,
            results_file,
        }
    }

    /// Run TestNG on the given suite with the given classpath entries.
    pub async fn run(&self, suite: &Path, classpath: &[String]) -> RunnerResult<RunOutcome> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.config.output_dir)?;

        let mut cmd = tokio::process::Command::new(&self.config.java);
        if let Some(agent) = self.coverage_arg() {
            cmd.arg(agent);
        }
        if let Some(jvm_args) = &self.config.jvm_args {
            let args =
                shell_words::split(jvm_args).map_err(|e| RunnerError::BadJvmArgs(e.to_string()))?;
            cmd.args(args);
        }
        cmd.arg("-cp").arg(join_classpath(classpath));
        cmd.arg(TESTNG_MAIN_CLASS);
        cmd.arg("-d").arg(&self.config.output_dir);
        cmd.arg(suite);

        debug!("Launching {:?}", cmd.as_std());
        let status = if let Some(timeout) = self.config.test_timeout_secs {
            match tokio::time::timeout(Duration::from_secs(timeout), cmd.status()).await {
                Ok(status) => status,
                Err(_) => return Err(RunnerError::Timeout(timeout)),
            }
        } else {
            cmd.status().await
        };
        let status = status
            .map_err(|e| RunnerError::LaunchFailed(self.config.java.clone(), e.to_string()))?;
        let exit_code = status.code().unwrap_or(-1);

        let results_path = self.config.output_dir.join(RESULTS_FILE_NAME);
        let summary = match results::run_summary(&results_path)? {
            Some(summary) => summary,
            None => {
                warn!(
                    "TestNG wrote no results document at {}",
                    results_path.display()
                );
                Default::default()
            }
        };

        self.persist_results(&results_path)?;

        Ok(RunOutcome {
            exit_code,
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            duration: start.elapsed(),
            finished_at: Utc::now(),
        })
    }

    /// The `-javaagent` argument, when coverage is wired up.
    fn coverage_arg(&self) -> Option<String> {
        if !self.coverage.enabled {
            return None;
        }
        let Some(jar) = &self.coverage.agent_jar else {
            warn!("Coverage enabled but no agent_jar configured; skipping");
            return None;
        };
        Some(format!(
            "-javaagent:{}=destfile={}",
            shellexpand::tilde(jar),
            self.coverage.output_file.display()
        ))
    }

    /// Keep the results document where failed-only selection looks for it.
    fn persist_results(&self, results_path: &Path) -> RunnerResult<()> {
        if !results_path.is_file() {
            return Ok(());
        }
        if let Some(parent) = self.results_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(results_path, &self.results_file)?;
        info!("Results kept at {}", self.results_file.display());
        Ok(())
    }
}

/// Expand and join classpath entries with the platform separator.
fn join_classpath(entries: &[String]) -> String {
    let sep = if cfg!(windows) { ";" } else { ":" };
    entries
        .iter()
        .map(|e| shellexpand::tilde(e).into_owned())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_with(results_file: PathBuf, output_dir: PathBuf) -> TestNgRunner {
        let config = RunnerConfig {
            output_dir,
            ..Default::default()
        };
        TestNgRunner::new(config, CoverageConfig::default(), results_file)
    }

    #[test]
    fn test_join_classpath() {
        let joined = join_classpath(&["target/classes".to_string(), "libs/testng.jar".to_string()]);
        if cfg!(windows) {
            assert_eq!(joined, "target/classes;libs/testng.jar");
        } else {
            assert_eq!(joined, "target/classes:libs/testng.jar");
        }
    }

    #[test]
    fn test_coverage_arg_formatting() {
        let coverage = CoverageConfig {
            enabled: true,
            agent_jar: Some("tools/jacocoagent.jar".to_string()),
            output_file: PathBuf::from("target/coverage/jacoco.exec"),
        };
        let runner = TestNgRunner::new(
            RunnerConfig::default(),
            coverage,
            PathBuf::from("results.xml"),
        );
        assert_eq!(
            runner.coverage_arg().unwrap(),
            "-javaagent:tools/jacocoagent.jar=destfile=target/coverage/jacoco.exec"
        );
    }

    #[test]
    fn test_coverage_disabled_or_unconfigured_adds_nothing() {
        let runner = TestNgRunner::new(
            RunnerConfig::default(),
            CoverageConfig::default(),
            PathBuf::from("results.xml"),
        );
        assert!(runner.coverage_arg().is_none());

        let half_configured = CoverageConfig {
            enabled: true,
            agent_jar: None,
            output_file: PathBuf::from("x.exec"),
        };
        let runner = TestNgRunner::new(
            RunnerConfig::default(),
            half_configured,
            PathBuf::from("results.xml"),
        );
        assert!(runner.coverage_arg().is_none());
    }

    #[test]
    fn test_persist_results_copies_document() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();
        let produced = output_dir.join(RESULTS_FILE_NAME);
        std::fs::write(&produced, "<testng-results/>").unwrap();

        let kept = dir.path().join("kept/testng-results.xml");
        let runner = runner_with(kept.clone(), output_dir);
        runner.persist_results(&produced).unwrap();
        assert_eq!(
            std::fs::read_to_string(&kept).unwrap(),
            "<testng-results/>"
        );
    }

    #[test]
    fn test_persist_without_document_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept/testng-results.xml");
        let runner = runner_with(kept.clone(), dir.path().join("out"));
        runner
            .persist_results(&dir.path().join("out/absent.xml"))
            .unwrap();
        assert!(!kept.exists());
    }

    #[tokio::test]
    async fn test_missing_java_binary_reports_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig {
            java: "tngrun-no-such-jvm".to_string(),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        let runner = TestNgRunner::new(
            config,
            CoverageConfig::default(),
            dir.path().join("results.xml"),
        );
        let suite = dir.path().join("testng.xml");
        std::fs::write(&suite, "<suite name=\"s\"/>").unwrap();

        let result = runner.run(&suite, &[]).await;
        assert!(matches!(result, Err(RunnerError::LaunchFailed(_, _))));
    }
}
