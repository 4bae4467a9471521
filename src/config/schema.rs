//! Configuration schema definitions for tngrun.
//!
//! All configuration types deserialized from the TOML configuration file.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── ProjectConfig    - Project identity and compiled test artifact
//! ├── ClasspathConfig  - Classpath entries handed to the child JVM
//! ├── RunnerConfig     - java binary, output dir, listeners, timeout
//! ├── SelectionConfig  - Default group include/exclude filters
//! ├── ChangesConfig    - Upstream reference and PR-diff bound
//! └── CoverageConfig   - Optional coverage agent wiring
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::changes::git::PR_DIFF_TIMEOUT_SECS;
use crate::results;

/// Root configuration structure for tngrun.
///
/// # TOML Structure
///
/// ```toml
/// [project]
/// name = "my-app"
/// test_classes = "target/test-classes"
///
/// [classpath]
/// entries = ["target/classes", "target/test-classes"]
///
/// [runner]
/// java = "java"
/// output_dir = "target/testng"
/// ```
///
/// # Example
///
/// ```
/// use tngrun::config::Config;
///
/// let config: Config = toml::from_str(r#"
///     [project]
///     name = "my-app"
///     test_classes = "target/test-classes"
/// "#).unwrap();
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Project identity and compiled test artifact.
    pub project: ProjectConfig,

    /// Classpath handed to the child JVM.
    #[serde(default)]
    pub classpath: ClasspathConfig,

    /// TestNG launch settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Default group filters, extended by command-line flags.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Change discovery settings for changed-only selection.
    #[serde(default)]
    pub changes: ChangesConfig,

    /// Coverage agent wiring.
    #[serde(default)]
    pub coverage: CoverageConfig,
}

impl Config {
    /// Where the prior run's results document lives for this project.
    pub fn results_file(&self) -> PathBuf {
        self.runner
            .results_file
            .clone()
            .unwrap_or_else(|| results::default_results_path(&self.project.name))
    }
}

/// Project identity and the compiled test artifact to catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Project name, used for the suite name and the per-project results
    /// location.
    pub name: String,

    /// Repository root; changed paths from the diff are resolved against it.
    ///
    /// Default: `.`
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Packaged test jar or compiled test-classes directory.
    pub test_classes: PathBuf,

    /// Naming convention for test classes.
    ///
    /// Default: `Test`
    #[serde(default = "default_test_suffix")]
    pub test_suffix: String,
}

/// Classpath handed to the child JVM.
///
/// Entries may use `~`; they are expanded and joined with the platform
/// separator at launch. Resolving dependencies into these entries is the
/// build tool's job, not tngrun's.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClasspathConfig {
    #[serde(default)]
    pub entries: Vec<String>,
}

/// TestNG launch settings.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `java` | `java` |
/// | `output_dir` | `target/testng` |
/// | `listeners` | none |
/// | `jvm_args` | none |
/// | `test_timeout_secs` | none (no bound) |
/// | `results_file` | per-project temp location |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// The JVM launcher binary.
    #[serde(default = "default_java")]
    pub java: String,

    /// Directory TestNG writes its reports into.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Listener class names appended verbatim to the suite document.
    #[serde(default)]
    pub listeners: Vec<String>,

    /// Extra JVM arguments, split shell-style.
    #[serde(default)]
    pub jvm_args: Option<String>,

    /// Wall-clock bound on the whole TestNG run.
    #[serde(default)]
    pub test_timeout_secs: Option<u64>,

    /// Override for the prior-results document location.
    #[serde(default)]
    pub results_file: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            java: default_java(),
            output_dir: default_output_dir(),
            listeners: Vec::new(),
            jvm_args: None,
            test_timeout_secs: None,
            results_file: None,
        }
    }
}

/// Default group filters, extended by command-line flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub include_groups: Vec<String>,

    #[serde(default)]
    pub exclude_groups: Vec<String>,
}

/// Change discovery settings for changed-only selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangesConfig {
    /// Reference the branch-diff fallback compares against; discovered from
    /// `origin/HEAD` when unset.
    #[serde(default)]
    pub upstream: Option<String>,

    /// Bound on the pull-request diff attempt, in seconds.
    #[serde(default = "default_pr_diff_timeout")]
    pub pr_diff_timeout_secs: u64,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            pr_diff_timeout_secs: default_pr_diff_timeout(),
        }
    }
}

/// Coverage agent wiring.
///
/// When enabled, the agent jar is attached to the child JVM via
/// `-javaagent`. Instrumentation itself is the agent's business.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoverageConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Path to the coverage agent jar (e.g. the JaCoCo runtime agent).
    #[serde(default)]
    pub agent_jar: Option<String>,

    /// Where the agent writes its execution data.
    #[serde(default = "default_coverage_output")]
    pub output_file: PathBuf,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            agent_jar: None,
            output_file: default_coverage_output(),
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_test_suffix() -> String {
    "Test".to_string()
}

fn default_java() -> String {
    "java".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/testng")
}

fn default_pr_diff_timeout() -> u64 {
    PR_DIFF_TIMEOUT_SECS
}

fn default_coverage_output() -> PathBuf {
    PathBuf::from("target/coverage/jacoco.exec")
}
