//! tngrun CLI - selective TestNG suite runner.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tngrun::catalog;
use tngrun::changes::git::GitChangeSet;
use tngrun::config::{self, Config};
use tngrun::runner::TestNgRunner;
use tngrun::selection::{GroupFilter, Selection, SelectionMode, SelectionOptions, Selector};
use tngrun::suite::{self, SuiteSpec};

#[derive(Parser)]
#[command(name = "tngrun")]
#[command(about = "Selective TestNG suite runner", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "tngrun.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Selection directives, shared by the run/select/suite subcommands.
#[derive(Args)]
struct SelectFlags {
    /// Only re-run classes that failed in the previous run
    #[arg(long)]
    failed: bool,

    /// Only run tests touched by recent changes
    #[arg(long)]
    changed: bool,

    /// Comparison commit or range for --changed
    #[arg(long, requires = "changed", value_name = "COMMIT[..COMMIT]")]
    commit_range: Option<String>,

    /// Class pattern: exact simple or qualified name, else substring
    #[arg(short, long = "test", value_name = "PATTERN")]
    tests: Vec<String>,

    /// TestNG group to include (repeatable)
    #[arg(long = "group", value_name = "GROUP")]
    groups: Vec<String>,

    /// TestNG group to exclude (repeatable)
    #[arg(long = "exclude-group", value_name = "GROUP")]
    exclude_groups: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select classes, generate the suite document, and run TestNG
    Run {
        #[command(flatten)]
        select: SelectFlags,

        /// Suite document path (default: <output_dir>/testng.xml)
        #[arg(long)]
        suite_out: Option<PathBuf>,
    },

    /// Print the selection without running anything
    Select {
        #[command(flatten)]
        select: SelectFlags,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate the suite document only
    Suite {
        #[command(flatten)]
        select: SelectFlags,

        /// Output path
        #[arg(short, long, default_value = "testng.xml")]
        out: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { select, suite_out } => run_tests(&cli.config, select, suite_out).await,
        Commands::Select { select, format } => print_selection(&cli.config, select, &format).await,
        Commands::Suite { select, out } => generate_suite(&cli.config, select, &out).await,
        Commands::Validate => validate_config(&cli.config),
        Commands::Init => init_config(),
    }
}

/// Merge configuration defaults and command-line flags into the explicit
/// directive value the selector consumes.
fn selection_options(config: &Config, flags: &SelectFlags) -> SelectionOptions {
    let mut include_groups = config.selection.include_groups.clone();
    include_groups.extend(flags.groups.iter().cloned());
    let mut exclude_groups = config.selection.exclude_groups.clone();
    exclude_groups.extend(flags.exclude_groups.iter().cloned());

    SelectionOptions {
        only_failed: flags.failed,
        only_changed: flags.changed,
        commit_range: flags.commit_range.clone(),
        test_patterns: flags.tests.clone(),
        include_groups,
        exclude_groups,
    }
}

async fn build_selection(config: &Config, flags: &SelectFlags) -> Result<Selection> {
    let options = selection_options(config, flags);
    let mode = SelectionMode::from_options(&options)?;
    let groups = GroupFilter::new(options.include_groups, options.exclude_groups);

    // Catalog scanning is bypassed entirely for failed-only and
    // changed-only selection.
    let catalog = if mode.uses_catalog() {
        let path = config.project.workspace.join(&config.project.test_classes);
        let catalog = catalog::scan(&path, &config.project.test_suffix)
            .with_context(|| format!("Failed to scan test classes at {}", path.display()))?;
        info!("Cataloged {} test classes", catalog.len());
        catalog
    } else {
        Default::default()
    };

    let mut provider = GitChangeSet::new(&config.project.workspace).with_pr_diff_timeout(
        Duration::from_secs(config.changes.pr_diff_timeout_secs),
    );
    if let Some(upstream) = &config.changes.upstream {
        provider = provider.with_upstream(upstream);
    }

    let selector = Selector::new(&config.project.workspace, config.results_file())
        .with_test_suffix(&config.project.test_suffix);
    let selection = selector.select(&catalog, &mode, groups, &provider).await?;
    info!("Selected {} test classes", selection.classes.len());
    Ok(selection)
}

fn suite_spec(config: &Config) -> SuiteSpec {
    SuiteSpec::new(&config.project.name).with_listeners(config.runner.listeners.clone())
}

async fn run_tests(
    config_path: &Path,
    flags: SelectFlags,
    suite_out: Option<PathBuf>,
) -> Result<()> {
    let config = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let selection = build_selection(&config, &flags).await?;
    if selection.is_empty() {
        println!("{}", style("No test classes selected.").yellow());
    }

    let suite_path = suite_out.unwrap_or_else(|| config.runner.output_dir.join("testng.xml"));
    suite::write_suite(&suite_path, &suite_spec(&config), &selection)
        .with_context(|| format!("Failed to write suite to {}", suite_path.display()))?;
    info!("Suite document written to {}", suite_path.display());

    let runner = TestNgRunner::new(
        config.runner.clone(),
        config.coverage.clone(),
        config.results_file(),
    );
    let outcome = runner
        .run(&suite_path, &config.classpath.entries)
        .await
        .context("TestNG run failed")?;

    let verdict = if outcome.success() {
        style("PASSED").green().bold()
    } else {
        style("FAILED").red().bold()
    };
    println!(
        "{} {} tests, {} passed, {} failed, {} skipped in {:.1}s",
        verdict,
        outcome.total,
        outcome.passed,
        outcome.failed,
        outcome.skipped,
        outcome.duration.as_secs_f64()
    );

    std::process::exit(outcome.process_exit_code());
}

async fn print_selection(config_path: &Path, flags: SelectFlags, format: &str) -> Result<()> {
    let config = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let selection = build_selection(&config, &flags).await?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&selection)?;
            println!("{}", json);
        }
        _ => {
            println!("Selected {} test classes:", selection.classes.len());
            for class in &selection.classes {
                println!("  {}", class);
            }
            if !selection.groups.is_empty() {
                println!(
                    "Groups: include [{}], exclude [{}]",
                    selection
                        .groups
                        .include
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", "),
                    selection
                        .groups
                        .exclude
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }

    Ok(())
}

async fn generate_suite(config_path: &Path, flags: SelectFlags, out: &Path) -> Result<()> {
    let config = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let selection = build_selection(&config, &flags).await?;

    suite::write_suite(out, &suite_spec(&config), &selection)
        .with_context(|| format!("Failed to write suite to {}", out.display()))?;
    println!(
        "Wrote {} with {} classes",
        out.display(),
        selection.classes.len()
    );
    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            println!("  Project: {}", config.project.name);
            println!("  Test classes: {}", config.project.test_classes.display());
            println!("  Test suffix: {}", config.project.test_suffix);
            println!("  Classpath entries: {}", config.classpath.entries.len());
            println!("  Java: {}", config.runner.java);
            println!("  Output dir: {}", config.runner.output_dir.display());
            println!("  Results file: {}", config.results_file().display());
            println!(
                "  Coverage: {}",
                if config.coverage.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_config() -> Result<()> {
    let config = r#"# tngrun configuration file

[project]
name = "my-app"
workspace = "."
# Packaged test jar or compiled test-classes directory
test_classes = "target/test-classes"

[classpath]
entries = [
  "target/classes",
  "target/test-classes",
  # dependency jars, e.g. from `mvn dependency:build-classpath`
  # "~/.m2/repository/org/testng/testng/7.10.2/testng-7.10.2.jar",
]

[runner]
java = "java"
output_dir = "target/testng"
listeners = []

[selection]
include_groups = []
exclude_groups = []

[changes]
# upstream = "origin/main"
pr_diff_timeout_secs = 10

[coverage]
enabled = false
# agent_jar = "tools/jacocoagent.jar"
output_file = "target/coverage/jacoco.exec"
"#;

    let path = PathBuf::from("tngrun.toml");
    if path.exists() {
        eprintln!("tngrun.toml already exists. Remove it first or edit manually.");
        std::process::exit(1);
    }

    std::fs::write(&path, config)?;
    println!("Created tngrun.toml");
    println!();
    println!("Edit the configuration as needed, then run:");
    println!("  tngrun run");

    Ok(())
}
