//! Changed-file discovery and mapping to test classes.
//!
//! Changed-only selection works from two change sets: paths changed in
//! commits (diffed against a comparison point) and paths changed in the
//! working tree. Providers supply the paths; this module maps them onto the
//! test classes they implicate.
//!
//! The mapping follows the Maven-style source conventions:
//!
//! - `**/src/test/java/<pkg>/<Name>Test.java` implicates `<pkg>.<Name>Test`
//!   directly, as long as the file still exists (a deleted test must not be
//!   scheduled).
//! - `**/src/main/java/<pkg>/<Name>.java` implicates the counterpart
//!   `<pkg>.<Name>Test`, but only when that test source actually exists.

pub mod git;

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

/// Result type for change discovery operations.
pub type ChangeSetResult<T> = Result<T, ChangeSetError>;

/// Errors that can occur during change discovery.
#[derive(Debug, thiserror::Error)]
pub enum ChangeSetError {
    #[error("Change discovery command failed: {0}")]
    CommandFailed(String),

    #[error("Change discovery command timed out after {0}s")]
    Timeout(u64),

    #[error("Change discovery command unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies the change sets used by changed-only selection.
///
/// The production implementation shells out to version control; tests
/// substitute a fixed in-memory provider.
#[async_trait]
pub trait ChangeSetProvider: Send + Sync {
    /// Repository-relative paths changed in commits, diffed against a
    /// comparison point (an explicit commit or range when given).
    async fn committed_changes(&self, range: Option<&str>) -> ChangeSetResult<Vec<String>>;

    /// Repository-relative paths changed in the working tree relative to
    /// the current commit.
    async fn uncommitted_changes(&self) -> ChangeSetResult<Vec<String>>;

    /// Provider name (for logging).
    fn name(&self) -> &'static str;
}

/// Derive the test classes implicated by recent changes.
///
/// Both change sets are processed and merged into one deduplicated,
/// sorted set. An empty result is valid: no changes means nothing to run.
pub async fn changed_test_classes(
    provider: &dyn ChangeSetProvider,
    workspace: &Path,
    commit_range: Option<&str>,
) -> ChangeSetResult<BTreeSet<String>> {
    let committed = provider.committed_changes(commit_range).await?;
    let uncommitted = provider.uncommitted_changes().await?;
    debug!(
        "{} committed and {} uncommitted changed paths from {}",
        committed.len(),
        uncommitted.len(),
        provider.name()
    );

    let mut selected = BTreeSet::new();
    for path in committed.iter().chain(uncommitted.iter()) {
        if let Some(class) = test_class_for_change(workspace, path) {
            selected.insert(class);
        }
    }
    Ok(selected)
}

/// Map one changed path to the test class it implicates, if any.
fn test_class_for_change(workspace: &Path, path: &str) -> Option<String> {
    let test_source = Regex::new(r"^(.*?)src/test/java/(.+Test)\.java$").unwrap();
    let main_source = Regex::new(r"^(.*?)src/main/java/(.+)\.java$").unwrap();

    if let Some(caps) = test_source.captures(path) {
        if !is_source_root_prefix(&caps[1]) {
            return None;
        }
        // A deletion shows up in the diff too; only a file still on disk
        // can be scheduled.
        if !workspace.join(path).is_file() {
            debug!("Skipping {path}: test source no longer exists");
            return None;
        }
        return Some(caps[2].replace('/', "."));
    }

    if let Some(caps) = main_source.captures(path) {
        if !is_source_root_prefix(&caps[1]) {
            return None;
        }
        let counterpart = format!("{}src/test/java/{}Test.java", &caps[1], &caps[2]);
        if !workspace.join(&counterpart).is_file() {
            debug!("Skipping {path}: no counterpart test at {counterpart}");
            return None;
        }
        return Some(format!("{}Test", caps[2].replace('/', ".")));
    }

    None
}

/// The text before `src/{main,test}/java/` must be a path prefix, not part
/// of a longer directory name like `mysrc`.
fn is_source_root_prefix(prefix: &str) -> bool {
    prefix.is_empty() || prefix.ends_with('/')
}

/// Fixed in-memory provider, substituted for the git provider in tests.
#[cfg(test)]
pub struct FixedChangeSet {
    pub committed: Vec<String>,
    pub uncommitted: Vec<String>,
}

#[cfg(test)]
#[async_trait]
impl ChangeSetProvider for FixedChangeSet {
    async fn committed_changes(&self, _range: Option<&str>) -> ChangeSetResult<Vec<String>> {
        Ok(self.committed.clone())
    }

    async fn uncommitted_changes(&self) -> ChangeSetResult<Vec<String>> {
        Ok(self.uncommitted.clone())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
