//! Git-backed change discovery.
//!
//! Committed changes prefer the platform pull-request diff (`gh pr diff`)
//! when no explicit comparison point is given; that command hangs on
//! network trouble, so it runs under a bounded wait and anything wrong with
//! it (missing binary, non-zero exit, timeout) silently falls through to a
//! plain branch diff against the default upstream reference.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ChangeSetError, ChangeSetProvider, ChangeSetResult};

/// Bound on the pull-request diff attempt before falling back.
pub const PR_DIFF_TIMEOUT_SECS: u64 = 10;

/// Change discovery over a local git checkout.
pub struct GitChangeSet {
    workspace: PathBuf,
    upstream: Option<String>,
    pr_diff_timeout: Duration,
}

impl GitChangeSet {
    /// Create a provider rooted at the given checkout.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            upstream: None,
            pr_diff_timeout: Duration::from_secs(PR_DIFF_TIMEOUT_SECS),
        }
    }

    /// Override the upstream reference used by the branch-diff fallback.
    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = Some(upstream.into());
        self
    }

    /// Override the bound on the pull-request diff attempt.
    pub fn with_pr_diff_timeout(mut self, timeout: Duration) -> Self {
        self.pr_diff_timeout = timeout;
        self
    }

    /// Run a command in the checkout and collect its non-empty output lines.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> ChangeSetResult<Vec<String>> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = if let Some(timeout) = timeout {
            match tokio::time::timeout(timeout, cmd.output()).await {
                Ok(output) => output,
                Err(_) => return Err(ChangeSetError::Timeout(timeout.as_secs())),
            }
        } else {
            cmd.output().await
        };
        let output =
            output.map_err(|e| ChangeSetError::Unavailable(format!("{program}: {e}")))?;

        if !output.status.success() {
            return Err(ChangeSetError::CommandFailed(format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// The reference the branch diff compares against.
    ///
    /// `origin/HEAD` names the remote's default branch when one is set.
    async fn upstream_ref(&self) -> String {
        if let Some(upstream) = &self.upstream {
            return upstream.clone();
        }
        if let Ok(lines) = self
            .run("git", &["symbolic-ref", "refs/remotes/origin/HEAD"], None)
            .await
        {
            if let Some(full) = lines.first() {
                if let Some(short) = full.strip_prefix("refs/remotes/") {
                    return short.to_string();
                }
            }
        }
        "origin/main".to_string()
    }
}

#[async_trait]
impl ChangeSetProvider for GitChangeSet {
    async fn committed_changes(&self, range: Option<&str>) -> ChangeSetResult<Vec<String>> {
        if let Some(range) = range {
            // A bare commit means "changes since that commit".
            let range = if range.contains("..") {
                range.to_string()
            } else {
                format!("{range}..HEAD")
            };
            return self.run("git", &["diff", "--name-only", &range], None).await;
        }

        match self
            .run(
                "gh",
                &["pr", "diff", "--name-only"],
                Some(self.pr_diff_timeout),
            )
            .await
        {
            Ok(paths) => return Ok(paths),
            Err(e) => debug!("PR diff unavailable ({e}), falling back to branch diff"),
        }

        let upstream = self.upstream_ref().await;
        let spec = format!("{upstream}...HEAD");
        self.run("git", &["diff", "--name-only", &spec], None).await
    }

    async fn uncommitted_changes(&self) -> ChangeSetResult<Vec<String>> {
        self.run("git", &["diff", "--name-only", "HEAD"], None).await
    }

    fn name(&self) -> &'static str {
        "git"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn test_bounded_wait_cuts_off_slow_commands() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            GitChangeSet::new(dir.path()).with_pr_diff_timeout(Duration::from_millis(200));

        let start = Instant::now();
        let result = provider
            .run("sleep", &["30"], Some(provider.pr_diff_timeout))
            .await;
        assert!(matches!(result, Err(ChangeSetError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_command_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GitChangeSet::new(dir.path());
        let result = provider
            .run("tngrun-no-such-command", &["x"], None)
            .await;
        assert!(matches!(result, Err(ChangeSetError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_committed_changes_outside_a_repo_fail_after_fallbacks() {
        // Not a git checkout: the PR diff attempt and the branch-diff
        // fallback both fail, and the final failure surfaces.
        let dir = tempfile::tempdir().unwrap();
        let provider = GitChangeSet::new(dir.path())
            .with_upstream("origin/main")
            .with_pr_diff_timeout(Duration::from_millis(200));
        assert!(provider.committed_changes(None).await.is_err());
    }

    #[tokio::test]
    async fn test_explicit_range_is_used_verbatim() {
        // Still not a repo, so the command fails, but the failure proves the
        // explicit range short-circuits the PR-diff path (no timeout taken).
        let dir = tempfile::tempdir().unwrap();
        let provider = GitChangeSet::new(dir.path());
        let start = Instant::now();
        let result = provider.committed_changes(Some("abc123..def456")).await;
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
