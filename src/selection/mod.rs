//! Test selection policy.
//!
//! Given a catalog of candidate classes and a selection mode, the selector
//! produces the ordered, deduplicated set of fully qualified class names to
//! embed in the generated suite, plus the method-level group filter. Group
//! filtering is orthogonal to class selection: it never changes which
//! classes are chosen, only which methods run inside them.

pub mod pattern;

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{ClassCatalog, DEFAULT_TEST_SUFFIX};
use crate::changes::{self, ChangeSetError, ChangeSetProvider};
use crate::results::{self, ResultsError};

/// Result type for selection operations.
pub type SelectionResult<T> = Result<T, SelectionError>;

/// Errors that can occur during selection.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("--failed and --changed cannot be combined")]
    ConflictingModes,

    #[error("Failed to read prior results: {0}")]
    Results(#[from] ResultsError),

    #[error("Failed to discover changed files: {0}")]
    Changes(#[from] ChangeSetError),
}

/// How test classes are chosen for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Every catalog class carrying the test suffix.
    All,
    /// Catalog classes matching at least one pattern.
    Matching(Vec<String>),
    /// Classes with a failed method in the previous run's results.
    OnlyFailed,
    /// Classes implicated by committed and uncommitted changes.
    OnlyChanged { commit_range: Option<String> },
}

/// Selection directives as supplied by the invoker.
///
/// Exactly one mode follows from these; the two boolean directives are
/// mutually exclusive and their combination is rejected rather than
/// silently resolved.
#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    pub only_failed: bool,
    pub only_changed: bool,
    pub commit_range: Option<String>,
    pub test_patterns: Vec<String>,
    pub include_groups: Vec<String>,
    pub exclude_groups: Vec<String>,
}

impl SelectionMode {
    /// Derive the active mode from the supplied directives.
    pub fn from_options(options: &SelectionOptions) -> SelectionResult<Self> {
        match (options.only_failed, options.only_changed) {
            (true, true) => Err(SelectionError::ConflictingModes),
            (true, false) => Ok(SelectionMode::OnlyFailed),
            (false, true) => Ok(SelectionMode::OnlyChanged {
                commit_range: options.commit_range.clone(),
            }),
            (false, false) if !options.test_patterns.is_empty() => {
                Ok(SelectionMode::Matching(options.test_patterns.clone()))
            }
            (false, false) => Ok(SelectionMode::All),
        }
    }

    /// Whether this mode reads the class catalog at all.
    ///
    /// Failed-only and changed-only selection work entirely from the prior
    /// results document and the diff, so catalog scanning can be skipped.
    pub fn uses_catalog(&self) -> bool {
        matches!(self, SelectionMode::All | SelectionMode::Matching(_))
    }
}

/// Method-level group filter, embedded verbatim in the suite document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilter {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl GroupFilter {
    pub fn new(
        include: impl IntoIterator<Item = String>,
        exclude: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// The classes to run plus the group filter to embed in the suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub classes: BTreeSet<String>,
    pub groups: GroupFilter,
}

impl Selection {
    /// An empty selection is valid; the suite will simply run nothing.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Applies mode policy to produce the selection for one invocation.
///
/// The selector is pure with respect to its inputs apart from reading the
/// prior results document, invoking the change-set provider, and checking
/// source files for existence; identical inputs yield identical selections.
pub struct Selector {
    workspace: PathBuf,
    results_file: PathBuf,
    test_suffix: String,
}

impl Selector {
    pub fn new(workspace: impl Into<PathBuf>, results_file: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            results_file: results_file.into(),
            test_suffix: DEFAULT_TEST_SUFFIX.to_string(),
        }
    }

    /// Override the test-class naming suffix.
    pub fn with_test_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.test_suffix = suffix.into();
        self
    }

    /// Produce the selection for the given catalog, mode, and group filter.
    pub async fn select(
        &self,
        catalog: &ClassCatalog,
        mode: &SelectionMode,
        groups: GroupFilter,
        provider: &dyn ChangeSetProvider,
    ) -> SelectionResult<Selection> {
        let classes = match mode {
            SelectionMode::All => catalog
                .iter()
                .filter(|c| pattern::simple_name(c).ends_with(&self.test_suffix))
                .cloned()
                .collect(),
            SelectionMode::Matching(patterns) => pattern::filter_classes(
                catalog
                    .iter()
                    .filter(|c| pattern::simple_name(c).ends_with(&self.test_suffix)),
                patterns,
            ),
            SelectionMode::OnlyFailed => match results::failed_classes(&self.results_file)? {
                Some(classes) => {
                    info!(
                        "{} classes failed in the previous run",
                        classes.len()
                    );
                    classes
                }
                None => {
                    warn!(
                        "No results from a previous run at {}; nothing to re-run",
                        self.results_file.display()
                    );
                    BTreeSet::new()
                }
            },
            SelectionMode::OnlyChanged { commit_range } => {
                changes::changed_test_classes(provider, &self.workspace, commit_range.as_deref())
                    .await?
            }
        };

        Ok(Selection { classes, groups })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::changes::FixedChangeSet;

    fn catalog(names: &[&str]) -> ClassCatalog {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn no_changes() -> FixedChangeSet {
        FixedChangeSet {
            committed: vec![],
            uncommitted: vec![],
        }
    }

    fn selector(dir: &Path) -> Selector {
        Selector::new(dir, dir.join("testng-results.xml"))
    }

    #[test]
    fn test_mode_derivation() {
        let mut options = SelectionOptions::default();
        assert_eq!(
            SelectionMode::from_options(&options).unwrap(),
            SelectionMode::All
        );

        options.test_patterns = vec!["Widget".to_string()];
        assert_eq!(
            SelectionMode::from_options(&options).unwrap(),
            SelectionMode::Matching(vec!["Widget".to_string()])
        );

        options = SelectionOptions {
            only_failed: true,
            ..Default::default()
        };
        assert_eq!(
            SelectionMode::from_options(&options).unwrap(),
            SelectionMode::OnlyFailed
        );

        options = SelectionOptions {
            only_changed: true,
            commit_range: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SelectionMode::from_options(&options).unwrap(),
            SelectionMode::OnlyChanged {
                commit_range: Some("abc123".to_string()),
            }
        );
    }

    #[test]
    fn test_conflicting_directives_rejected() {
        let options = SelectionOptions {
            only_failed: true,
            only_changed: true,
            ..Default::default()
        };
        assert!(matches!(
            SelectionMode::from_options(&options),
            Err(SelectionError::ConflictingModes)
        ));
    }

    #[test]
    fn test_patterns_do_not_override_explicit_modes() {
        // A pattern list next to --failed narrows nothing; the boolean
        // directive wins the mode derivation.
        let options = SelectionOptions {
            only_failed: true,
            test_patterns: vec!["Widget".to_string()],
            ..Default::default()
        };
        assert_eq!(
            SelectionMode::from_options(&options).unwrap(),
            SelectionMode::OnlyFailed
        );
    }

    #[tokio::test]
    async fn test_all_mode_is_suffix_filtered_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(&["b.ZTest", "a.ATest", "a.Helper", "a.ATest"]);
        let selection = selector(dir.path())
            .select(&catalog, &SelectionMode::All, GroupFilter::default(), &no_changes())
            .await
            .unwrap();
        assert_eq!(
            selection.classes.iter().collect::<Vec<_>>(),
            vec!["a.ATest", "b.ZTest"]
        );
    }

    #[tokio::test]
    async fn test_matching_mode_applies_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(&["a.WidgetTest", "a.GadgetTest", "a.WidgetUnitTest"]);
        let selection = selector(dir.path())
            .select(
                &catalog,
                &SelectionMode::Matching(vec!["Widget".to_string()]),
                GroupFilter::default(),
                &no_changes(),
            )
            .await
            .unwrap();
        assert_eq!(
            selection.classes.iter().collect::<Vec<_>>(),
            vec!["a.WidgetTest", "a.WidgetUnitTest"]
        );
    }

    #[tokio::test]
    async fn test_failed_mode_bypasses_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let results_file = dir.path().join("testng-results.xml");
        std::fs::write(
            &results_file,
            r#"<testng-results total="2" passed="1" failed="1" skipped="0">
  <suite name="s"><test name="t">
    <class name="com.acme.BrokenTest">
      <test-method status="FAIL" name="a"/>
      <test-method status="PASS" name="b"/>
    </class>
  </test></suite>
</testng-results>"#,
        )
        .unwrap();

        // The catalog doesn't even contain the failed class; it is not
        // consulted in this mode.
        let catalog = catalog(&["a.OtherTest"]);
        let selection = Selector::new(dir.path(), &results_file)
            .select(
                &catalog,
                &SelectionMode::OnlyFailed,
                GroupFilter::default(),
                &no_changes(),
            )
            .await
            .unwrap();
        assert_eq!(
            selection.classes.iter().collect::<Vec<_>>(),
            vec!["com.acme.BrokenTest"]
        );
    }

    #[tokio::test]
    async fn test_failed_mode_without_prior_results_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let selection = selector(dir.path())
            .select(
                &catalog(&["a.ATest"]),
                &SelectionMode::OnlyFailed,
                GroupFilter::default(),
                &no_changes(),
            )
            .await
            .unwrap();
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mode_malformed_results_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let results_file = dir.path().join("testng-results.xml");
        std::fs::write(&results_file, "<testng-results><class").unwrap();

        let result = Selector::new(dir.path(), &results_file)
            .select(
                &ClassCatalog::new(),
                &SelectionMode::OnlyFailed,
                GroupFilter::default(),
                &no_changes(),
            )
            .await;
        assert!(matches!(result, Err(SelectionError::Results(_))));
    }

    #[tokio::test]
    async fn test_changed_mode_uses_provider() {
        let dir = tempfile::tempdir().unwrap();
        let rel = "src/test/java/com/acme/WidgetTest.java";
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "class WidgetTest {}").unwrap();

        let provider = FixedChangeSet {
            committed: vec![rel.to_string()],
            uncommitted: vec![],
        };
        let selection = selector(dir.path())
            .select(
                &ClassCatalog::new(),
                &SelectionMode::OnlyChanged { commit_range: None },
                GroupFilter::default(),
                &provider,
            )
            .await
            .unwrap();
        assert_eq!(
            selection.classes.iter().collect::<Vec<_>>(),
            vec!["com.acme.WidgetTest"]
        );
    }

    #[tokio::test]
    async fn test_group_filter_is_orthogonal_to_classes() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(&["a.ATest", "b.BTest"]);
        let groups = GroupFilter::new(
            ["smoke".to_string()],
            ["slow".to_string()],
        );
        let selection = selector(dir.path())
            .select(&catalog, &SelectionMode::All, groups.clone(), &no_changes())
            .await
            .unwrap();
        // Same classes as without a filter; only the group block changes.
        assert_eq!(selection.classes.len(), 2);
        assert_eq!(selection.groups, groups);
    }

    #[tokio::test]
    async fn test_selection_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(&["a.ATest", "b.BTest", "c.CHelper"]);
        let selector = selector(dir.path());
        let first = selector
            .select(&catalog, &SelectionMode::All, GroupFilter::default(), &no_changes())
            .await
            .unwrap();
        let second = selector
            .select(&catalog, &SelectionMode::All, GroupFilter::default(), &no_changes())
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
