//! Test class catalog construction.
//!
//! A catalog is the set of fully qualified class names that are candidates
//! for execution. Candidates come from the compiled test artifact: either a
//! packaged jar (entry enumeration) or a class directory (file walk). Only
//! top-level classes whose name carries the test suffix are kept; inner and
//! anonymous classes never host suite entries.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use tracing::debug;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while building the class catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read test archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A sorted, deduplicated set of fully qualified test class names.
pub type ClassCatalog = BTreeSet<String>;

/// Default naming convention for test classes.
pub const DEFAULT_TEST_SUFFIX: &str = "Test";

/// Build a catalog from a packaged jar or a class directory.
pub fn scan(path: &Path, suffix: &str) -> CatalogResult<ClassCatalog> {
    if path.is_dir() {
        scan_class_dir(path, suffix)
    } else {
        scan_jar(path, suffix)
    }
}

/// Enumerate jar entries and keep test classes.
pub fn scan_jar(path: &Path, suffix: &str) -> CatalogResult<ClassCatalog> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut catalog = BTreeSet::new();
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if let Some(name) = class_name_for_entry(entry.name(), suffix) {
            catalog.insert(name);
        }
    }

    debug!(
        "Found {} test classes in {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

/// Walk a compiled-classes directory and keep test classes.
pub fn scan_class_dir(dir: &Path, suffix: &str) -> CatalogResult<ClassCatalog> {
    let mut catalog = BTreeSet::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let rel = rel.to_string_lossy().replace('\\', "/");
        if let Some(name) = class_name_for_entry(&rel, suffix) {
            catalog.insert(name);
        }
    }

    debug!("Found {} test classes in {}", catalog.len(), dir.display());
    Ok(catalog)
}

/// Convert a `.class` entry path to a binary name, if it is a candidate.
///
/// Inner classes (a `$` in the simple name) and classes without the test
/// suffix are rejected.
fn class_name_for_entry(entry: &str, suffix: &str) -> Option<String> {
    let stem = entry.strip_suffix(".class")?;
    let simple = stem.rsplit('/').next().unwrap_or(stem);
    if simple.contains('$') || !simple.ends_with(suffix) {
        return None;
    }
    Some(stem.replace('/', "."))
}
