//! TestNG results document parsing.
//!
//! TestNG writes a native results document (`testng-results.xml`) for every
//! run. Two readings of it matter here: the set of classes with at least one
//! failed method (feeds failed-only selection on the next run) and the
//! aggregate counts on the root element (feeds the run summary).
//!
//! The document looks like:
//!
//! ```xml
//! <testng-results ignored="0" total="3" passed="1" failed="2" skipped="0">
//!   <suite name="app">
//!     <test name="app">
//!       <class name="com.acme.WidgetTest">
//!         <test-method status="FAIL" name="rejectsNull" .../>
//!         <test-method status="PASS" name="acceptsValid" .../>
//!       </class>
//!     </test>
//!   </suite>
//! </testng-results>
//! ```

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Result type for results-document operations.
pub type ResultsResult<T> = Result<T, ResultsError>;

/// Errors that can occur while reading a results document.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("Malformed results document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute in results document: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Malformed escape in results document: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Aggregate counts from a results document root element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Conventional per-project location of the prior run's results document.
///
/// Lives outside the project tree so a `clean` of the build output does not
/// erase what failed last time.
pub fn default_results_path(project: &str) -> PathBuf {
    std::env::temp_dir()
        .join("tngrun")
        .join(project)
        .join("testng-results.xml")
}

/// Classes with at least one `FAIL` method in a prior results document.
///
/// Returns `Ok(None)` when no document exists at `path`; a present but
/// malformed document is an error.
pub fn failed_classes(path: &Path) -> ResultsResult<Option<BTreeSet<String>>> {
    let xml = match std::fs::read_to_string(path) {
        Ok(xml) => xml,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(failed_classes_str(&xml)?))
}

/// Parse failed classes out of a results document string.
///
/// A class is recorded once no matter how many of its methods failed.
/// Configuration methods count: a broken setup is as much a reason to
/// re-run the class as a broken test.
pub fn failed_classes_str(xml: &str) -> ResultsResult<BTreeSet<String>> {
    let mut reader = Reader::from_str(xml);
    let mut failed = BTreeSet::new();
    let mut current_class: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"class" => {
                    current_class = attr_value(&e, b"name")?;
                }
                b"test-method" => {
                    if attr_value(&e, b"status")?.as_deref() == Some("FAIL") {
                        if let Some(class) = &current_class {
                            failed.insert(class.clone());
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"class" => {
                current_class = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(failed)
}

/// Aggregate counts for a results document on disk, `Ok(None)` when absent.
pub fn run_summary(path: &Path) -> ResultsResult<Option<RunSummary>> {
    let xml = match std::fs::read_to_string(path) {
        Ok(xml) => xml,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(run_summary_str(&xml)?))
}

/// Aggregate counts from a results document string.
pub fn run_summary_str(xml: &str) -> ResultsResult<RunSummary> {
    let mut reader = Reader::from_str(xml);
    let mut summary = RunSummary::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"testng-results" => {
                summary.total = count_attr(&e, b"total")?;
                summary.passed = count_attr(&e, b"passed")?;
                summary.failed = count_attr(&e, b"failed")?;
                summary.skipped = count_attr(&e, b"skipped")?;
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(summary)
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> ResultsResult<Option<String>> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

fn count_attr(e: &BytesStart<'_>, key: &[u8]) -> ResultsResult<usize> {
    // Absent or non-numeric counts read as zero; the document's shape is
    // validated by the method-level parse, not the summary.
    Ok(attr_value(e, key)?
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0))
}
