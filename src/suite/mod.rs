//! TestNG suite document generation.
//!
//! Serializes a selection into the suite description TestNG consumes: one
//! suite containing one logical test run, an optional group include/exclude
//! block, and one class entry per selected name. Pure formatting, no policy.
//!
//! # Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE suite SYSTEM "https://testng.org/testng-1.0.dtd">
//! <suite name="app">
//!   <listeners>
//!     <listener class-name="com.acme.ci.FlakyRetryListener"/>
//!   </listeners>
//!   <test name="app">
//!     <groups>
//!       <run>
//!         <include name="smoke"/>
//!         <exclude name="slow"/>
//!       </run>
//!     </groups>
//!     <classes>
//!       <class name="com.acme.WidgetTest"/>
//!     </classes>
//!   </test>
//! </suite>
//! ```

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::selection::Selection;

const TESTNG_DTD: &str = "https://testng.org/testng-1.0.dtd";

/// Naming and listeners for a rendered suite document.
#[derive(Debug, Clone)]
pub struct SuiteSpec {
    /// Suite name attribute.
    pub suite_name: String,
    /// Name of the single logical test run inside the suite.
    pub test_name: String,
    /// Listener class names appended verbatim.
    pub listeners: Vec<String>,
}

impl SuiteSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            test_name: name.clone(),
            suite_name: name,
            listeners: Vec::new(),
        }
    }

    pub fn with_listeners(mut self, listeners: Vec<String>) -> Self {
        self.listeners = listeners;
        self
    }
}

/// Render the suite document for a selection.
///
/// An empty selection still renders a well-formed suite; running it simply
/// executes nothing.
pub fn render_suite(spec: &SuiteSpec, selection: &Selection) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(format!(
        "suite SYSTEM \"{TESTNG_DTD}\""
    ))))?;

    let mut suite = BytesStart::new("suite");
    suite.push_attribute(("name", spec.suite_name.as_str()));
    writer.write_event(Event::Start(suite))?;

    if !spec.listeners.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("listeners")))?;
        for listener in &spec.listeners {
            let mut el = BytesStart::new("listener");
            el.push_attribute(("class-name", listener.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        writer.write_event(Event::End(BytesEnd::new("listeners")))?;
    }

    let mut test = BytesStart::new("test");
    test.push_attribute(("name", spec.test_name.as_str()));
    writer.write_event(Event::Start(test))?;

    if !selection.groups.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("groups")))?;
        writer.write_event(Event::Start(BytesStart::new("run")))?;
        for group in &selection.groups.include {
            let mut el = BytesStart::new("include");
            el.push_attribute(("name", group.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        for group in &selection.groups.exclude {
            let mut el = BytesStart::new("exclude");
            el.push_attribute(("name", group.as_str()));
            writer.write_event(Event::Empty(el))?;
        }
        writer.write_event(Event::End(BytesEnd::new("run")))?;
        writer.write_event(Event::End(BytesEnd::new("groups")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("classes")))?;
    for class in &selection.classes {
        let mut el = BytesStart::new("class");
        el.push_attribute(("name", class.as_str()));
        writer.write_event(Event::Empty(el))?;
    }
    writer.write_event(Event::End(BytesEnd::new("classes")))?;

    writer.write_event(Event::End(BytesEnd::new("test")))?;
    writer.write_event(Event::End(BytesEnd::new("suite")))?;

    let xml = String::from_utf8(writer.into_inner())?;
    Ok(xml)
}

/// Write the suite document, creating parent directories as needed.
pub fn write_suite(path: &Path, spec: &SuiteSpec, selection: &Selection) -> anyhow::Result<()> {
    let xml = render_suite(spec, selection)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, xml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::selection::GroupFilter;

    use super::*;

    fn selection(classes: &[&str], groups: GroupFilter) -> Selection {
        Selection {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            groups,
        }
    }

    #[test]
    fn test_classes_sorted_and_closed() {
        let xml = render_suite(
            &SuiteSpec::new("app"),
            &selection(&["b.ZTest", "a.ATest"], GroupFilter::default()),
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<!DOCTYPE suite SYSTEM \"https://testng.org/testng-1.0.dtd\">"));
        let a = xml.find("<class name=\"a.ATest\"/>").unwrap();
        let z = xml.find("<class name=\"b.ZTest\"/>").unwrap();
        assert!(a < z);
        assert!(xml.ends_with("</suite>"));
        // No group block without a filter
        assert!(!xml.contains("<groups>"));
    }

    #[test]
    fn test_group_block_rendered() {
        let groups = GroupFilter::new(["smoke".to_string()], ["slow".to_string()]);
        let xml = render_suite(&SuiteSpec::new("app"), &selection(&["a.ATest"], groups)).unwrap();
        assert!(xml.contains("<include name=\"smoke\"/>"));
        assert!(xml.contains("<exclude name=\"slow\"/>"));
    }

    #[test]
    fn test_listeners_appended_verbatim() {
        let spec = SuiteSpec::new("app")
            .with_listeners(vec!["com.acme.ci.FlakyRetryListener".to_string()]);
        let xml = render_suite(&spec, &selection(&[], GroupFilter::default())).unwrap();
        assert!(xml.contains("<listener class-name=\"com.acme.ci.FlakyRetryListener\"/>"));
    }

    #[test]
    fn test_empty_selection_is_well_formed() {
        let xml = render_suite(
            &SuiteSpec::new("app"),
            &selection(&[], GroupFilter::default()),
        )
        .unwrap();
        assert!(xml.contains("<classes>"));
        assert!(xml.contains("</suite>"));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target/testng/testng.xml");
        write_suite(
            &path,
            &SuiteSpec::new("app"),
            &selection(&["a.ATest"], GroupFilter::default()),
        )
        .unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("a.ATest"));
    }
}
