//! Pattern matching for explicit class selection.
//!
//! Patterns are free-form strings from the invoker. Each pattern is tried
//! for exact equality against candidates' simple and fully qualified names
//! first; only a pattern with no exact hit anywhere falls back to substring
//! containment over fully qualified names. A class is selected when at
//! least one pattern selects it.

use std::collections::BTreeSet;

/// The unqualified class name.
pub fn simple_name(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}

/// Filter candidates by patterns, exact hits shadowing fuzzy ones per
/// pattern.
pub fn filter_classes<'a, I>(candidates: I, patterns: &[String]) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let candidates: Vec<&String> = candidates.into_iter().collect();
    let mut selected = BTreeSet::new();

    for pattern in patterns {
        let exact: Vec<&String> = candidates
            .iter()
            .filter(|c| simple_name(c) == pattern || *c == &pattern)
            .copied()
            .collect();

        if !exact.is_empty() {
            selected.extend(exact.into_iter().cloned());
            continue;
        }

        selected.extend(
            candidates
                .iter()
                .filter(|c| c.contains(pattern.as_str()))
                .map(|c| (*c).clone()),
        );
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn patterns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("com.acme.WidgetTest"), "WidgetTest");
        assert_eq!(simple_name("WidgetTest"), "WidgetTest");
    }

    #[test]
    fn test_exact_simple_name_shadows_substring() {
        let catalog = catalog(&["a.b.Foo", "a.b.FooBar"]);
        let selected = filter_classes(&catalog, &patterns(&["Foo"]));
        assert_eq!(selected.iter().collect::<Vec<_>>(), vec!["a.b.Foo"]);
    }

    #[test]
    fn test_exact_qualified_name() {
        let catalog = catalog(&["a.b.FooTest", "a.c.FooTest"]);
        let selected = filter_classes(&catalog, &patterns(&["a.b.FooTest"]));
        assert_eq!(selected.iter().collect::<Vec<_>>(), vec!["a.b.FooTest"]);
    }

    #[test]
    fn test_fuzzy_fallback_when_no_exact_hit() {
        let catalog = catalog(&[
            "a.MyClassTest",
            "a.MyClassUnitTest",
            "a.MyClassIntegrationTest",
        ]);
        let selected = filter_classes(&catalog, &patterns(&["MyClass"]));
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_patterns_are_independent() {
        // "Foo" has an exact hit so it contributes only that; "Bar" has
        // none and falls back to containment.
        let catalog = catalog(&["a.Foo", "a.FooBarTest", "a.BarTest", "a.BarOtherTest"]);
        let selected = filter_classes(&catalog, &patterns(&["Foo", "Bar"]));
        assert_eq!(
            selected.iter().collect::<Vec<_>>(),
            vec!["a.BarOtherTest", "a.BarTest", "a.Foo", "a.FooBarTest"]
        );
    }

    #[test]
    fn test_no_match_is_empty_not_an_error() {
        let catalog = catalog(&["a.b.FooTest"]);
        assert!(filter_classes(&catalog, &patterns(&["Quux"])).is_empty());
    }
}
