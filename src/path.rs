//! Structural path composition.
//!
//! Paths are `.`-joined field names, optionally prefixed by a namespace.
//! Both the declaration side and the persistence side build paths through
//! [`compose`], so registered paths and live paths compare by plain string
//! equality.

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Join segments with `.`, skipping empty ones.
///
/// A missing namespace therefore never produces a leading separator:
/// `compose(["", "token"]) == "token"`.
pub fn compose<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push(SEPARATOR);
        }
        out.push_str(segment);
    }
    out
}

/// Prefix `path` with an optional namespace.
pub fn compose_with(namespace: Option<&str>, path: &str) -> String {
    compose([namespace.unwrap_or_default(), path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compose_with_namespace() {
        assert_eq!(compose(["app", "token"]), "app.token");
        assert_eq!(compose(["app", "info", "telephone"]), "app.info.telephone");
    }

    #[test]
    fn test_compose_skips_empty_segments() {
        assert_eq!(compose(["", "token"]), "token");
        assert_eq!(compose(["app", "", "token", ""]), "app.token");
        assert_eq!(compose([""; 3]), "");
    }

    #[test]
    fn test_compose_with_optional_namespace() {
        assert_eq!(compose_with(Some("global"), "foo.bar"), "global.foo.bar");
        assert_eq!(compose_with(None, "foo.bar"), "foo.bar");
        assert_eq!(compose_with(Some(""), "foo"), "foo");
    }

    proptest! {
        #[test]
        fn prop_compose_never_has_stray_separators(
            segments in prop::collection::vec("[a-z]{0,4}", 0..6)
        ) {
            let path = compose(segments.iter().map(String::as_str));
            prop_assert!(!path.starts_with(SEPARATOR));
            prop_assert!(!path.ends_with(SEPARATOR));
            prop_assert!(!path.contains(".."));
        }

        #[test]
        fn prop_compose_is_associative(
            a in "[a-z]{0,4}", b in "[a-z]{0,4}", c in "[a-z]{0,4}"
        ) {
            let nested = compose([compose([a.as_str(), b.as_str()]).as_str(), c.as_str()]);
            prop_assert_eq!(nested, compose([a.as_str(), b.as_str(), c.as_str()]));
        }
    }
}
