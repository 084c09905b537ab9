//! Slash-path handling for URL construction.
//!
//! Tree paths travel inside URLs as slash-separated segments with no leading
//! slash. Callers pass both `"a/b"` and `"/a/b"`; [`normalize`] folds the
//! second form into the first before the path is spliced into a URL.

/// Strip exactly one leading slash, if present.
///
/// Total over all strings; `""` stays `""` and `"//a"` becomes `"/a"`.
pub fn normalize(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Join parts with a single slash between non-empty parts.
///
/// Empty parts vanish instead of producing doubled or trailing slashes, so
/// `join(["data", ""])` is `"data"` (the whole-tree form of the data path).
pub fn join<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut joined = String::new();
    for part in parts.into_iter().filter(|part| !part.is_empty()) {
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(part);
    }
    joined
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn normalize_strips_one_leading_slash() {
        assert_eq!(normalize("/a/b"), "a/b");
        assert_eq!(normalize("a/b"), "a/b");
        assert_eq!(normalize("//a"), "/a");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn join_skips_empty_parts() {
        assert_eq!(join(["update", "key", "a/b"]), "update/key/a/b");
        assert_eq!(join(["data", ""]), "data");
        assert_eq!(join(["", "state"]), "state");
        assert_eq!(join::<[&str; 0]>([]), "");
    }

    proptest! {
        #[test]
        fn normalize_undoes_one_prefix(path in "[a-z/]{0,16}") {
            let prefixed = format!("/{path}");
            prop_assert_eq!(normalize(&prefixed), path);
        }

        #[test]
        fn join_single_part_is_identity(part in "[a-z]{1,12}") {
            prop_assert_eq!(join([part.as_str()]), part);
        }
    }
}
