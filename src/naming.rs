use crate::parse::DocumentRef;
use crate::{DOCUMENT_SUFFIX, MAX_NAME_BYTES};

/// How output files are named. Chosen once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingPolicy {
    /// Named after the document title, positional when the title is unusable.
    #[default]
    FromTitle,
    /// Always `page-<page>-document-<ordinal>`.
    Positional,
}

const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Removes characters that can't appear in a file name and trims the result.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// File name for the `ordinal`-th (1-based) reference extracted from `page`.
///
/// Always non-empty and always ends with the document suffix.
pub fn derive_name(
    reference: &DocumentRef,
    page: u32,
    ordinal: usize,
    policy: NamingPolicy,
) -> String {
    let stem = match (policy, reference.title.as_deref()) {
        (NamingPolicy::FromTitle, Some(title)) => title_stem(title),
        _ => None,
    }
    .unwrap_or_else(|| positional_stem(page, ordinal));

    format!("{stem}{DOCUMENT_SUFFIX}")
}

fn title_stem(title: &str) -> Option<String> {
    let clean = sanitize_name(title);
    if clean.is_empty() {
        return None;
    }
    let max_stem = MAX_NAME_BYTES - DOCUMENT_SUFFIX.len();
    if clean.len() <= max_stem {
        return Some(clean);
    }
    // Cut on a char boundary so multi-byte titles stay valid UTF-8.
    let mut end = max_stem;
    while !clean.is_char_boundary(end) {
        end -= 1;
    }
    Some(clean[..end].trim_end().to_string())
}

#[inline]
fn positional_stem(page: u32, ordinal: usize) -> String {
    format!("page-{page}-document-{ordinal}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use url::Url;

    use super::*;

    fn reference(title: Option<&str>) -> DocumentRef {
        DocumentRef {
            title: title.map(String::from),
            url: Url::parse("https://link.springer.com/content/pdf/x.pdf").unwrap(),
        }
    }

    #[test]
    fn sanitize_strips_illegal_chars_and_trims() {
        assert_eq!(sanitize_name("My: Paper?"), "My Paper");
        assert_eq!(sanitize_name(r#"  a\b/c:d*e?f"g<h>i|j  "#), "abcdefghij");
        assert_eq!(sanitize_name("tab\there"), "tabhere");
    }

    #[test]
    fn title_becomes_file_name() {
        let name = derive_name(
            &reference(Some("Cells: A Review")),
            1,
            1,
            NamingPolicy::FromTitle,
        );
        assert_eq!(name, "Cells A Review.pdf");
    }

    #[test]
    fn unusable_titles_fall_back_to_unique_positional_names() {
        let refs = [
            reference(Some("")),
            reference(Some(" ?:* ")),
            reference(None),
            reference(Some("|||")),
        ];

        let names = refs
            .iter()
            .enumerate()
            .map(|(i, r)| derive_name(r, 3, i + 1, NamingPolicy::FromTitle))
            .collect::<Vec<_>>();

        assert_eq!(names[0], "page-3-document-1.pdf");
        assert_eq!(names[3], "page-3-document-4.pdf");
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), refs.len());
    }

    #[test]
    fn positional_policy_ignores_titles() {
        let name = derive_name(&reference(Some("A Title")), 12, 5, NamingPolicy::Positional);
        assert_eq!(name, "page-12-document-5.pdf");
    }

    #[test]
    fn long_titles_are_truncated() {
        let title = "word ".repeat(100);
        let name = derive_name(&reference(Some(&title)), 1, 1, NamingPolicy::FromTitle);

        let stem = name.strip_suffix(".pdf").unwrap();
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(stem.starts_with("word word"));
        assert!(!stem.ends_with(' '));
    }

    #[test]
    fn multi_byte_titles_fit_filesystem_name_limit() {
        let title = "細胞".repeat(100);
        let name = derive_name(&reference(Some(&title)), 1, 1, NamingPolicy::FromTitle);

        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(name.ends_with(".pdf"));
        assert!(name.starts_with("細胞細胞"));

        let accented = "é".repeat(300);
        let name = derive_name(&reference(Some(&accented)), 1, 1, NamingPolicy::FromTitle);
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.strip_suffix(".pdf").unwrap().chars().all(|c| c == 'é'));
    }
}
