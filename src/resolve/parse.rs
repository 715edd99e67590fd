//! Reference extraction from free text.
//!
//! The grammar is `@<kind>:<id>` with `kind` drawn from the closed
//! vocabulary. Parsing never fails: an unmatched `@`, an unknown kind, or a
//! missing id is plain text and simply produces no reference.

use crate::core::{RefKind, Reference};

/// Characters allowed in a reference id. The `#` admits file line ranges
/// (`@file:src/main.rs#L10-L20`), `/` admits paths and namespaced names.
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '#')
}

fn is_kind_char(c: char) -> bool {
    c.is_ascii_lowercase()
}

/// Extract every well-formed reference from `text`, in order of appearance.
/// Duplicates are kept; the caller decides whether order or uniqueness
/// matters.
pub fn parse_refs(text: &str) -> Vec<Reference> {
    let mut refs = Vec::new();
    let bytes = text.char_indices().collect::<Vec<_>>();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].1 != '@' {
            i += 1;
            continue;
        }
        // Candidate: @kind:id
        let mut j = i + 1;
        while j < bytes.len() && is_kind_char(bytes[j].1) {
            j += 1;
        }
        if j == i + 1 || j >= bytes.len() || bytes[j].1 != ':' {
            i += 1;
            continue;
        }
        let kind_str: String = bytes[i + 1..j].iter().map(|(_, c)| *c).collect();
        let Ok(kind) = RefKind::parse(&kind_str) else {
            // Unknown kind is plain text, not an error.
            i = j;
            continue;
        };
        let mut k = j + 1;
        while k < bytes.len() && is_id_char(bytes[k].1) {
            k += 1;
        }
        if k == j + 1 {
            // `@kind:` with no id is still just text.
            i = j + 1;
            continue;
        }
        let id: String = bytes[j + 1..k].iter().map(|(_, c)| *c).collect();
        refs.push(Reference::new(kind, id));
        i = k;
    }

    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_references_in_order() {
        let refs = parse_refs("deployed @run:0001724970000-ab12 per @user:alice");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].kind, RefKind::Run);
        assert_eq!(refs[0].id, "0001724970000-ab12");
        assert_eq!(refs[1], Reference::new(RefKind::User, "alice"));
    }

    #[test]
    fn unknown_kind_is_plain_text() {
        assert!(parse_refs("see @issue:42 for details").is_empty());
    }

    #[test]
    fn bare_at_is_just_a_character() {
        assert!(parse_refs("mail me @ the office, or x@y.com").is_empty());
        assert!(parse_refs("@").is_empty());
        assert!(parse_refs("trailing @commit:").is_empty());
    }

    #[test]
    fn file_reference_keeps_line_range() {
        let refs = parse_refs("broken at @file:src/main.rs#L10-L20, see above");
        assert_eq!(refs, vec![Reference::new(RefKind::File, "src/main.rs#L10-L20")]);
    }

    #[test]
    fn duplicates_are_kept() {
        let refs = parse_refs("@user:bob and @user:bob again");
        assert_eq!(refs.len(), 2);
    }
}
