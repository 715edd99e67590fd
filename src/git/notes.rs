//! Merge-tolerant note appends.
//!
//! Notes attach content to an object without modifying it. The encoding is
//! JSONL with unique record ids, so the merge is concatenate-then-dedupe:
//! two independent appends to the same target compose as a line-set union.
//! The notes ref itself is still a shared pointer, so each append moves it
//! through the CAS loop; a losing writer re-reads and re-merges, and the
//! union makes every retry convergent.

use git2::{Oid, Repository};

use super::error::{StoreError, WireError};
use super::odb;
use super::refs::{RetryPolicy, with_cas_retry};

/// Read the note attached to `target` under `notes_ref`, if any.
pub fn read_note(
    repo: &Repository,
    notes_ref: &str,
    target: Oid,
) -> Result<Option<String>, StoreError> {
    match repo.find_note(Some(notes_ref), target) {
        Ok(note) => Ok(note.message().map(|s| s.to_string())),
        Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(err) => Err(StoreError::Git(err)),
    }
}

/// Append one JSONL line to the note on `target`.
///
/// The note commit is built by hand (target hex -> blob in the notes tree)
/// rather than through the force-write notes API, so the ref update is a
/// compare-and-swap and a concurrent append can never be silently
/// overwritten.
pub fn append_note(
    repo: &Repository,
    notes_ref: &str,
    target: Oid,
    policy: RetryPolicy,
    line: &str,
) -> Result<(), StoreError> {
    let entry_name = target.to_string();
    with_cas_retry(
        repo,
        notes_ref,
        policy,
        |current| -> Result<(Oid, ()), StoreError> {
            let (base, parents) = match current {
                Some(tip) => {
                    let commit = repo.find_commit(tip).map_err(StoreError::Git)?;
                    (Some(commit.tree().map_err(StoreError::Git)?), vec![tip])
                }
                None => (None, Vec::new()),
            };
            let existing = match &base {
                Some(tree) => match odb::read_blob(repo, tree, &entry_name)? {
                    Some(bytes) => Some(
                        String::from_utf8(bytes)
                            .map_err(|e| StoreError::Wire(WireError::Utf8(e)))?,
                    ),
                    None => None,
                },
                None => None,
            };
            let merged = merge_note_content(existing.as_deref().unwrap_or(""), line);
            let blob = odb::write_blob(repo, merged.as_bytes())?;
            let tree = odb::put_entries(repo, base.as_ref(), &[(&entry_name, blob)])?;
            let commit = odb::commit_tree(
                repo,
                tree,
                &parents,
                &format!("opslog(chat): note on {entry_name}"),
            )?;
            Ok((commit, ()))
        },
    )
}

/// Union of two note bodies: concatenate, drop exact duplicate lines, keep
/// first-occurrence order. Associative, so concurrent appends converge.
pub fn merge_note_content(existing: &str, addition: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut out = String::new();
    for line in existing.lines().chain(addition.lines()) {
        if line.trim().is_empty() {
            continue;
        }
        if seen.insert(line.to_string()) {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_dedupes_and_preserves_order() {
        let merged = merge_note_content("a\nb\n", "b\nc\n");
        assert_eq!(merged, "a\nb\nc\n");
    }

    #[test]
    fn merge_is_associative_for_concurrent_appends() {
        let base = "m1\n";
        let left = merge_note_content(base, "m2\n");
        let right = merge_note_content(base, "m3\n");
        // Either writer can land second; both orders carry all three lines.
        let lr = merge_note_content(&left, &right);
        let rl = merge_note_content(&right, &left);
        for merged in [lr, rl] {
            for line in ["m1", "m2", "m3"] {
                assert!(merged.lines().any(|l| l == line));
            }
        }
    }

    #[test]
    fn merge_ignores_blank_lines() {
        assert_eq!(merge_note_content("a\n\n", "\nb\n"), "a\nb\n");
    }

    #[test]
    fn appended_notes_accumulate_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let target = repo.blob(b"anchor").unwrap();

        let policy = RetryPolicy::default();
        append_note(&repo, "refs/notes/test", target, policy, "{\"a\":1}").unwrap();
        append_note(&repo, "refs/notes/test", target, policy, "{\"b\":2}").unwrap();

        let body = read_note(&repo, "refs/notes/test", target).unwrap().unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
    }
}
