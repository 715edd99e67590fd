//! Object database primitives.
//!
//! Blobs, trees, commits, and annotated tags are constructed directly in the
//! object database. No working-copy checkout ever happens here, so ledger
//! and chat writes never disturb the user's active files.

use git2::{Oid, Repository, Signature};

use super::error::StoreError;

const TAGGER_NAME: &str = "opslog";
const TAGGER_EMAIL: &str = "opslog@localhost";

/// Committer/tagger identity for all subsystem-authored objects.
pub fn signature() -> Result<Signature<'static>, StoreError> {
    Signature::now(TAGGER_NAME, TAGGER_EMAIL).map_err(StoreError::Git)
}

pub fn write_blob(repo: &Repository, bytes: &[u8]) -> Result<Oid, StoreError> {
    repo.blob(bytes).map_err(StoreError::WriteBlob)
}

/// Write a new tree derived from `base` with each `(path, blob)` entry
/// inserted or replaced. Paths are `/`-separated; intermediate trees are
/// created as needed.
pub fn put_entries(
    repo: &Repository,
    base: Option<&git2::Tree<'_>>,
    entries: &[(&str, Oid)],
) -> Result<Oid, StoreError> {
    let mut tree_oid = match base {
        Some(tree) => tree.id(),
        None => empty_tree(repo)?,
    };
    for (path, blob) in entries {
        let tree = repo.find_tree(tree_oid).map_err(StoreError::BuildTree)?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        tree_oid = put_entry(repo, Some(&tree), &segments, *blob)?;
    }
    Ok(tree_oid)
}

fn empty_tree(repo: &Repository) -> Result<Oid, StoreError> {
    repo.treebuilder(None)
        .and_then(|b| b.write())
        .map_err(StoreError::BuildTree)
}

fn put_entry(
    repo: &Repository,
    base: Option<&git2::Tree<'_>>,
    segments: &[&str],
    blob: Oid,
) -> Result<Oid, StoreError> {
    let mut builder = repo.treebuilder(base).map_err(StoreError::BuildTree)?;
    if segments.len() == 1 {
        builder
            .insert(segments[0], blob, 0o100644)
            .map_err(StoreError::BuildTree)?;
    } else {
        let sub = match base.and_then(|t| t.get_name(segments[0])) {
            Some(entry) => Some(repo.find_tree(entry.id()).map_err(StoreError::BuildTree)?),
            None => None,
        };
        let sub_oid = put_entry(repo, sub.as_ref(), &segments[1..], blob)?;
        builder
            .insert(segments[0], sub_oid, 0o040000)
            .map_err(StoreError::BuildTree)?;
    }
    builder.write().map_err(StoreError::BuildTree)
}

/// Create a commit object without moving any ref. An empty `parents` slice
/// produces an orphan commit, the seed of the ledger history.
pub fn commit_tree(
    repo: &Repository,
    tree_oid: Oid,
    parents: &[Oid],
    message: &str,
) -> Result<Oid, StoreError> {
    let sig = signature()?;
    let tree = repo.find_tree(tree_oid).map_err(StoreError::BuildTree)?;
    let parent_commits = parents
        .iter()
        .map(|oid| repo.find_commit(*oid))
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::Commit)?;
    let parent_refs: Vec<_> = parent_commits.iter().collect();
    repo.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .map_err(StoreError::Commit)
}

/// Create an annotated tag named `name` (under `refs/tags/`) on `target`.
///
/// Tags are immutable here: creation never forces, so an existing tag of the
/// same name is an error surfaced to the caller.
pub fn create_tag(
    repo: &Repository,
    name: &str,
    target: Oid,
    message: &str,
) -> Result<Oid, StoreError> {
    let sig = signature()?;
    let object = repo.find_object(target, None).map_err(StoreError::Git)?;
    repo.tag(name, &object, &sig, message, false)
        .map_err(|source| StoreError::CreateTag {
            name: name.to_string(),
            source,
        })
}

/// Read the blob at `path` inside `tree`, or `None` if the entry is absent.
pub fn read_blob(
    repo: &Repository,
    tree: &git2::Tree<'_>,
    path: &str,
) -> Result<Option<Vec<u8>>, StoreError> {
    let entry = match tree.get_path(std::path::Path::new(path)) {
        Ok(entry) => entry,
        Err(err) if err.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::Git(err)),
    };
    let object = entry.to_object(repo).map_err(StoreError::Git)?;
    let blob = object
        .peel_to_blob()
        .map_err(|_| StoreError::NotABlob(path.to_string()))?;
    Ok(Some(blob.content().to_vec()))
}
