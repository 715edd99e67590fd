//! Run anchors.
//!
//! One annotated tag per run on the primary history, named deterministically
//! from the run id. The tag message carries the run metadata inline so the
//! anchor is self-describing without a second read. Created exactly once,
//! never mutated, never deleted in normal operation.

use git2::{Oid, Repository};

use super::error::LedgerError;
use crate::core::{Run, RunAnchor, RunId};
use crate::git::odb;

/// Tag name (under `refs/tags/`) for a run id.
pub fn run_tag_name(prefix: &str, run_id: &RunId) -> String {
    format!("{prefix}/{run_id}")
}

/// Create the anchor tag for `run` on its `code_ref` commit.
pub fn create_anchor(
    repo: &Repository,
    prefix: &str,
    run: &Run,
) -> Result<RunAnchor, LedgerError> {
    let target = Oid::from_str(&run.code_ref).map_err(crate::git::StoreError::Git)?;
    let name = run_tag_name(prefix, &run.run_id);
    let bytes = crate::git::wire::serialize_run(run).map_err(crate::git::StoreError::Wire)?;
    let message = String::from_utf8(bytes)
        .map_err(|e| crate::git::StoreError::Wire(crate::git::WireError::Utf8(e)))?;

    let tag_oid = match odb::create_tag(repo, &name, target, &message) {
        Ok(oid) => oid,
        Err(crate::git::StoreError::CreateTag { source, .. })
            if source.code() == git2::ErrorCode::Exists =>
        {
            return Err(LedgerError::AnchorExists(run.run_id.clone()));
        }
        Err(err) => return Err(err.into()),
    };

    Ok(RunAnchor {
        run: run.clone(),
        tag_name: name,
        tag_oid: tag_oid.to_string(),
    })
}

/// Read the anchor for `run_id`, or `None` when no such tag exists.
///
/// The metadata comes from the tag message alone; the ledger tree is not
/// consulted, which is what makes anchors cheap to scan.
pub fn read_anchor(
    repo: &Repository,
    prefix: &str,
    run_id: &RunId,
) -> Result<Option<RunAnchor>, LedgerError> {
    let name = run_tag_name(prefix, run_id);
    let Some(tag_oid) = crate::git::read_ref(repo, &format!("refs/tags/{name}"))? else {
        return Ok(None);
    };
    let tag = repo.find_tag(tag_oid).map_err(crate::git::StoreError::Git)?;
    let message = tag.message().unwrap_or_default();
    let run = crate::git::wire::parse_run(message.as_bytes())
        .map_err(crate::git::StoreError::Wire)?;
    Ok(Some(RunAnchor {
        run,
        tag_name: name,
        tag_oid: tag_oid.to_string(),
    }))
}
