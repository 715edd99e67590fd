//! Ledger service.
//!
//! Maintains an orphan history on a dedicated ref, one directory per run:
//! `runs/<run_id>/run.json`, `runs/<run_id>/events.jsonl`, and opaque
//! artifacts. Traces persist as `traces/<trace_id>.json` in the same tree so
//! one shared mutable pointer covers every writer. All mutation goes through
//! the CAS retry loop; reads are plain tree walks with no locking.

use std::path::Path;

use git2::{Oid, Repository};

use super::anchor;
use super::error::LedgerError;
use crate::config::RefNames;
use crate::core::{
    EventInput, OpEvent, Run, RunAnchor, RunId, RunStatus, Trace, TraceId, UserId, WallClock,
};
use crate::git::{RetryPolicy, StoreError, odb, wire, with_cas_retry};

/// A run with its event log, as returned by `get_run`.
#[derive(Debug)]
pub struct RunDetail {
    pub run: Run,
    pub events: Vec<OpEvent>,
    /// Event records that failed schema validation and were skipped.
    pub skipped_events: usize,
}

/// Filter for `list_runs`. Empty filter matches everything.
#[derive(Clone, Debug, Default)]
pub struct RunFilter {
    pub run_type: Option<String>,
    pub status: Option<RunStatus>,
    pub user: Option<UserId>,
    pub limit: Option<usize>,
}

/// Best-effort listing: matching runs plus a count of skipped records.
#[derive(Debug)]
pub struct RunListing {
    pub runs: Vec<Run>,
    pub skipped: usize,
}

pub struct LedgerService {
    repo: Repository,
    refs: RefNames,
    retry: RetryPolicy,
}

impl LedgerService {
    pub fn open(repo_path: &Path, refs: RefNames, retry: RetryPolicy) -> Result<Self, LedgerError> {
        let repo = Repository::open(repo_path)
            .map_err(|e| StoreError::OpenRepo(repo_path.to_path_buf(), e))?;
        Ok(Self { repo, refs, retry })
    }

    pub fn refs(&self) -> &RefNames {
        &self.refs
    }

    /// Current primary-history commit, the `code_ref` for new runs/traces.
    pub fn current_code_ref(&self) -> Result<String, LedgerError> {
        let head = self.repo.head().map_err(|_| LedgerError::NoPrimaryHead)?;
        let commit = head
            .peel_to_commit()
            .map_err(|_| LedgerError::NoPrimaryHead)?;
        Ok(commit.id().to_string())
    }

    /// Make sure the orphan ledger ref exists. Losing the creation race just
    /// means another writer initialized it first.
    fn ensure_ledger_ref(&self) -> Result<Oid, LedgerError> {
        if let Some(oid) = crate::git::read_ref(&self.repo, &self.refs.ledger_ref)? {
            return Ok(oid);
        }
        let tree = odb::put_entries(&self.repo, None, &[])?;
        let commit = odb::commit_tree(&self.repo, tree, &[], "opslog(ledger): init")?;
        match crate::git::compare_and_swap(&self.repo, &self.refs.ledger_ref, None, commit)? {
            crate::git::CasOutcome::Updated => Ok(commit),
            crate::git::CasOutcome::Conflict { actual } => actual.ok_or_else(|| {
                LedgerError::Store(StoreError::RefNotFound(self.refs.ledger_ref.clone()))
            }),
        }
    }

    fn ledger_tip(&self) -> Result<Option<Oid>, LedgerError> {
        Ok(crate::git::read_ref(&self.repo, &self.refs.ledger_ref)?)
    }

    fn tree_at(&self, oid: Oid) -> Result<git2::Tree<'_>, LedgerError> {
        let commit = self.repo.find_commit(oid).map_err(StoreError::Git)?;
        Ok(commit.tree().map_err(StoreError::Git)?)
    }

    fn parent_tree(&self, current: Option<Oid>) -> Result<(Oid, git2::Tree<'_>), LedgerError> {
        let parent = current.ok_or_else(|| {
            LedgerError::Store(StoreError::RefNotFound(self.refs.ledger_ref.clone()))
        })?;
        Ok((parent, self.tree_at(parent)?))
    }

    fn read_run_at(&self, tree: &git2::Tree<'_>, run_id: &RunId) -> Result<Run, LedgerError> {
        let bytes = odb::read_blob(&self.repo, tree, &format!("runs/{run_id}/run.json"))?
            .ok_or_else(|| LedgerError::RunNotFound(run_id.clone()))?;
        Ok(wire::parse_run(&bytes).map_err(StoreError::Wire)?)
    }

    /// Snapshot `code_ref`, write the initial run directory, anchor the run
    /// with an immutable tag, and return the anchor.
    pub fn create_run(&self, run_type: &str, user: UserId) -> Result<RunAnchor, LedgerError> {
        let code_ref = self.current_code_ref()?;
        let now = WallClock::now();
        let run_id = RunId::generate(now);
        let run = Run::open(run_id.clone(), run_type, user, now, code_ref);

        self.ensure_ledger_ref()?;
        let run_json = wire::serialize_run(&run).map_err(StoreError::Wire)?;
        let message = format!("opslog(ledger): open run {run_id} ({run_type})");

        with_cas_retry(
            &self.repo,
            &self.refs.ledger_ref,
            self.retry,
            |current| -> Result<(Oid, ()), LedgerError> {
                let (parent, base) = self.parent_tree(current)?;
                let meta_blob = odb::write_blob(&self.repo, &run_json)?;
                let events_blob = odb::write_blob(&self.repo, b"")?;
                let tree = odb::put_entries(
                    &self.repo,
                    Some(&base),
                    &[
                        (&format!("runs/{run_id}/run.json"), meta_blob),
                        (&format!("runs/{run_id}/events.jsonl"), events_blob),
                    ],
                )?;
                let commit = odb::commit_tree(&self.repo, tree, &[parent], &message)?;
                Ok((commit, ()))
            },
        )?;

        tracing::info!(run = %run_id, kind = run_type, "run opened");
        anchor::create_anchor(&self.repo, &self.refs.run_tag_prefix, &run)
    }

    /// Append one event to an open run's log. Seq assignment happens inside
    /// the CAS loop, so concurrent appenders serialize and never collide.
    pub fn append_event(&self, run_id: &RunId, input: EventInput) -> Result<OpEvent, LedgerError> {
        let events_path = format!("runs/{run_id}/events.jsonl");

        with_cas_retry(
            &self.repo,
            &self.refs.ledger_ref,
            self.retry,
            |current| -> Result<(Oid, OpEvent), LedgerError> {
                let (parent, base) = self.parent_tree(current)?;
                let run = self.read_run_at(&base, run_id)?;
                if run.status.is_terminal() {
                    return Err(LedgerError::RunClosed(run_id.clone()));
                }

                let existing =
                    odb::read_blob(&self.repo, &base, &events_path)?.unwrap_or_default();
                let log = wire::parse_events(&existing).map_err(StoreError::Wire)?;
                let seq = log.records.last().map(|e| e.seq + 1).unwrap_or(0);
                let event = input.clone().stamp(seq, WallClock::now());

                // Append to the raw bytes rather than rewriting the log, so
                // even lines we could not parse survive untouched.
                let mut bytes = existing;
                bytes.extend_from_slice(
                    &wire::serialize_events(std::slice::from_ref(&event))
                        .map_err(StoreError::Wire)?,
                );

                let blob = odb::write_blob(&self.repo, &bytes)?;
                let tree = odb::put_entries(&self.repo, Some(&base), &[(&events_path, blob)])?;
                let commit = odb::commit_tree(
                    &self.repo,
                    tree,
                    &[parent],
                    &format!("opslog(ledger): run {run_id} event {seq}"),
                )?;
                Ok((commit, event))
            },
        )
    }

    /// Write final status and `ended_at`. Idempotent: a closed run stays as
    /// its first close left it, and the repeat call is a no-op.
    pub fn close_run(&self, run_id: &RunId, status: RunStatus) -> Result<Run, LedgerError> {
        let meta_path = format!("runs/{run_id}/run.json");
        let closed_at = WallClock::now();

        let run = with_cas_retry(
            &self.repo,
            &self.refs.ledger_ref,
            self.retry,
            |current| -> Result<(Oid, Run), LedgerError> {
                let (parent, base) = self.parent_tree(current)?;
                let mut run = self.read_run_at(&base, run_id)?;

                if run.status.is_terminal() {
                    // Already closed: first close wins. Re-point the ref at
                    // its current value so the swap is a harmless no-op.
                    return Ok((parent, run));
                }

                run.status = status;
                run.ended_at = Some(closed_at);
                let blob = odb::write_blob(
                    &self.repo,
                    &wire::serialize_run(&run).map_err(StoreError::Wire)?,
                )?;
                let tree = odb::put_entries(&self.repo, Some(&base), &[(&meta_path, blob)])?;
                let commit = odb::commit_tree(
                    &self.repo,
                    tree,
                    &[parent],
                    &format!("opslog(ledger): close run {run_id} {}", status.as_str()),
                )?;
                Ok((commit, run))
            },
        )?;

        tracing::info!(run = %run_id, status = run.status.as_str(), "run closed");
        Ok(run)
    }

    /// Read one run with its event log. Read-only tree walk, no locking.
    pub fn get_run(&self, run_id: &RunId) -> Result<RunDetail, LedgerError> {
        let tip = self
            .ledger_tip()?
            .ok_or_else(|| LedgerError::RunNotFound(run_id.clone()))?;
        let tree = self.tree_at(tip)?;
        let run = self.read_run_at(&tree, run_id)?;

        let events_bytes =
            odb::read_blob(&self.repo, &tree, &format!("runs/{run_id}/events.jsonl"))?
                .unwrap_or_default();
        let log = wire::parse_events(&events_bytes).map_err(StoreError::Wire)?;

        Ok(RunDetail {
            run,
            events: log.records,
            skipped_events: log.skipped,
        })
    }

    /// List runs in id order (lexicographic == chronological). Malformed
    /// run records are skipped and counted, never fatal to the listing.
    pub fn list_runs(&self, filter: &RunFilter) -> Result<RunListing, LedgerError> {
        let mut listing = RunListing {
            runs: Vec::new(),
            skipped: 0,
        };
        let Some(tip) = self.ledger_tip()? else {
            return Ok(listing);
        };
        let tree = self.tree_at(tip)?;
        let Ok(runs_entry) = tree.get_path(std::path::Path::new("runs")) else {
            return Ok(listing);
        };
        let runs_tree = self
            .repo
            .find_tree(runs_entry.id())
            .map_err(StoreError::Git)?;

        for entry in runs_tree.iter() {
            if let Some(limit) = filter.limit {
                if listing.runs.len() >= limit {
                    break;
                }
            }
            let Some(name) = entry.name() else {
                listing.skipped += 1;
                continue;
            };
            let bytes = match odb::read_blob(&self.repo, &tree, &format!("runs/{name}/run.json")) {
                Ok(Some(bytes)) => bytes,
                _ => {
                    listing.skipped += 1;
                    continue;
                }
            };
            match wire::parse_run(&bytes) {
                Ok(run) => {
                    if filter_matches(filter, &run) {
                        listing.runs.push(run);
                    }
                }
                Err(err) => {
                    listing.skipped += 1;
                    tracing::warn!(run = name, error = %err, "skipping malformed run record");
                }
            }
        }

        Ok(listing)
    }

    /// Attach an opaque artifact file to an open run.
    pub fn put_artifact(&self, run_id: &RunId, name: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        let artifact_path = format!("runs/{run_id}/artifacts/{name}");

        with_cas_retry(
            &self.repo,
            &self.refs.ledger_ref,
            self.retry,
            |current| -> Result<(Oid, ()), LedgerError> {
                let (parent, base) = self.parent_tree(current)?;
                let run = self.read_run_at(&base, run_id)?;
                if run.status.is_terminal() {
                    return Err(LedgerError::RunClosed(run_id.clone()));
                }

                let blob = odb::write_blob(&self.repo, bytes)?;
                let tree = odb::put_entries(&self.repo, Some(&base), &[(&artifact_path, blob)])?;
                let commit = odb::commit_tree(
                    &self.repo,
                    tree,
                    &[parent],
                    &format!("opslog(ledger): run {run_id} artifact {name}"),
                )?;
                Ok((commit, ()))
            },
        )
    }

    pub fn get_artifact(&self, run_id: &RunId, name: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let Some(tip) = self.ledger_tip()? else {
            return Ok(None);
        };
        let tree = self.tree_at(tip)?;
        Ok(odb::read_blob(
            &self.repo,
            &tree,
            &format!("runs/{run_id}/artifacts/{name}"),
        )?)
    }

    /// Persist a stopped trace into the ledger tree.
    pub fn put_trace(&self, trace: &Trace) -> Result<(), LedgerError> {
        self.ensure_ledger_ref()?;
        let path = format!("traces/{}.json", trace.trace_id);
        let bytes = wire::serialize_trace(trace).map_err(StoreError::Wire)?;
        let message = format!("opslog(ledger): trace {}", trace.trace_id);

        with_cas_retry(
            &self.repo,
            &self.refs.ledger_ref,
            self.retry,
            |current| -> Result<(Oid, ()), LedgerError> {
                let (parent, base) = self.parent_tree(current)?;
                let blob = odb::write_blob(&self.repo, &bytes)?;
                let tree = odb::put_entries(&self.repo, Some(&base), &[(&path, blob)])?;
                let commit = odb::commit_tree(&self.repo, tree, &[parent], &message)?;
                Ok((commit, ()))
            },
        )
    }

    pub fn get_trace(&self, trace_id: &TraceId) -> Result<Trace, LedgerError> {
        let tip = self
            .ledger_tip()?
            .ok_or_else(|| LedgerError::TraceNotFound(trace_id.clone()))?;
        let tree = self.tree_at(tip)?;
        let bytes = odb::read_blob(&self.repo, &tree, &format!("traces/{trace_id}.json"))?
            .ok_or_else(|| LedgerError::TraceNotFound(trace_id.clone()))?;
        Ok(wire::parse_trace(&bytes).map_err(StoreError::Wire)?)
    }

    /// List persisted traces in id order. Malformed records are skipped and
    /// counted, same contract as `list_runs`.
    pub fn list_traces(&self) -> Result<(Vec<Trace>, usize), LedgerError> {
        let mut traces = Vec::new();
        let mut skipped = 0usize;
        let Some(tip) = self.ledger_tip()? else {
            return Ok((traces, skipped));
        };
        let tree = self.tree_at(tip)?;
        let Ok(entry) = tree.get_path(std::path::Path::new("traces")) else {
            return Ok((traces, skipped));
        };
        let traces_tree = self.repo.find_tree(entry.id()).map_err(StoreError::Git)?;

        for entry in traces_tree.iter() {
            let Some(name) = entry.name() else {
                skipped += 1;
                continue;
            };
            let bytes = match odb::read_blob(&self.repo, &tree, &format!("traces/{name}")) {
                Ok(Some(bytes)) => bytes,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            match wire::parse_trace(&bytes) {
                Ok(trace) => traces.push(trace),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(trace = name, error = %err, "skipping malformed trace record");
                }
            }
        }

        Ok((traces, skipped))
    }

    /// Read the anchor tag for a run, if one exists.
    pub fn get_anchor(&self, run_id: &RunId) -> Result<Option<RunAnchor>, LedgerError> {
        anchor::read_anchor(&self.repo, &self.refs.run_tag_prefix, run_id)
    }
}

fn filter_matches(filter: &RunFilter, run: &Run) -> bool {
    if let Some(kind) = &filter.run_type {
        if &run.run_type != kind {
            return false;
        }
    }
    if let Some(status) = filter.status {
        if run.status != status {
            return false;
        }
    }
    if let Some(user) = &filter.user {
        if &run.user != user {
            return false;
        }
    }
    true
}
