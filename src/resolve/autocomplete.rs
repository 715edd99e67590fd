//! Incremental reference autocomplete.
//!
//! Two phases: an empty prefix or a bare `@` (optionally with a partial
//! kind) offers the closed kind vocabulary; `@kind:partial` offers
//! kind-specific candidates. For commits the branch is semantic: a valid hex
//! partial is a hash-prefix search, anything else is a keyword search over
//! commit summaries.

use super::error::ResolveError;
use super::lookup::{ResolveContext, Resolver, icon_for};
use crate::core::{RefKind, Reference};
use crate::git::StoreError;
use crate::ledger::RunFilter;

/// Candidates offered per completion request.
const MAX_SUGGESTIONS: usize = 10;
/// How far back keyword/hash search walks the primary history.
const COMMIT_WALK_LIMIT: usize = 200;

/// One completion candidate, render-ready.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    /// The text to insert; kind suggestions end with `:` and stay open.
    pub reference: String,
    pub label: String,
    pub detail: Option<String>,
    pub icon: &'static str,
}

fn kind_suggestion(kind: RefKind) -> Suggestion {
    Suggestion {
        reference: format!("@{kind}:"),
        label: kind.as_str().to_string(),
        detail: None,
        icon: icon_for(kind),
    }
}

fn entity(reference: Reference, label: String, detail: Option<String>) -> Suggestion {
    Suggestion {
        icon: icon_for(reference.kind),
        reference: reference.to_string(),
        label,
        detail,
    }
}

impl Resolver {
    pub fn autocomplete(
        &self,
        ctx: &ResolveContext<'_>,
        prefix: &str,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let body = prefix.strip_prefix('@').unwrap_or(prefix);
        match body.split_once(':') {
            None => Ok(RefKind::ALL
                .into_iter()
                .filter(|k| k.as_str().starts_with(body))
                .map(kind_suggestion)
                .collect()),
            Some((kind_str, partial)) => {
                let Ok(kind) = RefKind::parse(kind_str) else {
                    return Ok(Vec::new());
                };
                let mut out = self.candidates(ctx, kind, partial)?;
                out.truncate(MAX_SUGGESTIONS);
                Ok(out)
            }
        }
    }

    fn candidates(
        &self,
        ctx: &ResolveContext<'_>,
        kind: RefKind,
        partial: &str,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        match kind {
            RefKind::Run => self.run_candidates(ctx, partial),
            RefKind::Thread => self.thread_candidates(ctx, partial),
            RefKind::Trace => self.trace_candidates(ctx, partial),
            RefKind::Commit => self.commit_candidates(partial),
            RefKind::Branch => self.branch_candidates(partial),
            RefKind::User => self.user_candidates(ctx, partial),
            // No local candidate source for external kinds.
            _ => Ok(Vec::new()),
        }
    }

    fn run_candidates(
        &self,
        ctx: &ResolveContext<'_>,
        partial: &str,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let listing = ctx.ledger.list_runs(&RunFilter::default())?;
        Ok(listing
            .runs
            .into_iter()
            .rev() // newest first
            .filter(|run| {
                run.run_id.as_str().starts_with(partial) || run.run_type.contains(partial)
            })
            .map(|run| {
                entity(
                    Reference::new(RefKind::Run, run.run_id.as_str()),
                    format!("{} {}", run.run_type, run.run_id),
                    Some(run.status.as_str().to_string()),
                )
            })
            .collect())
    }

    fn thread_candidates(
        &self,
        ctx: &ResolveContext<'_>,
        partial: &str,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let (threads, _) = ctx.chat.list_threads()?;
        let needle = partial.to_lowercase();
        Ok(threads
            .into_iter()
            .filter(|t| {
                t.thread_id.as_str().starts_with(partial)
                    || t.title.to_lowercase().contains(&needle)
            })
            .map(|t| {
                entity(
                    Reference::new(RefKind::Thread, t.thread_id.as_str()),
                    t.title,
                    Some(format!("by {}", t.created_by)),
                )
            })
            .collect())
    }

    fn trace_candidates(
        &self,
        ctx: &ResolveContext<'_>,
        partial: &str,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let (traces, _) = ctx.ledger.list_traces()?;
        let needle = partial.to_lowercase();
        Ok(traces
            .into_iter()
            .filter(|t| {
                t.trace_id.as_str().starts_with(partial)
                    || t.name.to_lowercase().contains(&needle)
            })
            .map(|t| {
                entity(
                    Reference::new(RefKind::Trace, t.trace_id.as_str()),
                    t.name,
                    Some(t.classification),
                )
            })
            .collect())
    }

    /// Hex partials match hash prefixes; anything else is a keyword search
    /// over commit summaries.
    fn commit_candidates(&self, partial: &str) -> Result<Vec<Suggestion>, ResolveError> {
        let by_hash = !partial.is_empty() && partial.bytes().all(|b| b.is_ascii_hexdigit());
        let needle = partial.to_lowercase();

        let mut walk = self.repo().revwalk().map_err(StoreError::Git)?;
        if walk.push_head().is_err() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for oid in walk.take(COMMIT_WALK_LIMIT).flatten() {
            let Ok(commit) = self.repo().find_commit(oid) else {
                continue;
            };
            let hash = oid.to_string();
            let summary = commit.summary().unwrap_or_default().to_string();
            let matched = if by_hash {
                hash.starts_with(&needle)
            } else {
                summary.to_lowercase().contains(&needle)
            };
            if !matched {
                continue;
            }
            let mut short = hash.clone();
            short.truncate(7);
            out.push(entity(
                Reference::new(RefKind::Commit, short.clone()),
                format!("{short} {summary}"),
                commit.author().name().map(|s| s.to_string()),
            ));
            if out.len() >= MAX_SUGGESTIONS {
                break;
            }
        }
        Ok(out)
    }

    fn branch_candidates(&self, partial: &str) -> Result<Vec<Suggestion>, ResolveError> {
        let branches = self
            .repo()
            .branches(Some(git2::BranchType::Local))
            .map_err(StoreError::Git)?;
        let mut out = Vec::new();
        for branch in branches.flatten() {
            let (branch, _) = branch;
            let Some(name) = branch.name().ok().flatten().map(|s| s.to_string()) else {
                continue;
            };
            if !name.starts_with(partial) {
                continue;
            }
            let detail = branch
                .get()
                .peel_to_commit()
                .ok()
                .and_then(|c| c.summary().map(|s| s.to_string()));
            out.push(entity(Reference::new(RefKind::Branch, &name), name, detail));
        }
        Ok(out)
    }

    /// Users are whoever has opened a run; the ledger is the only roster we
    /// have.
    fn user_candidates(
        &self,
        ctx: &ResolveContext<'_>,
        partial: &str,
    ) -> Result<Vec<Suggestion>, ResolveError> {
        let listing = ctx.ledger.list_runs(&RunFilter::default())?;
        let mut seen = std::collections::BTreeSet::new();
        for run in listing.runs {
            seen.insert(run.user.as_str().to_string());
        }
        Ok(seen
            .into_iter()
            .filter(|u| u.starts_with(partial))
            .map(|u| entity(Reference::new(RefKind::User, &u), u, None))
            .collect())
    }
}
