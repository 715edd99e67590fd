//! Per-kind reference resolution.
//!
//! `resolve` dispatches on kind and returns a display-ready snapshot or
//! `NotFound`; it never invents data. The secret resolver always masks.

use git2::Repository;

use super::error::ResolveError;
use crate::chat::{ChatError, ChatStore};
use crate::core::{RefKind, Reference, RunId, ThreadId, TraceId};
use crate::git::StoreError;
use crate::ledger::{LedgerError, LedgerService};

/// Lookup context borrowed from the owning session.
pub struct ResolveContext<'a> {
    pub ledger: &'a LedgerService,
    pub chat: &'a ChatStore,
}

/// A resolved reference, ready to render without a second round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub reference: Reference,
    pub label: String,
    pub detail: Option<String>,
    pub icon: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Found(Snapshot),
    NotFound,
}

pub(super) fn icon_for(kind: RefKind) -> &'static str {
    match kind {
        RefKind::Run => "play",
        RefKind::Thread => "chat",
        RefKind::Trace => "film",
        RefKind::Commit => "commit",
        RefKind::Branch => "branch",
        RefKind::User => "person",
        RefKind::File => "file",
        RefKind::Release => "tag",
        RefKind::Doc => "doc",
        RefKind::Media => "media",
        RefKind::Env => "env",
        RefKind::Secret => "lock",
        RefKind::Audit => "audit",
        RefKind::Integration => "plug",
        RefKind::Stack => "stack",
        RefKind::Module => "module",
    }
}

pub struct Resolver {
    repo: Repository,
}

impl Resolver {
    pub fn open(repo_path: &std::path::Path) -> Result<Self, ResolveError> {
        let repo = Repository::open(repo_path)
            .map_err(|e| StoreError::OpenRepo(repo_path.to_path_buf(), e))?;
        Ok(Self { repo })
    }

    pub(super) fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Resolve a string that must be a reference. Unlike `parse_refs`, a
    /// kind outside the vocabulary is an explicit error here.
    pub fn resolve_str(
        &self,
        ctx: &ResolveContext<'_>,
        s: &str,
    ) -> Result<Resolution, ResolveError> {
        let body = s
            .strip_prefix('@')
            .ok_or_else(|| ResolveError::NotAReference(s.to_string()))?;
        let (kind_str, id) = body
            .split_once(':')
            .ok_or_else(|| ResolveError::NotAReference(s.to_string()))?;
        let kind = RefKind::parse(kind_str)
            .map_err(|_| ResolveError::UnknownKind(kind_str.to_string()))?;
        self.resolve(ctx, &Reference::new(kind, id))
    }

    pub fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
    ) -> Result<Resolution, ResolveError> {
        match reference.kind {
            RefKind::Run => self.resolve_run(ctx, reference),
            RefKind::Thread => self.resolve_thread(ctx, reference),
            RefKind::Trace => self.resolve_trace(ctx, reference),
            RefKind::Commit => self.resolve_commit(reference),
            RefKind::Branch => self.resolve_branch(reference),
            RefKind::File => self.resolve_file(reference),
            RefKind::User => Ok(found(reference, reference.id.clone(), None)),
            // Never the value, regardless of vault state.
            RefKind::Secret => Ok(found(
                reference,
                reference.id.clone(),
                Some("masked".to_string()),
            )),
            // External kinds carry no local authority; the id is the snapshot.
            RefKind::Release
            | RefKind::Doc
            | RefKind::Media
            | RefKind::Env
            | RefKind::Audit
            | RefKind::Integration
            | RefKind::Stack
            | RefKind::Module => Ok(found(reference, reference.id.clone(), None)),
        }
    }

    /// The anchor tag answers existence; status and close time come from the
    /// live `run.json`, since the tag freezes the run as it was at creation.
    fn resolve_run(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
    ) -> Result<Resolution, ResolveError> {
        let Ok(run_id) = RunId::parse(&reference.id) else {
            return Ok(Resolution::NotFound);
        };
        let Some(anchor) = ctx.ledger.get_anchor(&run_id)? else {
            return Ok(Resolution::NotFound);
        };
        let run = match ctx.ledger.get_run(&run_id) {
            Ok(detail) => detail.run,
            // Anchored but absent from the ledger ref (not yet synced here):
            // the frozen creation-time copy is the best available answer.
            Err(LedgerError::RunNotFound(_)) => anchor.run,
            Err(err) => return Err(err.into()),
        };
        Ok(found(
            reference,
            format!("{} {}", run.run_type, run.run_id),
            Some(format!("{} by {}", run.status.as_str(), run.user)),
        ))
    }

    fn resolve_thread(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
    ) -> Result<Resolution, ResolveError> {
        let Ok(thread_id) = ThreadId::parse(&reference.id) else {
            return Ok(Resolution::NotFound);
        };
        match ctx.chat.find_thread(&thread_id) {
            Ok(thread) => Ok(found(
                reference,
                thread.title,
                Some(format!("by {}", thread.created_by)),
            )),
            Err(ChatError::ThreadNotFound(_)) => Ok(Resolution::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve_trace(
        &self,
        ctx: &ResolveContext<'_>,
        reference: &Reference,
    ) -> Result<Resolution, ResolveError> {
        let Ok(trace_id) = TraceId::parse(&reference.id) else {
            return Ok(Resolution::NotFound);
        };
        match ctx.ledger.get_trace(&trace_id) {
            Ok(trace) => Ok(found(
                reference,
                trace.name,
                Some(format!("{}, {} events", trace.classification, trace.events.len())),
            )),
            Err(LedgerError::TraceNotFound(_)) => Ok(Resolution::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    fn resolve_commit(&self, reference: &Reference) -> Result<Resolution, ResolveError> {
        let Ok(object) = self.repo.revparse_single(&reference.id) else {
            return Ok(Resolution::NotFound);
        };
        let Ok(commit) = object.peel_to_commit() else {
            return Ok(Resolution::NotFound);
        };
        let mut short = commit.id().to_string();
        short.truncate(7);
        let summary = commit.summary().unwrap_or_default().to_string();
        let author = commit.author().name().unwrap_or_default().to_string();
        Ok(found(reference, format!("{short} {summary}"), Some(author)))
    }

    fn resolve_branch(&self, reference: &Reference) -> Result<Resolution, ResolveError> {
        match self.repo.find_branch(&reference.id, git2::BranchType::Local) {
            Ok(branch) => {
                let detail = branch
                    .get()
                    .peel_to_commit()
                    .ok()
                    .and_then(|c| c.summary().map(|s| s.to_string()));
                Ok(found(reference, reference.id.clone(), detail))
            }
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(Resolution::NotFound),
            Err(err) => Err(StoreError::Git(err).into()),
        }
    }

    /// A file reference resolves against the primary head tree. The optional
    /// `#L<start>-L<end>` suffix is display metadata, not part of the path.
    fn resolve_file(&self, reference: &Reference) -> Result<Resolution, ResolveError> {
        let (path, range) = match reference.id.split_once('#') {
            Some((p, r)) => (p, Some(r)),
            None => (reference.id.as_str(), None),
        };
        let Some(tree) = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_tree().ok())
        else {
            return Ok(Resolution::NotFound);
        };
        if tree.get_path(std::path::Path::new(path)).is_err() {
            return Ok(Resolution::NotFound);
        }
        Ok(found(
            reference,
            path.to_string(),
            range.map(|r| r.to_string()),
        ))
    }
}

fn found(reference: &Reference, label: String, detail: Option<String>) -> Resolution {
    Resolution::Found(Snapshot {
        reference: reference.clone(),
        label,
        detail,
        icon: icon_for(reference.kind),
    })
}
