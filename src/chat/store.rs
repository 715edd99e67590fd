//! Chat persistence over git notes.
//!
//! Messages and thread records live as JSONL lines in notes attached to
//! anchor tags: a run-scoped message rides the run's anchor tag, everything
//! else rides a single project anchor tag. Notes merge as a line-set union,
//! so concurrent sends from different clones converge without coordination.

use std::path::Path;

use git2::{Oid, Repository};

use super::crypto::{self, Vault};
use super::error::ChatError;
use crate::config::RefNames;
use crate::core::{ChatMessage, MessageDraft, RunId, Thread, ThreadId, UserId, WallClock};
use crate::git::{RetryPolicy, StoreError, notes, odb, wire};
use crate::ledger::run_tag_name;

/// Where to look when listing messages.
#[derive(Clone, Debug)]
pub enum MessageScope {
    /// Messages in one thread, wherever their notes live.
    Thread(ThreadId),
    /// Messages attached to one run's anchor.
    Run(RunId),
    /// Top-level messages (no thread) across all anchors.
    Timeline,
}

/// Best-effort listing: messages in id order plus a skipped-record count.
#[derive(Debug)]
pub struct MessageListing {
    pub messages: Vec<ChatMessage>,
    pub skipped: usize,
}

/// Fields for a new thread, before the store assigns its id.
#[derive(Clone, Debug)]
pub struct ThreadDraft {
    pub title: String,
    pub created_by: UserId,
    pub anchor_run: Option<RunId>,
    pub tags: Vec<String>,
}

pub struct ChatStore {
    repo: Repository,
    refs: RefNames,
    vault: Vault,
    retry: RetryPolicy,
}

impl ChatStore {
    pub fn open(
        repo_path: &Path,
        refs: RefNames,
        vault: Vault,
        retry: RetryPolicy,
    ) -> Result<Self, ChatError> {
        let repo = Repository::open(repo_path)
            .map_err(|e| StoreError::OpenRepo(repo_path.to_path_buf(), e))?;
        Ok(Self {
            repo,
            refs,
            vault,
            retry,
        })
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// The project anchor tag, created lazily on the current primary head.
    ///
    /// Thread records and unthreaded messages attach here. Losing the
    /// creation race just means another writer tagged first.
    fn project_anchor(&self) -> Result<Oid, ChatError> {
        let refname = format!("refs/tags/{}", self.refs.anchor_tag);
        if let Some(oid) = crate::git::read_ref(&self.repo, &refname)? {
            return Ok(oid);
        }
        let head = self
            .repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .ok_or(ChatError::NoAnchorTarget)?;
        match odb::create_tag(
            &self.repo,
            &self.refs.anchor_tag,
            head.id(),
            "opslog: project chat anchor\n",
        ) {
            Ok(oid) => Ok(oid),
            Err(StoreError::CreateTag { source, .. })
                if source.code() == git2::ErrorCode::Exists =>
            {
                crate::git::read_ref(&self.repo, &refname)?
                    .ok_or_else(|| StoreError::RefNotFound(refname).into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn run_anchor_oid(&self, run_id: &RunId) -> Result<Option<Oid>, ChatError> {
        let name = run_tag_name(&self.refs.run_tag_prefix, run_id);
        Ok(crate::git::read_ref(&self.repo, &format!("refs/tags/{name}"))?)
    }

    /// Note target for a message: the thread's anchor run when it has one,
    /// otherwise the project anchor.
    fn target_for(&self, thread: Option<&Thread>) -> Result<Oid, ChatError> {
        match thread.and_then(|t| t.anchor_run.as_ref()) {
            Some(run_id) => self
                .run_anchor_oid(run_id)?
                .ok_or_else(|| ChatError::DanglingAnchor(run_id.clone())),
            None => self.project_anchor(),
        }
    }

    fn append_record(&self, target: Oid, record: &wire::ChatRecord) -> Result<(), ChatError> {
        let line = wire::chat_record_line(record).map_err(StoreError::Wire)?;
        notes::append_note(&self.repo, &self.refs.notes_ref, target, self.retry, &line)?;
        Ok(())
    }

    /// Create a thread. The record always lands on the project anchor so a
    /// single note read enumerates every thread.
    pub fn create_thread(&self, draft: ThreadDraft) -> Result<Thread, ChatError> {
        if let Some(run_id) = &draft.anchor_run {
            if self.run_anchor_oid(run_id)?.is_none() {
                return Err(ChatError::DanglingAnchor(run_id.clone()));
            }
        }
        let thread = Thread {
            thread_id: ThreadId::generate(),
            title: draft.title,
            created_at: WallClock::now(),
            created_by: draft.created_by,
            anchor_run: draft.anchor_run,
            tags: draft.tags,
        };
        self.append_record(self.project_anchor()?, &wire::ChatRecord::Thread(thread.clone()))?;
        tracing::info!(thread = %thread.thread_id, "thread created");
        Ok(thread)
    }

    /// Persist a message. Assigns `id` and `ts`; when the draft is flagged
    /// encrypted, `text` and `refs` are sealed into the vault envelope before
    /// anything touches the object store.
    pub fn send(&self, draft: MessageDraft) -> Result<ChatMessage, ChatError> {
        let thread = match &draft.thread_id {
            Some(id) => Some(self.find_thread(id)?),
            None => None,
        };
        let target = self.target_for(thread.as_ref())?;

        let (text, refs) = if draft.flags.encrypted {
            (crypto::seal_content(&self.vault, &draft.text, &draft.refs)?, Vec::new())
        } else {
            (draft.text, draft.refs)
        };

        let now = WallClock::now();
        let message = ChatMessage {
            id: crate::core::MessageId::generate(now),
            ts: now,
            user: draft.user,
            thread_id: draft.thread_id,
            text,
            refs,
            flags: draft.flags,
            trace_id: draft.trace_id,
            source: draft.source,
        };
        self.append_record(target, &wire::ChatRecord::Message(message.clone()))?;
        tracing::debug!(message = %message.id, "message stored");
        Ok(message)
    }

    /// Recover the plaintext `text` and `refs` of an encrypted message.
    pub fn reveal(&self, message: &ChatMessage) -> Result<(String, Vec<String>), ChatError> {
        if !message.flags.encrypted {
            return Err(ChatError::NotEncrypted);
        }
        crypto::unseal_content(&self.vault, &message.text)
    }

    /// List messages in a scope, id-ascending (timestamp order). With a
    /// limit, the most recent messages win.
    pub fn list_messages(
        &self,
        scope: &MessageScope,
        limit: Option<usize>,
    ) -> Result<MessageListing, ChatError> {
        let mut listing = MessageListing {
            messages: Vec::new(),
            skipped: 0,
        };

        let targets = match scope {
            MessageScope::Run(run_id) => {
                let Some(oid) = self.run_anchor_oid(run_id)? else {
                    return Err(ChatError::DanglingAnchor(run_id.clone()));
                };
                vec![oid]
            }
            MessageScope::Thread(_) | MessageScope::Timeline => self.all_anchor_oids()?,
        };

        for target in targets {
            let (records, skipped) = self.read_records(target)?;
            listing.skipped += skipped;
            for record in records {
                if let wire::ChatRecord::Message(message) = record {
                    if scope_matches(scope, &message) {
                        listing.messages.push(message);
                    }
                }
            }
        }

        listing.messages.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(limit) = limit {
            if listing.messages.len() > limit {
                listing.messages.drain(..listing.messages.len() - limit);
            }
        }
        Ok(listing)
    }

    /// All thread records, creation order per the project anchor note.
    pub fn list_threads(&self) -> Result<(Vec<Thread>, usize), ChatError> {
        let refname = format!("refs/tags/{}", self.refs.anchor_tag);
        let Some(target) = crate::git::read_ref(&self.repo, &refname)? else {
            return Ok((Vec::new(), 0));
        };
        let (records, skipped) = self.read_records(target)?;
        let threads = records
            .into_iter()
            .filter_map(|r| match r {
                wire::ChatRecord::Thread(thread) => Some(thread),
                wire::ChatRecord::Message(_) => None,
            })
            .collect();
        Ok((threads, skipped))
    }

    pub fn find_thread(&self, thread_id: &ThreadId) -> Result<Thread, ChatError> {
        let (threads, _) = self.list_threads()?;
        threads
            .into_iter()
            .find(|t| &t.thread_id == thread_id)
            .ok_or_else(|| ChatError::ThreadNotFound(thread_id.clone()))
    }

    /// Every note target we write to: the project anchor (when it exists)
    /// plus every run anchor tag.
    fn all_anchor_oids(&self) -> Result<Vec<Oid>, ChatError> {
        let mut oids = Vec::new();
        let refname = format!("refs/tags/{}", self.refs.anchor_tag);
        if let Some(oid) = crate::git::read_ref(&self.repo, &refname)? {
            oids.push(oid);
        }
        let pattern = format!("{}/*", self.refs.run_tag_prefix);
        let names = self
            .repo
            .tag_names(Some(&pattern))
            .map_err(StoreError::Git)?;
        for name in names.iter().flatten() {
            if let Some(oid) = crate::git::read_ref(&self.repo, &format!("refs/tags/{name}"))? {
                oids.push(oid);
            }
        }
        Ok(oids)
    }

    fn read_records(&self, target: Oid) -> Result<(Vec<wire::ChatRecord>, usize), ChatError> {
        let Some(body) = notes::read_note(&self.repo, &self.refs.notes_ref, target)? else {
            return Ok((Vec::new(), 0));
        };
        let parsed = wire::parse_chat(body.as_bytes()).map_err(StoreError::Wire)?;
        Ok((parsed.records, parsed.skipped))
    }
}

fn scope_matches(scope: &MessageScope, message: &ChatMessage) -> bool {
    match scope {
        MessageScope::Thread(thread_id) => message.thread_id.as_ref() == Some(thread_id),
        MessageScope::Run(_) => true,
        MessageScope::Timeline => message.thread_id.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MessageFlags, MessageSource};

    fn sample(thread: Option<ThreadId>) -> ChatMessage {
        ChatMessage {
            id: crate::core::MessageId::parse("0000000000001-000000-aaaa").unwrap(),
            ts: WallClock(1),
            user: UserId::new("alice").unwrap(),
            thread_id: thread,
            text: "hi".into(),
            refs: Vec::new(),
            flags: MessageFlags::default(),
            trace_id: None,
            source: MessageSource::Manual,
        }
    }

    #[test]
    fn thread_scope_filters_by_thread_id() {
        let tid = ThreadId::parse("th-abcd1234").unwrap();
        let scope = MessageScope::Thread(tid.clone());
        assert!(scope_matches(&scope, &sample(Some(tid))));
        assert!(!scope_matches(&scope, &sample(None)));
        assert!(!scope_matches(
            &scope,
            &sample(Some(ThreadId::parse("th-other123").unwrap()))
        ));
    }

    #[test]
    fn timeline_scope_is_top_level_only() {
        assert!(scope_matches(&MessageScope::Timeline, &sample(None)));
        assert!(!scope_matches(
            &MessageScope::Timeline,
            &sample(Some(ThreadId::parse("th-abcd1234").unwrap()))
        ));
    }
}
