//! Session facade for front ends.
//!
//! One `OpsLedger` per repository wires the ledger service, chat store,
//! resolver, and trace recorder together behind the operation surface the
//! web/CLI layers consume. Every call is synchronous and returns either a
//! structured result or a typed error; the only internal retry is the CAS
//! loop inside ledger writes.

use std::path::{Path, PathBuf};

use crate::chat::{ChatStore, MessageListing, MessageScope, ThreadDraft, Vault};
use crate::config::Config;
use crate::core::{
    ChatMessage, EventInput, MessageDraft, OpEvent, Reference, Run, RunAnchor, RunId, RunStatus,
    Thread, ThreadId, Trace, TraceId, UserId,
};
use crate::ledger::{LedgerService, RunDetail, RunFilter, RunListing};
use crate::resolve::{Resolution, ResolveContext, Resolver, Suggestion};
use crate::trace::{RecordingHandle, StoppedTrace, TraceRecorder};
use crate::Result;

pub struct OpsLedger {
    repo_path: PathBuf,
    ledger: LedgerService,
    chat: ChatStore,
    resolver: Resolver,
    recorder: TraceRecorder,
}

impl OpsLedger {
    /// Open a session against a repository with explicit config.
    pub fn open_with_config(repo_path: &Path, config: Config) -> Result<Self> {
        let vault = Vault::open(&config.vault);
        let ledger = LedgerService::open(repo_path, config.refs.clone(), config.retry.policy())?;
        let chat = ChatStore::open(repo_path, config.refs, vault, config.retry.policy())?;
        let resolver = Resolver::open(repo_path)?;
        Ok(Self {
            repo_path: repo_path.to_path_buf(),
            ledger,
            chat,
            resolver,
            recorder: TraceRecorder::new(),
        })
    }

    /// Open a session using the repo-local config file (or defaults).
    pub fn open(repo_path: &Path) -> Result<Self> {
        let config = crate::config::load(repo_path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "config load failed, using defaults");
            Config::default()
        });
        Self::open_with_config(repo_path, config)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    // --- ledger ---

    pub fn create_run(&self, run_type: &str, user: UserId) -> Result<RunAnchor> {
        Ok(self.ledger.create_run(run_type, user)?)
    }

    pub fn append_event(&self, run_id: &RunId, event: EventInput) -> Result<OpEvent> {
        Ok(self.ledger.append_event(run_id, event)?)
    }

    pub fn close_run(&self, run_id: &RunId, status: RunStatus) -> Result<Run> {
        Ok(self.ledger.close_run(run_id, status)?)
    }

    pub fn get_run(&self, run_id: &RunId) -> Result<RunDetail> {
        Ok(self.ledger.get_run(run_id)?)
    }

    pub fn list_runs(&self, filter: &RunFilter) -> Result<RunListing> {
        Ok(self.ledger.list_runs(filter)?)
    }

    pub fn put_artifact(&self, run_id: &RunId, name: &str, bytes: &[u8]) -> Result<()> {
        Ok(self.ledger.put_artifact(run_id, name, bytes)?)
    }

    pub fn get_artifact(&self, run_id: &RunId, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.ledger.get_artifact(run_id, name)?)
    }

    // --- chat ---

    pub fn create_thread(&self, draft: ThreadDraft) -> Result<Thread> {
        Ok(self.chat.create_thread(draft)?)
    }

    pub fn send(&self, draft: MessageDraft) -> Result<ChatMessage> {
        Ok(self.chat.send(draft)?)
    }

    pub fn list_messages(
        &self,
        scope: &MessageScope,
        limit: Option<usize>,
    ) -> Result<MessageListing> {
        Ok(self.chat.list_messages(scope, limit)?)
    }

    pub fn list_threads(&self) -> Result<(Vec<Thread>, usize)> {
        Ok(self.chat.list_threads()?)
    }

    pub fn find_thread(&self, thread_id: &ThreadId) -> Result<Thread> {
        Ok(self.chat.find_thread(thread_id)?)
    }

    /// Decrypt an encrypted message's `text` and `refs`.
    pub fn reveal(&self, message: &ChatMessage) -> Result<(String, Vec<String>)> {
        Ok(self.chat.reveal(message)?)
    }

    // --- references ---

    /// Extract references from free text. Never fails.
    pub fn parse_refs(&self, text: &str) -> Vec<Reference> {
        crate::resolve::parse_refs(text)
    }

    pub fn resolve_ref(&self, reference: &Reference) -> Result<Resolution> {
        let ctx = ResolveContext {
            ledger: &self.ledger,
            chat: &self.chat,
        };
        Ok(self.resolver.resolve(&ctx, reference)?)
    }

    /// Resolve a `@kind:id` string; unlike parsing, an unknown kind here is
    /// an explicit error.
    pub fn resolve_str(&self, s: &str) -> Result<Resolution> {
        let ctx = ResolveContext {
            ledger: &self.ledger,
            chat: &self.chat,
        };
        Ok(self.resolver.resolve_str(&ctx, s)?)
    }

    pub fn autocomplete(&self, prefix: &str) -> Result<Vec<Suggestion>> {
        let ctx = ResolveContext {
            ledger: &self.ledger,
            chat: &self.chat,
        };
        Ok(self.resolver.autocomplete(&ctx, prefix)?)
    }

    // --- traces ---

    pub fn start_trace(
        &mut self,
        name: &str,
        classification: &str,
        user: UserId,
    ) -> Result<RecordingHandle> {
        Ok(self.recorder.start(&self.ledger, name, classification, user)?)
    }

    /// Stop the active recording, persist it, and return the trace with its
    /// draft message. The draft is not posted; pass it to `send` explicitly.
    pub fn stop_trace(&mut self) -> Result<StoppedTrace> {
        Ok(self.recorder.stop(&self.ledger)?)
    }

    /// Discard the active recording without persisting.
    pub fn cancel_trace(&mut self) {
        self.recorder.cancel();
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn get_trace(&self, trace_id: &TraceId) -> Result<Trace> {
        Ok(self.ledger.get_trace(trace_id)?)
    }
}
