//! Typed entity references: `@kind:id`.
//!
//! The kind vocabulary is closed. A reference is a plain string in storage
//! and a resolved snapshot when rendered; parsing free text never fails
//! because an unmatched `@` is just a character.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CoreError;

/// Closed vocabulary of entity kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Run,
    Thread,
    Trace,
    Commit,
    Branch,
    User,
    File,
    Release,
    Doc,
    Media,
    Env,
    Secret,
    Audit,
    Integration,
    Stack,
    Module,
}

impl RefKind {
    pub const ALL: [RefKind; 16] = [
        RefKind::Run,
        RefKind::Thread,
        RefKind::Trace,
        RefKind::Commit,
        RefKind::Branch,
        RefKind::User,
        RefKind::File,
        RefKind::Release,
        RefKind::Doc,
        RefKind::Media,
        RefKind::Env,
        RefKind::Secret,
        RefKind::Audit,
        RefKind::Integration,
        RefKind::Stack,
        RefKind::Module,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Run => "run",
            RefKind::Thread => "thread",
            RefKind::Trace => "trace",
            RefKind::Commit => "commit",
            RefKind::Branch => "branch",
            RefKind::User => "user",
            RefKind::File => "file",
            RefKind::Release => "release",
            RefKind::Doc => "doc",
            RefKind::Media => "media",
            RefKind::Env => "env",
            RefKind::Secret => "secret",
            RefKind::Audit => "audit",
            RefKind::Integration => "integration",
            RefKind::Stack => "stack",
            RefKind::Module => "module",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::InvalidRefKind(s.to_string()))
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `@kind:id` reference.
///
/// For `file` the id may carry a `#L<start>-L<end>` range suffix; the id is
/// kept verbatim so storage stays a plain string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RefKind,
    pub id: String,
}

impl Reference {
    pub fn new(kind: RefKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_vocabulary_is_closed() {
        assert_eq!(RefKind::parse("run").unwrap(), RefKind::Run);
        assert_eq!(RefKind::parse("secret").unwrap(), RefKind::Secret);
        assert!(RefKind::parse("issue").is_err());
    }

    #[test]
    fn reference_renders_as_at_kind_id() {
        let r = Reference::new(RefKind::Commit, "a1b2c3");
        assert_eq!(r.to_string(), "@commit:a1b2c3");
    }
}
