//! Compare-and-swap ref updates.
//!
//! The ledger ref is a single mutable pointer shared by every concurrent
//! writer. All mutation goes through `compare_and_swap`: callers supply the
//! ref's last-known value and a mismatch reports a conflict instead of
//! overwriting. `with_cas_retry` is the standard read-build-swap loop with
//! bounded attempts and jittered exponential backoff.

use std::time::Duration;

use git2::{Oid, Repository};

use super::error::StoreError;

/// Outcome of a single compare-and-swap attempt.
#[derive(Debug)]
pub enum CasOutcome {
    Updated,
    Conflict { actual: Option<Oid> },
}

/// Read a ref, returning `None` when it does not exist.
pub fn read_ref(repo: &Repository, name: &str) -> Result<Option<Oid>, StoreError> {
    match repo.refname_to_id(name) {
        Ok(oid) => Ok(Some(oid)),
        Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(err) => Err(StoreError::Git(err)),
    }
}

/// Atomically move `name` from `expected` to `new`.
///
/// `expected = None` asserts the ref must not exist yet (orphan creation).
/// The underlying ref-update primitive is atomic; a losing writer sees
/// `Conflict` with the value that beat it.
pub fn compare_and_swap(
    repo: &Repository,
    name: &str,
    expected: Option<Oid>,
    new: Oid,
) -> Result<CasOutcome, StoreError> {
    let result = match expected {
        Some(old) => repo
            .reference_matching(name, new, true, old, "opslog cas")
            .map(|_| ()),
        None => {
            // Creation must not clobber a ref that raced into existence.
            if let Some(actual) = read_ref(repo, name)? {
                return Ok(CasOutcome::Conflict {
                    actual: Some(actual),
                });
            }
            repo.reference(name, new, false, "opslog init").map(|_| ())
        }
    };

    match result {
        Ok(()) => Ok(CasOutcome::Updated),
        Err(err)
            if matches!(
                err.code(),
                git2::ErrorCode::Modified | git2::ErrorCode::Exists | git2::ErrorCode::Locked
            ) =>
        {
            Ok(CasOutcome::Conflict {
                actual: read_ref(repo, name)?,
            })
        }
        Err(err) => Err(StoreError::Git(err)),
    }
}

/// Bounded retry with capped exponential backoff.
///
/// Defaults are the documented conservative choice: 5 attempts, 25ms base
/// doubling to a 250ms cap, plus uniform jitter up to one base delay.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 25,
            max_delay_ms: 250,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        use rand::Rng;
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jitter = rand::rng().random_range(0..=self.base_delay_ms);
        Duration::from_millis(exp + jitter)
    }
}

/// Read-build-swap loop against a single ref.
///
/// `build` receives the current ref value and returns the replacement commit
/// plus a result to hand back on success. On conflict the loop rereads and
/// rebuilds on top of the winning value. The retry stays inside this one
/// call; callers see either success or `CasExhausted`.
pub fn with_cas_retry<T, E>(
    repo: &Repository,
    name: &str,
    policy: RetryPolicy,
    mut build: impl FnMut(Option<Oid>) -> Result<(Oid, T), E>,
) -> Result<T, E>
where
    E: From<StoreError>,
{
    for attempt in 0..policy.max_attempts {
        let current = read_ref(repo, name)?;
        let (new_oid, value) = build(current)?;
        match compare_and_swap(repo, name, current, new_oid)? {
            CasOutcome::Updated => return Ok(value),
            CasOutcome::Conflict { .. } => {
                tracing::debug!(r#ref = name, attempt, "cas conflict, retrying");
                // The last attempt falls through to CasExhausted unslept.
                if attempt + 1 < policy.max_attempts {
                    std::thread::sleep(policy.backoff(attempt));
                }
            }
        }
    }
    Err(StoreError::CasExhausted {
        name: name.to_string(),
        attempts: policy.max_attempts,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::default();
        for attempt in 0..10 {
            let delay = policy.backoff(attempt).as_millis() as u64;
            assert!(delay <= policy.max_delay_ms + policy.base_delay_ms);
        }
    }

    #[test]
    fn backoff_grows_before_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 1_000,
        };
        // Strip jitter by comparing lower bounds.
        assert!(policy.backoff(3).as_millis() >= 80);
    }
}
