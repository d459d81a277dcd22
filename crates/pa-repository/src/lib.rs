//! Versioned, content-addressed storage for digitized policies.
//!
//! Grounded in the original `policy_repository.py`'s
//! `store`/`load`/`store_version`/`load_version`/`list_versions`/`invalidate`
//! surface, adapted to the teacher's async-trait-over-a-mutexed-state shape
//! (`veritas-audit::memory::InMemoryAuditWriter`). Implementations are an
//! I/O boundary: they may be backed by memory, a filesystem, or a database,
//! but never participate in the evaluation core's determinism guarantees.

pub mod error;
pub mod key;
pub mod memory;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::InMemoryPolicyRepository;

use chrono::{DateTime, Utc};
use pa_contracts::DigitizedPolicy;

/// One entry in a policy's version history, as returned by `list_versions`.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub version: String,
    pub cached_at: DateTime<Utc>,
    pub content_hash: String,
}

/// Storage contract for digitized policies. Every method is keyed by
/// `(payer, medication, version)`; `payer`/`medication` are normalized
/// internally via [`key::normalize_key_part`] so callers never need to
/// pre-normalize.
///
/// `Send + Sync` so a single implementation can be shared across an async
/// runtime's worker threads behind an `Arc`.
pub trait PolicyRepository: Send + Sync {
    /// Stores `policy` under its own `version` field (or `"latest"` if
    /// empty) and returns the computed content hash.
    fn store(&self, policy: &DigitizedPolicy) -> impl std::future::Future<Output = RepositoryResult<String>> + Send;

    /// Loads the policy for `(payer, medication, version)`. `version`
    /// defaults to `"latest"` when `None`, mirroring the original's default
    /// argument. A missing or corrupted entry is `Ok(None)`, never an
    /// error.
    fn load(
        &self,
        payer: &str,
        medication: &str,
        version: Option<&str>,
    ) -> impl std::future::Future<Output = RepositoryResult<Option<DigitizedPolicy>>> + Send;

    /// Stores `policy` under an explicit `version_label`, overriding
    /// whatever `policy.version` already held.
    fn store_version(
        &self,
        policy: DigitizedPolicy,
        version_label: &str,
    ) -> impl std::future::Future<Output = RepositoryResult<String>> + Send;

    /// Loads a specific version by label. Equivalent to
    /// `load(payer, medication, Some(version))`.
    fn load_version(
        &self,
        payer: &str,
        medication: &str,
        version: &str,
    ) -> impl std::future::Future<Output = RepositoryResult<Option<DigitizedPolicy>>> + Send;

    /// Lists every stored version for `(payer, medication)`, newest first.
    fn list_versions(
        &self,
        payer: &str,
        medication: &str,
    ) -> impl std::future::Future<Output = RepositoryResult<Vec<VersionInfo>>> + Send;

    /// Removes every stored version for `(payer, medication)`. Returns
    /// whether anything was actually removed.
    fn invalidate(
        &self,
        payer: &str,
        medication: &str,
    ) -> impl std::future::Future<Output = RepositoryResult<bool>> + Send;
}
