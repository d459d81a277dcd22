//! In-memory, transactional implementation of [`crate::PolicyRepository`].
//!
//! Grounded in `veritas-audit::memory::InMemoryAuditWriter`'s
//! `Arc<Mutex<State>>` shape and its SHA-256 + `hex::encode` hashing
//! pattern (`chain::hash_event`), adapted here to hash a policy's
//! canonical JSON rather than a chained audit record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use pa_contracts::DigitizedPolicy;

use crate::error::RepositoryResult;
use crate::key::{normalize_key_part, DEFAULT_VERSION};
use crate::{PolicyRepository, VersionInfo};

/// One stored row. The policy is kept as a `serde_json::Value` rather than
/// the typed `DigitizedPolicy` so that `load` exercises real
/// deserialization (and so a corrupted row — simulated via
/// `InMemoryPolicyRepository::corrupt` in tests — behaves exactly as the
/// production miss-on-corruption path would against a real JSON column).
#[derive(Debug, Clone)]
struct Row {
    raw_json: serde_json::Value,
    content_hash: String,
    cached_at: DateTime<Utc>,
}

type Key = (String, String, String);

#[derive(Default)]
struct State {
    rows: HashMap<Key, Row>,
}

/// The reference repository implementation: a versioned, content-addressed
/// store keyed by `(payer, medication, version)`, held entirely in memory
/// behind a `tokio::sync::Mutex` so `store`/`load` can be `async fn`
/// without blocking a std mutex across an await point.
#[derive(Clone, Default)]
pub struct InMemoryPolicyRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryPolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn content_hash(value: &serde_json::Value) -> String {
        let canonical = serde_json::to_vec(value).expect("policy JSON always serializes");
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let digest = hex::encode(hasher.finalize());
        digest[..16].to_string()
    }

    fn key_for(payer: &str, medication: &str, version: &str) -> Key {
        (normalize_key_part(payer), normalize_key_part(medication), version.to_string())
    }

    /// Test-only hook: overwrite a stored row with an undeserializable JSON
    /// value so `load`'s corrupted-row handling can be exercised directly.
    #[cfg(test)]
    async fn corrupt(&self, payer: &str, medication: &str, version: &str) {
        let key = Self::key_for(payer, medication, version);
        let mut state = self.state.lock().await;
        if let Some(row) = state.rows.get_mut(&key) {
            row.raw_json = serde_json::json!({ "atomic_criteria": "not-a-map" });
        }
    }
}

impl PolicyRepository for InMemoryPolicyRepository {
    async fn store(&self, policy: &DigitizedPolicy) -> RepositoryResult<String> {
        let version = if policy.version.is_empty() { DEFAULT_VERSION } else { policy.version.as_str() };
        let key = Self::key_for(&policy.payer_name, &policy.medication_name, version);
        let raw_json = policy.canonical_json();
        let content_hash = Self::content_hash(&raw_json);

        let mut state = self.state.lock().await;
        state.rows.insert(
            key,
            Row { raw_json, content_hash: content_hash.clone(), cached_at: Utc::now() },
        );

        tracing::info!(
            payer = %policy.payer_name,
            medication = %policy.medication_name,
            version = %version,
            content_hash = %content_hash,
            "policy stored"
        );
        Ok(content_hash)
    }

    async fn load(&self, payer: &str, medication: &str, version: Option<&str>) -> RepositoryResult<Option<DigitizedPolicy>> {
        let version = version.unwrap_or(DEFAULT_VERSION);
        let key = Self::key_for(payer, medication, version);
        let state = self.state.lock().await;
        let Some(row) = state.rows.get(&key) else { return Ok(None) };

        match serde_json::from_value::<DigitizedPolicy>(row.raw_json.clone()) {
            Ok(policy) => Ok(Some(policy)),
            Err(e) => {
                tracing::warn!(
                    payer = %payer,
                    medication = %medication,
                    version = %version,
                    error = %e,
                    "corrupted cached policy, treating as cache miss"
                );
                Ok(None)
            }
        }
    }

    async fn store_version(&self, mut policy: DigitizedPolicy, version_label: &str) -> RepositoryResult<String> {
        policy.version = version_label.to_string();
        self.store(&policy).await
    }

    async fn load_version(&self, payer: &str, medication: &str, version: &str) -> RepositoryResult<Option<DigitizedPolicy>> {
        self.load(payer, medication, Some(version)).await
    }

    async fn list_versions(&self, payer: &str, medication: &str) -> RepositoryResult<Vec<VersionInfo>> {
        let payer_key = normalize_key_part(payer);
        let med_key = normalize_key_part(medication);
        let state = self.state.lock().await;

        let mut versions: Vec<VersionInfo> = state
            .rows
            .iter()
            .filter(|((p, m, _), _)| p == &payer_key && m == &med_key)
            .map(|((_, _, version), row)| VersionInfo {
                version: version.clone(),
                cached_at: row.cached_at,
                content_hash: row.content_hash.clone(),
            })
            .collect();
        versions.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        Ok(versions)
    }

    async fn invalidate(&self, payer: &str, medication: &str) -> RepositoryResult<bool> {
        let payer_key = normalize_key_part(payer);
        let med_key = normalize_key_part(medication);
        let mut state = self.state.lock().await;
        let before = state.rows.len();
        state.rows.retain(|(p, m, _), _| !(p == &payer_key && m == &med_key));
        let deleted = state.rows.len() < before;
        tracing::info!(payer = %payer, medication = %medication, deleted, "policy cache invalidated");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::{AtomicCriterion, CriterionType};

    fn sample_policy(version: &str) -> DigitizedPolicy {
        let mut policy = DigitizedPolicy::new("p1", "Acme Health", "Humira");
        policy.version = version.to_string();
        policy
            .atomic_criteria
            .insert("c1".to_string(), AtomicCriterion::new("c1", CriterionType::Age, "demo"));
        policy
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let repo = InMemoryPolicyRepository::new();
        let policy = sample_policy("latest");
        repo.store(&policy).await.unwrap();

        let loaded = repo.load("Acme Health", "Humira", None).await.unwrap().unwrap();
        assert_eq!(loaded.canonical_json(), policy.canonical_json());
    }

    #[tokio::test]
    async fn load_is_keyed_by_normalized_payer_and_medication() {
        let repo = InMemoryPolicyRepository::new();
        repo.store(&sample_policy("latest")).await.unwrap();

        let loaded = repo.load("acme health", "HUMIRA", None).await.unwrap();
        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn missing_key_is_a_miss_not_an_error() {
        let repo = InMemoryPolicyRepository::new();
        let loaded = repo.load("nobody", "nothing", None).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn store_version_sets_the_label_and_keeps_both_versions_addressable() {
        let repo = InMemoryPolicyRepository::new();
        repo.store(&sample_policy("latest")).await.unwrap();
        repo.store_version(sample_policy("latest"), "v2").await.unwrap();

        assert!(repo.load("Acme Health", "Humira", Some("latest")).await.unwrap().is_some());
        assert!(repo.load("Acme Health", "Humira", Some("v2")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_versions_orders_newest_first() {
        let repo = InMemoryPolicyRepository::new();
        repo.store(&sample_policy("v1")).await.unwrap();
        repo.store(&sample_policy("v2")).await.unwrap();

        let versions = repo.list_versions("Acme Health", "Humira").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions[0].cached_at >= versions[1].cached_at);
    }

    #[tokio::test]
    async fn invalidate_removes_all_versions_for_the_key() {
        let repo = InMemoryPolicyRepository::new();
        repo.store(&sample_policy("v1")).await.unwrap();
        repo.store(&sample_policy("v2")).await.unwrap();

        let deleted = repo.invalidate("Acme Health", "Humira").await.unwrap();
        assert!(deleted);
        assert!(repo.list_versions("Acme Health", "Humira").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_row_is_treated_as_a_miss_not_an_error() {
        let repo = InMemoryPolicyRepository::new();
        repo.store(&sample_policy("latest")).await.unwrap();
        repo.corrupt("Acme Health", "Humira", "latest").await;

        let loaded = repo.load("Acme Health", "Humira", None).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn content_hash_is_deterministic_for_identical_policies() {
        let repo = InMemoryPolicyRepository::new();
        let hash1 = repo.store(&sample_policy("latest")).await.unwrap();
        let repo2 = InMemoryPolicyRepository::new();
        let hash2 = repo2.store(&sample_policy("latest")).await.unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 16);
    }
}
