use thiserror::Error;

/// `InMemoryPolicyRepository` never constructs `NotFound` itself — its
/// `load`/`load_version` return `Ok(None)` on a miss, per §4.7/§7. The
/// variant exists for other backends (e.g. a filesystem- or DB-backed
/// repository, or the pipeline's own exhausted-fallback-chain case in
/// `get_or_digitalize`) where "not found" is the caller-visible outcome of
/// a boundary operation rather than a query result. A corrupted row is
/// never surfaced as `Storage` either — it is also treated as a miss.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("policy not found: {reason}")]
    NotFound { reason: String },
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
