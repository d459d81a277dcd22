use pa_repository::RepositoryError;
use thiserror::Error;

/// `get_or_digitalize`'s exhausted fallback chain (cache miss, no
/// pre-digitized JSON, no raw text file) raises via `RepositoryError::NotFound`
/// rather than a fourth variant here, keeping this enum's shape exactly the
/// taxonomy named in the design: extraction, bad input, or a wrapped
/// repository failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {reason}")]
    Extraction { reason: String },
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Pass 1 did not return within `PipelineConfig::model_timeout_secs`.
    /// Fatal, same as any other extraction failure — the repository is not
    /// mutated. Pass 2 timing out is *not* this variant: a slow validation
    /// model degrades the same way a malformed corrections payload does
    /// (see `pipeline::digitalize_policy`), it never aborts the run.
    #[error("model call for stage '{stage}' did not complete within {timeout_secs}s")]
    Timeout { stage: String, timeout_secs: u64 },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
