use thiserror::Error;

/// Fatal failures building a typed policy from an extraction draft. Code
/// format problems are *not* represented here — those are never fatal
/// (§7): they are recorded in `codes_validated` and folded into the
/// extraction-quality score instead.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("extraction draft could not be deserialized: {reason}")]
    MalformedDraft { reason: String },
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;
