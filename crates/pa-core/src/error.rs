use thiserror::Error;

/// The only way patient normalization can fail: the document root was not a
/// JSON object. Every other absence is represented as an unset field, never
/// an error — see the crate-level duality between missing data and failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("patient document root is not a JSON object")]
    NotAMapping,
}
