use thiserror::Error;

/// Aggregates every failure mode a CLI subcommand can hit: reading a file,
/// parsing its JSON, normalizing a patient record, or running the pipeline.
/// The library crates themselves stay narrowly typed (`NormalizeError`,
/// `PipelineError`, ...); this enum exists only at the CLI's own boundary,
/// the same way `demo`'s scenarios bubble up a single error type to `main`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not read {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("malformed JSON in {path}: {source}")]
    Json { path: String, #[source] source: serde_json::Error },
    #[error(transparent)]
    Normalize(#[from] pa_core::NormalizeError),
    #[error(transparent)]
    Pipeline(#[from] pa_pipeline::PipelineError),
}

pub type CliResult<T> = Result<T, CliError>;

pub fn read_to_string(path: &std::path::Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io { path: path.display().to_string(), source })
}

pub fn parse_json<T: serde::de::DeserializeOwned>(path: &std::path::Path, text: &str) -> CliResult<T> {
    serde_json::from_str(text).map_err(|source| CliError::Json { path: path.display().to_string(), source })
}
