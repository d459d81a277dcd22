//! The 3-pass digitalization pipeline: Extract, Validate, Reference-validate,
//! then persist.
//!
//! Orchestration only — Pass 1 and Pass 2 are pluggable collaborators
//! ([`traits::ExtractionModel`], [`traits::ValidationModel`]) standing in
//! for the real system's generative extraction/validation models, which are
//! out of scope here (§1 Non-goals: "generative-model clients"). Pass 3
//! lives in `pa-reference`. The pipeline itself never calls an evaluator —
//! evaluation is a separate, later concern handled by `pa-core`.

pub mod config;
pub mod error;
pub mod path_confine;
pub mod pipeline;
pub mod traits;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use path_confine::confine;
pub use pipeline::{DigitalizationResult, PolicyDigitalizationPipeline};
pub use traits::{
    Correction, ExtractionModel, RawExtractionResult, SourceType, ValidatedExtractionResult, ValidationModel,
};
