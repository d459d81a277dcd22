use std::future::Future;

use pa_reference::ExtractedPolicyDraft;
use serde::{Deserialize, Serialize};

/// Where the raw policy document came from. Carried through to
/// `RawExtractionResult` so the pipeline can decide whether a companion
/// text file needs to be loaded for Pass 2 (a PDF has no text of its own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Text,
    Pdf,
}

/// Output of Pass 1 (Extract).
#[derive(Debug, Clone)]
pub struct RawExtractionResult {
    pub draft: ExtractedPolicyDraft,
    pub source_hash: String,
    pub source_type: SourceType,
    pub extraction_model: String,
    pub extraction_timestamp: String,
}

/// One correction Pass 2 wants applied to a single criterion field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub criterion_id: String,
    pub field: String,
    pub corrected_value: serde_json::Value,
}

/// Output of Pass 2 (Validate).
#[derive(Debug, Clone)]
pub struct ValidatedExtractionResult {
    pub draft: ExtractedPolicyDraft,
    pub validation_status: String,
    pub quality_score: f64,
    pub corrections_applied: Vec<Correction>,
}

/// Pass 1 collaborator: turns raw policy text into a structured draft.
/// Stands in for the real system's generative extraction model — only its
/// interface to the pipeline is in scope here.
pub trait ExtractionModel: Send + Sync {
    fn extract(&self, policy_text: &str) -> impl Future<Output = RawExtractionResult> + Send;
}

/// Pass 2 collaborator: proposes field-level corrections against the
/// extracted draft plus a quality score, given the original policy text for
/// comparison.
pub trait ValidationModel: Send + Sync {
    fn validate(&self, draft: &ExtractedPolicyDraft, policy_text: &str) -> impl Future<Output = ValidatedExtractionResult> + Send;
}
