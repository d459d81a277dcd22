//! Deterministic stand-ins for the real extraction/validation models.
//!
//! The generative-model clients themselves are out of scope (§1 Non-goals);
//! this CLI only needs *something* conforming to
//! [`pa_pipeline::ExtractionModel`]/[`pa_pipeline::ValidationModel`] to drive
//! the pipeline end to end from the command line. `JsonPassthroughExtractor`
//! treats the source text as an already-structured policy draft (the shape
//! a real extraction model would have produced), and
//! `NoOpValidationModel` reports every draft as fully validated with no
//! corrections — useful for demoing the pipeline against hand-authored
//! fixture JSON rather than free-text policy documents.

use chrono::Utc;
use pa_pipeline::{Correction, ExtractionModel, RawExtractionResult, SourceType, ValidatedExtractionResult, ValidationModel};
use pa_reference::ExtractedPolicyDraft;
use sha2::{Digest, Sha256};

pub struct JsonPassthroughExtractor;

impl ExtractionModel for JsonPassthroughExtractor {
    async fn extract(&self, policy_text: &str) -> RawExtractionResult {
        let draft: ExtractedPolicyDraft = serde_json::from_str(policy_text).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(policy_text.as_bytes());
        let source_hash = hex::encode(hasher.finalize())[..16].to_string();

        RawExtractionResult {
            draft,
            source_hash,
            source_type: SourceType::Text,
            extraction_model: "cli-json-passthrough".to_string(),
            extraction_timestamp: Utc::now().to_rfc3339(),
        }
    }
}

pub struct NoOpValidationModel;

impl ValidationModel for NoOpValidationModel {
    async fn validate(&self, draft: &ExtractedPolicyDraft, _policy_text: &str) -> ValidatedExtractionResult {
        ValidatedExtractionResult {
            draft: draft.clone(),
            validation_status: "validated".to_string(),
            quality_score: 0.85,
            corrections_applied: Vec::<Correction>::new(),
        }
    }
}
