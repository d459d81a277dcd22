use std::path::PathBuf;

use pa_contracts::DigitizedPolicy;
use pa_reference::ReferenceDataValidator;
use pa_repository::key::normalize_key_part;
use pa_repository::{PolicyRepository, RepositoryError};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::path_confine::confine;
use crate::traits::{ExtractionModel, SourceType, ValidationModel};

/// Everything a caller needs after a full (or partial) run of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalizationResult {
    pub policy: DigitizedPolicy,
    pub source_type: SourceType,
    pub passes_completed: u8,
    pub extraction_quality: String,
    pub validation_status: String,
    pub quality_score: f64,
    pub corrections_count: usize,
    pub criteria_count: usize,
    pub indications_count: usize,
    pub stored: bool,
    pub cache_id: String,
}

/// Orchestrates the 3-pass digitalization pipeline: Extract, Validate,
/// Reference-validate, then persist. `E`/`V`/`R` are the pluggable
/// collaborators — generic parameters rather than `Box<dyn Trait>`, since
/// native `async fn` in traits is not object-safe; this still lets a caller
/// swap in any extraction model, validation model, or repository backend
/// without touching this orchestration logic.
pub struct PolicyDigitalizationPipeline<E, V, R>
where
    E: ExtractionModel,
    V: ValidationModel,
    R: PolicyRepository,
{
    extractor: E,
    validator: V,
    reference_validator: ReferenceDataValidator,
    repository: R,
    config: PipelineConfig,
}

impl<E, V, R> PolicyDigitalizationPipeline<E, V, R>
where
    E: ExtractionModel,
    V: ValidationModel,
    R: PolicyRepository,
{
    pub fn new(extractor: E, validator: V, repository: R, config: PipelineConfig) -> Self {
        let reference_validator = ReferenceDataValidator::new(config.good_quality_threshold, config.needs_review_quality_threshold);
        tracing::info!("policy digitalization pipeline initialized");
        Self { extractor, validator, reference_validator, repository, config }
    }

    /// Runs the full 3-pass pipeline over `source`, storing the result.
    pub async fn digitalize_policy(&self, source: &str, source_type: SourceType, skip_validation: bool) -> PipelineResult<DigitalizationResult> {
        tracing::info!(?source_type, "starting digitalization pipeline");

        let model_timeout = std::time::Duration::from_secs(self.config.model_timeout_secs);

        // Pass 1: Extract. A model call that never returns is as fatal as
        // one that returns an empty extraction — neither leaves anything
        // for Pass 2 to work with.
        let raw = match tokio::time::timeout(model_timeout, self.extractor.extract(source)).await {
            Ok(raw) => raw,
            Err(_) => {
                return Err(PipelineError::Timeout { stage: "extract".to_string(), timeout_secs: self.config.model_timeout_secs });
            }
        };
        let mut passes_completed = 1u8;

        if raw.draft.is_empty_extraction() {
            return Err(PipelineError::Extraction {
                reason: format!(
                    "Pass 1 returned empty extraction (no criteria or indications). Source length: {} chars, model: {}",
                    source.len(),
                    raw.extraction_model
                ),
            });
        }

        // Pass 2: Validate (unless skipped). A timed-out validation call
        // degrades exactly like a malformed corrections payload (§7): fall
        // through to Pass 3 with the uncorrected extraction and the
        // configured quality floor, rather than aborting the run.
        let validated = if skip_validation {
            crate::traits::ValidatedExtractionResult {
                draft: raw.draft.clone(),
                validation_status: "skipped".to_string(),
                quality_score: 0.7,
                corrections_applied: Vec::new(),
            }
        } else {
            match tokio::time::timeout(model_timeout, self.validator.validate(&raw.draft, source)).await {
                Ok(mut validated) => {
                    passes_completed = 2;
                    for correction in &validated.corrections_applied {
                        validated.draft.apply_correction(&correction.criterion_id, &correction.field, &correction.corrected_value);
                    }
                    validated
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = self.config.model_timeout_secs,
                        "Pass 2 validation model timed out, proceeding with uncorrected extraction"
                    );
                    crate::traits::ValidatedExtractionResult {
                        draft: raw.draft.clone(),
                        validation_status: "timeout".to_string(),
                        quality_score: self.config.validation_quality_floor,
                        corrections_applied: Vec::new(),
                    }
                }
            }
        };

        // Pass 3: Reference-validate + build the typed policy.
        let policy_id = format!("{}-{}", normalize_key_part(&validated.draft.payer_name), normalize_key_part(&validated.draft.medication_name));
        let mut policy = self
            .reference_validator
            .validate_codes(policy_id, validated.draft.clone(), validated.quality_score);
        passes_completed = 3;

        policy.extraction_timestamp = Some(raw.extraction_timestamp.clone());
        policy.extraction_model = Some(raw.extraction_model.clone());
        policy.source_document_hash = Some(raw.source_hash.clone());

        let cache_id = self.repository.store(&policy).await?;

        tracing::info!(
            policy_id = %policy.policy_id,
            criteria = policy.atomic_criteria.len(),
            indications = policy.indications.len(),
            quality = %policy.extraction_quality.as_deref().unwrap_or(""),
            "digitalization pipeline complete"
        );

        Ok(DigitalizationResult {
            criteria_count: policy.atomic_criteria.len(),
            indications_count: policy.indications.len(),
            extraction_quality: policy.extraction_quality.clone().unwrap_or_default(),
            policy,
            source_type,
            passes_completed,
            validation_status: validated.validation_status,
            quality_score: validated.quality_score,
            corrections_count: validated.corrections_applied.len(),
            stored: true,
            cache_id,
        })
    }

    /// Loads the latest digitized policy from cache, falling back to a
    /// pre-digitized JSON file, then a raw policy text file, confining
    /// every derived path to `config.policies_root`.
    pub async fn get_or_digitalize(&self, payer_name: &str, medication_name: &str) -> PipelineResult<DigitizedPolicy> {
        if let Some(cached) = self.repository.load(payer_name, medication_name, None).await? {
            tracing::info!(payer = %payer_name, medication = %medication_name, "loaded digitized policy from cache");
            return Ok(cached);
        }

        let payer_key = normalize_key_part(payer_name);
        let med_key = normalize_key_part(medication_name);
        if !is_safe_key(&payer_key) || !is_safe_key(&med_key) {
            return Err(PipelineError::Repository(RepositoryError::NotFound {
                reason: format!("invalid payer/medication name: {payer_name}/{medication_name}"),
            }));
        }

        let digitized_path = confine(&self.config.policies_root, &format!("{payer_key}_{med_key}_digitized.json"))?;
        if let Ok(contents) = tokio::fs::read_to_string(&digitized_path).await {
            let policy: DigitizedPolicy = serde_json::from_str(&contents).map_err(|e| PipelineError::InvalidInput {
                reason: format!("pre-digitized policy at {} is malformed: {e}", digitized_path.display()),
            })?;
            self.repository.store(&policy).await?;
            tracing::info!(path = %digitized_path.display(), "loaded from pre-digitized JSON and cached");
            return Ok(policy);
        }

        let policy_path = confine(&self.config.policies_root, &format!("{payer_key}_{med_key}.txt"))?;
        if let Ok(policy_text) = tokio::fs::read_to_string(&policy_path).await {
            let result = self.digitalize_policy(&policy_text, SourceType::Text, false).await?;
            return Ok(result.policy);
        }

        Err(PipelineError::Repository(RepositoryError::NotFound {
            reason: format!("no policy found for {payer_name}/{medication_name}"),
        }))
    }

    /// Loads the text companion of a PDF source for Pass 2, falling back to
    /// a placeholder when it's outside the policies root or missing —
    /// matching the original's degrade-gracefully behavior for a
    /// validation pass that can proceed on extraction alone.
    pub async fn load_policy_text_for_pdf(&self, pdf_path: &str) -> String {
        let text_path = PathBuf::from(pdf_path).with_extension("txt");
        let Some(file_name) = text_path.file_name().and_then(|n| n.to_str()) else {
            return placeholder_text();
        };
        let Ok(confined) = confine(&self.config.policies_root, file_name) else {
            tracing::warn!(path = %pdf_path, "PDF companion text path outside policies dir");
            return placeholder_text();
        };
        tokio::fs::read_to_string(&confined).await.unwrap_or_else(|_| placeholder_text())
    }
}

fn placeholder_text() -> String {
    "[Original policy text not available — validation based on extraction only]".to_string()
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::{AtomicCriterion, CriterionType};
    use pa_reference::ExtractedPolicyDraft;
    use pa_repository::InMemoryPolicyRepository;

    struct StubExtractor {
        empty: bool,
    }

    impl ExtractionModel for StubExtractor {
        async fn extract(&self, _policy_text: &str) -> crate::traits::RawExtractionResult {
            let mut draft = ExtractedPolicyDraft::default();
            draft.payer_name = "Acme Health".to_string();
            draft.medication_name = "Humira".to_string();
            if !self.empty {
                draft
                    .atomic_criteria
                    .insert("AGE".to_string(), AtomicCriterion::new("AGE", CriterionType::Age, "demographics"));
            }
            crate::traits::RawExtractionResult {
                draft,
                source_hash: "abc123".to_string(),
                source_type: SourceType::Text,
                extraction_model: "stub".to_string(),
                extraction_timestamp: "2026-01-01T00:00:00Z".to_string(),
            }
        }
    }

    struct StubValidator;

    impl ValidationModel for StubValidator {
        async fn validate(&self, draft: &ExtractedPolicyDraft, _policy_text: &str) -> crate::traits::ValidatedExtractionResult {
            crate::traits::ValidatedExtractionResult {
                draft: draft.clone(),
                validation_status: "validated".to_string(),
                quality_score: 0.9,
                corrections_applied: Vec::new(),
            }
        }
    }

    fn make_pipeline(empty: bool) -> PolicyDigitalizationPipeline<StubExtractor, StubValidator, InMemoryPolicyRepository> {
        PolicyDigitalizationPipeline::new(StubExtractor { empty }, StubValidator, InMemoryPolicyRepository::new(), PipelineConfig::default())
    }

    struct SlowExtractor;

    impl ExtractionModel for SlowExtractor {
        async fn extract(&self, _policy_text: &str) -> crate::traits::RawExtractionResult {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            unreachable!("extraction model outlives the configured timeout in this test");
        }
    }

    struct SlowValidator;

    impl ValidationModel for SlowValidator {
        async fn validate(&self, draft: &ExtractedPolicyDraft, _policy_text: &str) -> crate::traits::ValidatedExtractionResult {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            crate::traits::ValidatedExtractionResult {
                draft: draft.clone(),
                validation_status: "validated".to_string(),
                quality_score: 0.9,
                corrections_applied: Vec::new(),
            }
        }
    }

    fn short_timeout_config() -> PipelineConfig {
        PipelineConfig { model_timeout_secs: 1, ..PipelineConfig::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn pass_one_timeout_is_fatal_and_stores_nothing() {
        let pipeline = PolicyDigitalizationPipeline::new(SlowExtractor, StubValidator, InMemoryPolicyRepository::new(), short_timeout_config());
        let result = pipeline.digitalize_policy("some policy text", SourceType::Text, false).await;
        assert!(matches!(result, Err(PipelineError::Timeout { stage, timeout_secs: 1 }) if stage == "extract"));
    }

    #[tokio::test(start_paused = true)]
    async fn pass_two_timeout_degrades_to_quality_floor_instead_of_failing() {
        let pipeline = PolicyDigitalizationPipeline::new(StubExtractor { empty: false }, SlowValidator, InMemoryPolicyRepository::new(), short_timeout_config());
        let result = pipeline.digitalize_policy("some policy text", SourceType::Text, false).await.unwrap();
        assert_eq!(result.validation_status, "timeout");
        assert_eq!(result.quality_score, pipeline_config_floor());
        assert_eq!(result.passes_completed, 3);
        assert!(result.stored);
    }

    fn pipeline_config_floor() -> f64 {
        PipelineConfig::default().validation_quality_floor
    }

    #[tokio::test]
    async fn full_pipeline_stores_and_returns_the_policy() {
        let pipeline = make_pipeline(false);
        let result = pipeline.digitalize_policy("some policy text", SourceType::Text, false).await.unwrap();
        assert_eq!(result.passes_completed, 3);
        assert_eq!(result.criteria_count, 1);
        assert!(result.stored);
    }

    #[tokio::test]
    async fn skip_validation_stops_at_pass_one_count_but_still_runs_pass_three() {
        let pipeline = make_pipeline(false);
        let result = pipeline.digitalize_policy("some policy text", SourceType::Text, true).await.unwrap();
        assert_eq!(result.validation_status, "skipped");
        assert_eq!(result.quality_score, 0.7);
    }

    #[tokio::test]
    async fn empty_extraction_is_rejected_before_validation() {
        let pipeline = make_pipeline(true);
        let result = pipeline.digitalize_policy("some policy text", SourceType::Text, false).await;
        assert!(matches!(result, Err(PipelineError::Extraction { .. })));
    }

    #[tokio::test]
    async fn get_or_digitalize_returns_cached_policy_on_hit() {
        let pipeline = make_pipeline(false);
        pipeline.digitalize_policy("some policy text", SourceType::Text, false).await.unwrap();

        let policy = pipeline.get_or_digitalize("Acme Health", "Humira").await.unwrap();
        assert_eq!(policy.payer_name, "Acme Health");
    }

    #[tokio::test]
    async fn get_or_digitalize_rejects_unsafe_keys() {
        let pipeline = make_pipeline(false);
        let result = pipeline.get_or_digitalize("Acme/../../etc", "Humira").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn get_or_digitalize_errors_when_nothing_is_found() {
        let pipeline = make_pipeline(false);
        let result = pipeline.get_or_digitalize("Nonexistent Payer", "Nonexistent Drug").await;
        assert!(matches!(result, Err(PipelineError::Repository(RepositoryError::NotFound { .. }))));
    }
}
