//! Shared data types for the policy digitalization and evaluation core.
//!
//! This crate holds plain data only — no evaluation, pipeline, or storage
//! logic lives here. Downstream crates (`pa-core`, `pa-pipeline`,
//! `pa-repository`, `pa-diff`, `pa-impact`) depend on these shapes so that a
//! `DigitizedPolicy` or `NormalizedPatientData` means exactly one thing
//! across the whole workspace.

pub mod code;
pub mod criterion;
pub mod evaluation;
pub mod patient;
pub mod policy;
pub mod verdict;

pub use code::ClinicalCode;
pub use criterion::{
    AtomicCriterion, ComparisonOperator, CriterionGroup, CriterionType, ExtractionConfidence,
    LogicalOperator, Provenance,
};
pub use evaluation::{
    CriterionEvaluation, Gap, GapType, GroupEvaluation, IndicationEvaluation,
    PolicyEvaluationResult, StepTherapyEvaluation, StepTherapyRequirementEvaluation,
};
pub use patient::{
    NormalizedBiomarker, NormalizedFunctionalScore, NormalizedGeneticTest, NormalizedImagingResult,
    NormalizedLabResult, NormalizedPatientData, NormalizedScreening, NormalizedTreatment,
};
pub use policy::{DigitizedPolicy, Exclusion, IndicationCriteria, StepTherapyRequirement};
pub use verdict::Verdict;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_serde_round_trips_to_snake_case() {
        let v = Verdict::InsufficientData;
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"insufficient_data\"");
        let back: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn logical_operator_serde_uses_uppercase_tokens() {
        let json = serde_json::to_string(&LogicalOperator::And).unwrap();
        assert_eq!(json, "\"AND\"");
    }

    #[test]
    fn digitized_policy_defaults_version_to_latest() {
        let policy = DigitizedPolicy::new("p1", "Acme", "Humira");
        assert_eq!(policy.version, "latest");
        assert!(policy.atomic_criteria.is_empty());
    }
}
