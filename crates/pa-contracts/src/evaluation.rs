use serde::{Deserialize, Serialize};

use crate::criterion::LogicalOperator;
use crate::verdict::Verdict;

/// The result of evaluating one `AtomicCriterion` against one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionEvaluation {
    pub criterion_id: String,
    pub criterion_name: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub reasoning: String,
    pub is_required: bool,
}

impl CriterionEvaluation {
    /// Builds an evaluation with full confidence and no evidence; the common
    /// case for every criterion evaluator in `pa_core`.
    pub fn new(
        criterion_id: impl Into<String>,
        criterion_name: impl Into<String>,
        verdict: Verdict,
        reasoning: impl Into<String>,
        is_required: bool,
    ) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            criterion_name: criterion_name.into(),
            verdict,
            confidence: 1.0,
            evidence: Vec::new(),
            reasoning: reasoning.into(),
            is_required,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }
}

/// The result of recursively combining a `CriterionGroup`'s children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvaluation {
    pub group_id: String,
    pub operator: LogicalOperator,
    pub verdict: Verdict,
    pub reasoning: String,
    pub criteria_results: Vec<CriterionEvaluation>,
    pub subgroup_results: Vec<GroupEvaluation>,
}

/// Result of evaluating one `StepTherapyRequirement`. One of these is
/// produced per requirement in a policy's `step_therapy_requirements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyRequirementEvaluation {
    pub requirement_id: String,
    pub indication: String,
    pub minimum_trials: u32,
    pub drugs_tried: u32,
    pub drugs_failed: u32,
    pub satisfied: bool,
    pub reasoning: String,
}

/// Aggregate result of evaluating all of a policy's step-therapy
/// requirements against a patient: `satisfied` is true only when every
/// requirement is individually satisfied (or there are none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyEvaluation {
    pub required: bool,
    pub satisfied: bool,
    pub requirements: Vec<StepTherapyRequirementEvaluation>,
}

/// The result of evaluating one `IndicationCriteria`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationEvaluation {
    pub indication_id: String,
    pub indication_name: String,
    pub overall_verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_criteria_result: Option<GroupEvaluation>,
    pub criteria_met_count: u32,
    pub criteria_total_count: u32,
    pub unmet_criteria: Vec<CriterionEvaluation>,
    pub insufficient_criteria: Vec<CriterionEvaluation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    InsufficientData,
    NotMet,
}

/// A single actionable deficiency surfaced to the caller: either data that
/// needs to be gathered, or a requirement that is not currently satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub criterion_id: String,
    pub criterion_name: String,
    pub indication: String,
    pub gap_type: GapType,
    pub action: String,
}

/// Top-level result of evaluating a whole policy against one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    pub policy_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    pub indication_evaluations: Vec<IndicationEvaluation>,
    /// One entry per exclusion trigger criterion, regardless of verdict —
    /// the caller inspects `verdict == Met` to know which exclusions fired.
    /// Reuses `CriterionEvaluation` directly rather than a dedicated
    /// exclusion-result type, since nothing beyond the trigger criterion's
    /// own evaluation is ever attached to it.
    pub exclusion_evaluations: Vec<CriterionEvaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_therapy_evaluation: Option<StepTherapyEvaluation>,
    pub overall_readiness: f64,
    pub overall_verdict: Verdict,
    pub gaps: Vec<Gap>,
}
