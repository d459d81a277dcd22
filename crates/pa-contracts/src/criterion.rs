use serde::{Deserialize, Serialize};

use crate::code::ClinicalCode;

/// The stable set of criterion kinds the registry in `pa-core` dispatches
/// on. Adding a new variant is a breaking schema change (external interface
/// contract) — this enum is intentionally not `#[non_exhaustive]` so that
/// adding a variant is a compile-time break for every `match` over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    Age,
    Gender,
    DiagnosisConfirmed,
    DiagnosisSeverity,
    PriorTreatmentTried,
    PriorTreatmentFailed,
    PriorTreatmentIntolerant,
    PriorTreatmentContraindicated,
    PriorTreatmentDuration,
    LabValue,
    LabTestCompleted,
    SafetyScreeningCompleted,
    SafetyScreeningNegative,
    PrescriberSpecialty,
    PrescriberConsultation,
    DocumentationPresent,
    ClinicalMarkerPresent,
    DiseaseDuration,
    ConcurrentTherapy,
    NoConcurrentTherapy,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Gte,
    Gt,
    Lt,
    Lte,
    Eq,
    Neq,
    Between,
    In,
    NotIn,
}

impl Default for ComparisonOperator {
    fn default() -> Self {
        ComparisonOperator::Gte
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionConfidence {
    High,
    Medium,
    Low,
}

/// Links a criterion back to the source policy text it was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub policy_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub confidence: ExtractionConfidence,
    pub validated: bool,
}

/// An indivisible policy requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicCriterion {
    pub criterion_id: String,
    pub criterion_type: CriterionType,
    pub name: String,
    pub description: String,
    pub policy_text: String,

    #[serde(default)]
    pub clinical_codes: Vec<ClinicalCode>,

    #[serde(default = "ComparisonOperator::default")]
    pub comparison_operator: ComparisonOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_value_upper: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_unit: Option<String>,

    #[serde(default)]
    pub allowed_values: Vec<String>,

    #[serde(default)]
    pub drug_names: Vec<String>,
    #[serde(default)]
    pub drug_classes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_duration_days: Option<u32>,

    #[serde(default)]
    pub is_required: bool,

    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_confidence: Option<ExtractionConfidence>,
    #[serde(default)]
    pub codes_validated: bool,
}

impl AtomicCriterion {
    /// Minimal builder used throughout tests and fixtures; defaults every
    /// optional field, matching the Python source's keyword-argument
    /// construction style.
    pub fn new(
        criterion_id: impl Into<String>,
        criterion_type: CriterionType,
        category: impl Into<String>,
    ) -> Self {
        Self {
            criterion_id: criterion_id.into(),
            criterion_type,
            name: String::new(),
            description: String::new(),
            policy_text: String::new(),
            clinical_codes: Vec::new(),
            comparison_operator: ComparisonOperator::default(),
            threshold_value: None,
            threshold_value_upper: None,
            threshold_unit: None,
            allowed_values: Vec::new(),
            drug_names: Vec::new(),
            drug_classes: Vec::new(),
            minimum_duration_days: None,
            is_required: false,
            category: category.into(),
            extraction_confidence: None,
            codes_validated: false,
        }
    }
}

/// A logical composition node over atomic criteria and/or sub-groups.
///
/// Groups and criteria form a DAG rooted at each indication's initial
/// approval group; see `pa_core::group` for the cycle-safe traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionGroup {
    pub group_id: String,
    pub name: String,
    pub operator: LogicalOperator,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[serde(default)]
    pub subgroups: Vec<String>,
    #[serde(default)]
    pub negated: bool,
}

impl CriterionGroup {
    pub fn new(group_id: impl Into<String>, name: impl Into<String>, operator: LogicalOperator) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            operator,
            criteria: Vec::new(),
            subgroups: Vec::new(),
            negated: false,
        }
    }
}
