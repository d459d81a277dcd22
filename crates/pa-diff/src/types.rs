use serde::{Deserialize, Serialize};

/// Kind of a single structural change between two policy versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// Impact grading of a change. `Breaking` narrows who can qualify,
/// `Material` is a substantive change whose direction is ambiguous or
/// expansive, `Minor` only loosens the policy or touches non-semantic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Material,
    Breaking,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::Minor => 0,
            Severity::Material => 1,
            Severity::Breaking => 2,
        }
    }

    /// Escalates to `other` only if it outranks `self`; never downgrades.
    pub fn escalate(self, other: Severity) -> Severity {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// One field-level difference inside a `Modified` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub field: String,
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

impl FieldDiff {
    pub fn new(field: impl Into<String>, old: impl Serialize, new: impl Serialize) -> Self {
        Self {
            field: field.into(),
            old: serde_json::to_value(old).unwrap_or(serde_json::Value::Null),
            new: serde_json::to_value(new).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionChange {
    pub criterion_id: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    #[serde(default)]
    pub field_diffs: Vec<FieldDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyChange {
    pub requirement_id: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    #[serde(default)]
    pub field_diffs: Vec<FieldDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionChange {
    pub exclusion_id: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    #[serde(default)]
    pub field_diffs: Vec<FieldDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationChange {
    pub indication_id: String,
    pub change_type: ChangeType,
    pub severity: Severity,
    #[serde(default)]
    pub field_diffs: Vec<FieldDiff>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityAssessment {
    HighImpact,
    MediumImpact,
    LowImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_criteria_old: usize,
    pub total_criteria_new: usize,
    pub added_count: usize,
    pub removed_count: usize,
    pub modified_count: usize,
    pub unchanged_count: usize,
    pub breaking_changes: usize,
    pub material_changes: usize,
    pub severity_assessment: SeverityAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDiffResult {
    pub criterion_changes: Vec<CriterionChange>,
    pub step_therapy_changes: Vec<StepTherapyChange>,
    pub exclusion_changes: Vec<ExclusionChange>,
    pub indication_changes: Vec<IndicationChange>,
    pub summary: DiffSummary,
}
