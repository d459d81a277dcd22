use pa_contracts::Verdict;
use pa_diff::PolicyDiffResult;
use serde::{Deserialize, Serialize};

/// How a single active case's verdict is projected to change under the new
/// policy version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VerdictFlip,
    AtRisk,
    NoImpact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientImpact {
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    pub current_verdict: Verdict,
    pub projected_verdict: Verdict,
    pub verdict_changed: bool,
    #[serde(default)]
    pub affected_criteria: Vec<String>,
    pub risk_level: RiskLevel,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyImpactReport {
    pub diff: PolicyDiffResult,
    pub total_active_cases: usize,
    pub impacted_cases: usize,
    pub verdict_flips: usize,
    pub at_risk_cases: usize,
    pub patient_impacts: Vec<PatientImpact>,
    pub action_items: Vec<String>,
}
