use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pa_contracts::{
    AtomicCriterion, ClinicalCode, CriterionGroup, Exclusion, IndicationCriteria, StepTherapyRequirement,
};

/// The typed intermediate form threaded between pipeline passes, distinct
/// from `DigitizedPolicy`: it carries no `provenances`, no content hash, no
/// `version` label, and — unlike the final policy — nothing here guarantees
/// that a group's `criteria`/`subgroups` references actually resolve. That
/// guarantee only exists once [`crate::validator::ReferenceDataValidator`]
/// has built the final `DigitizedPolicy`.
///
/// Passes 1 and 2 both produce/consume this shape (Pass 2's corrections are
/// applied field-by-field against it); Pass 3 consumes it to build the
/// typed policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedPolicyDraft {
    #[serde(default)]
    pub policy_number: String,
    #[serde(default)]
    pub policy_title: String,
    #[serde(default)]
    pub payer_name: String,
    #[serde(default)]
    pub medication_name: String,
    #[serde(default)]
    pub medication_brand_names: Vec<String>,
    #[serde(default)]
    pub medication_generic_names: Vec<String>,
    #[serde(default)]
    pub medication_codes: Vec<ClinicalCode>,
    #[serde(default)]
    pub effective_date: String,
    #[serde(default)]
    pub last_revision_date: Option<String>,

    #[serde(default)]
    pub atomic_criteria: BTreeMap<String, AtomicCriterion>,
    #[serde(default)]
    pub criterion_groups: BTreeMap<String, CriterionGroup>,
    #[serde(default)]
    pub indications: Vec<IndicationCriteria>,
    #[serde(default)]
    pub exclusions: Vec<Exclusion>,
    #[serde(default)]
    pub step_therapy_requirements: Vec<StepTherapyRequirement>,
}

impl ExtractedPolicyDraft {
    /// True when Pass 1 produced nothing usable — the empty-extraction guard
    /// in `pa-pipeline` checks this before Pass 2 ever runs.
    pub fn is_empty_extraction(&self) -> bool {
        self.atomic_criteria.is_empty() && self.indications.is_empty()
    }

    /// Applies one correction from Pass 2 to the named criterion's field.
    /// Unknown `criterion_id`s or field names are silently ignored — a
    /// correction that cannot be applied is not a fatal error (§7: Pass 2
    /// failures degrade quality, they never abort the pipeline).
    pub fn apply_correction(&mut self, criterion_id: &str, field: &str, corrected_value: &serde_json::Value) {
        let Some(criterion) = self.atomic_criteria.get_mut(criterion_id) else { return };
        match field {
            "name" => {
                if let Some(v) = corrected_value.as_str() {
                    criterion.name = v.to_string();
                }
            }
            "description" => {
                if let Some(v) = corrected_value.as_str() {
                    criterion.description = v.to_string();
                }
            }
            "policy_text" => {
                if let Some(v) = corrected_value.as_str() {
                    criterion.policy_text = v.to_string();
                }
            }
            "threshold_value" => {
                criterion.threshold_value = corrected_value.as_f64();
            }
            "threshold_value_upper" => {
                criterion.threshold_value_upper = corrected_value.as_f64();
            }
            "is_required" => {
                if let Some(v) = corrected_value.as_bool() {
                    criterion.is_required = v;
                }
            }
            "category" => {
                if let Some(v) = corrected_value.as_str() {
                    criterion.category = v.to_string();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::CriterionType;

    #[test]
    fn empty_draft_is_empty_extraction() {
        assert!(ExtractedPolicyDraft::default().is_empty_extraction());
    }

    #[test]
    fn draft_with_only_a_criterion_is_not_empty() {
        let mut draft = ExtractedPolicyDraft::default();
        draft
            .atomic_criteria
            .insert("a1".to_string(), AtomicCriterion::new("a1", CriterionType::Age, "demo"));
        assert!(!draft.is_empty_extraction());
    }

    #[test]
    fn correction_updates_named_field_only() {
        let mut draft = ExtractedPolicyDraft::default();
        draft
            .atomic_criteria
            .insert("a1".to_string(), AtomicCriterion::new("a1", CriterionType::Age, "demo"));
        draft.apply_correction("a1", "threshold_value", &serde_json::json!(21.0));
        assert_eq!(draft.atomic_criteria["a1"].threshold_value, Some(21.0));
    }

    #[test]
    fn correction_for_unknown_criterion_is_ignored() {
        let mut draft = ExtractedPolicyDraft::default();
        draft.apply_correction("nope", "threshold_value", &serde_json::json!(21.0));
        assert!(draft.atomic_criteria.is_empty());
    }
}
