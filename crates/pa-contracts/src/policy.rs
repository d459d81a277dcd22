use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::criterion::{AtomicCriterion, CriterionGroup, Provenance};

/// A covered condition with its own approval-criteria group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationCriteria {
    pub indication_id: String,
    pub indication_name: String,
    #[serde(default)]
    pub indication_codes: Vec<String>,
    pub initial_approval_criteria: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_approval_duration_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_duration_months: Option<u32>,
    #[serde(default)]
    pub dosing_requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_years: Option<u32>,
}

/// A requirement that prior alternative drugs or drug classes have been
/// tried and failed before the requested medication is approvable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTherapyRequirement {
    pub requirement_id: String,
    pub indication: String,
    #[serde(default)]
    pub required_drugs: Vec<String>,
    #[serde(default)]
    pub required_drug_classes: Vec<String>,
    pub minimum_trials: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_duration_days: Option<u32>,
    #[serde(default = "default_true")]
    pub failure_required: bool,
    #[serde(default)]
    pub intolerance_acceptable: bool,
    #[serde(default)]
    pub contraindication_acceptable: bool,
}

fn default_true() -> bool {
    true
}

/// A condition that, if its trigger criterion evaluates `Met`, disqualifies
/// the patient regardless of other criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub exclusion_id: String,
    pub trigger_criteria: Vec<String>,
}

/// The aggregate root: a fully digitized, versioned payer policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitizedPolicy {
    pub policy_id: String,
    #[serde(default)]
    pub policy_number: String,
    #[serde(default)]
    pub policy_title: String,
    pub payer_name: String,
    pub medication_name: String,
    #[serde(default)]
    pub medication_brand_names: Vec<String>,
    #[serde(default)]
    pub medication_generic_names: Vec<String>,
    #[serde(default)]
    pub medication_codes: Vec<crate::code::ClinicalCode>,
    #[serde(default)]
    pub effective_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_revision_date: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,

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
    #[serde(default)]
    pub provenances: BTreeMap<String, Provenance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_quality: Option<String>,
}

fn default_version() -> String {
    "latest".to_string()
}

impl DigitizedPolicy {
    pub fn new(policy_id: impl Into<String>, payer_name: impl Into<String>, medication_name: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            policy_number: String::new(),
            policy_title: String::new(),
            payer_name: payer_name.into(),
            medication_name: medication_name.into(),
            medication_brand_names: Vec::new(),
            medication_generic_names: Vec::new(),
            medication_codes: Vec::new(),
            effective_date: String::new(),
            last_revision_date: None,
            version: default_version(),
            atomic_criteria: BTreeMap::new(),
            criterion_groups: BTreeMap::new(),
            indications: Vec::new(),
            exclusions: Vec::new(),
            step_therapy_requirements: Vec::new(),
            provenances: BTreeMap::new(),
            extraction_timestamp: None,
            extraction_model: None,
            source_document_hash: None,
            extraction_quality: None,
        }
    }

    /// Canonical JSON used for both content hashing and round-trip equality
    /// tests — `BTreeMap` already guarantees key-sorted serialization, so no
    /// separate canonicalization pass is needed beyond `serde_json`'s normal
    /// object-field order (struct declaration order) and map order (sorted).
    pub fn canonical_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("DigitizedPolicy always serializes")
    }

    pub fn get_criterion(&self, criterion_id: &str) -> Option<&AtomicCriterion> {
        self.atomic_criteria.get(criterion_id)
    }

    pub fn get_group(&self, group_id: &str) -> Option<&CriterionGroup> {
        self.criterion_groups.get(group_id)
    }
}
