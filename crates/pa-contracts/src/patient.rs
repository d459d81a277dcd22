use serde::{Deserialize, Serialize};

/// A prior treatment record, normalized to the controlled outcome
/// vocabulary (see `pa_core::normalize`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTreatment {
    pub medication_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default)]
    pub adequate_trial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLabResult {
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loinc_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScreening {
    pub screening_type: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_negative: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBiomarker {
    pub biomarker_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFunctionalScore {
    pub score_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedImagingResult {
    pub modality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedGeneticTest {
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathogenic: Option<bool>,
}

/// Flat, evaluator-friendly patient data. No free text. Built by
/// `pa_core::normalize::normalize_patient_data` from an arbitrary raw
/// document; every field is optional because normalization never
/// fabricates data for fields the source did not provide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPatientData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_years: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease_severity: Option<String>,

    #[serde(default)]
    pub prior_treatments: Vec<NormalizedTreatment>,

    #[serde(default)]
    pub lab_results: Vec<NormalizedLabResult>,

    #[serde(default)]
    pub completed_screenings: Vec<NormalizedScreening>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescriber_npi: Option<String>,

    #[serde(default)]
    pub biomarkers: Vec<NormalizedBiomarker>,
    #[serde(default)]
    pub functional_scores: Vec<NormalizedFunctionalScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging: Option<serde_json::Value>,
    #[serde(default)]
    pub imaging_results: Vec<NormalizedImagingResult>,
    #[serde(default)]
    pub genetic_tests: Vec<NormalizedGeneticTest>,
    #[serde(default)]
    pub program_enrollments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_of_care: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_formulary_tier: Option<i64>,
}
