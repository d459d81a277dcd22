use chrono::NaiveDate;
use pa_contracts::{
    NormalizedBiomarker, NormalizedFunctionalScore, NormalizedImagingResult, NormalizedLabResult,
    NormalizedPatientData, NormalizedScreening, NormalizedTreatment,
};
use serde_json::Value;

use crate::clock::Clock;
use crate::error::NormalizeError;

/// Normalizes an arbitrary raw patient document into the flat evaluator
/// input shape. Never fails for missing fields — every field is simply left
/// unset. Fails only when the root of the document is not a JSON object,
/// since there is nothing sensible to extract from it.
pub fn normalize_patient_data(
    raw: &Value,
    clock: &dyn Clock,
) -> Result<NormalizedPatientData, NormalizeError> {
    let root = raw.as_object().ok_or(NormalizeError::NotAMapping)?;

    let mut result = NormalizedPatientData::default();

    result.patient_id = str_field(root, "patient_id");

    // Demographics
    let demographics = get_obj(root, "demographics");
    if let Some(dob) = demographics.as_ref().and_then(|d| str_field(d, "date_of_birth")) {
        result.age_years = calculate_age(&dob, clock);
    } else if let Some(age) = demographics.as_ref().and_then(|d| d.get("age")).and_then(Value::as_i64) {
        result.age_years = Some(age);
    }
    result.gender = demographics
        .as_ref()
        .and_then(|d| str_field(d, "gender"))
        .map(|g| g.to_lowercase())
        .filter(|g| !g.is_empty());

    // Diagnoses
    if let Some(diagnoses) = root.get("diagnoses").and_then(Value::as_array) {
        for dx in diagnoses {
            if let Some(code) = dx.as_object().and_then(|d| str_field(d, "icd10_code")) {
                result.diagnosis_codes.push(code);
            }
        }
    }

    // Disease severity / functional scores
    let disease_activity = get_obj(root, "disease_activity");
    result.disease_severity = disease_activity
        .as_ref()
        .and_then(|d| str_field(d, "disease_severity"));

    // Prior treatments
    if let Some(txs) = root.get("prior_treatments").and_then(Value::as_array) {
        for tx in txs {
            let Some(tx) = tx.as_object() else { continue };
            result.prior_treatments.push(NormalizedTreatment {
                medication_name: str_field(tx, "medication_name").unwrap_or_default(),
                drug_class: str_field(tx, "drug_class"),
                duration_weeks: tx.get("duration_weeks").and_then(Value::as_u64).map(|v| v as u32),
                outcome: Some(normalize_outcome(&str_field(tx, "outcome").unwrap_or_default())),
                adequate_trial: tx.get("adequate_trial").and_then(Value::as_bool).unwrap_or(false),
            });
        }
    }

    // Lab results — flatten all panels
    if let Some(lab_data) = get_obj(root, "laboratory_results") {
        let collection_date = str_field(&lab_data, "collection_date");
        if let Some(panels) = lab_data.get("panels").and_then(Value::as_object) {
            for panel in panels.values() {
                let Some(panel) = panel.as_object() else { continue };
                if let Some(results) = panel.get("results").and_then(Value::as_array) {
                    for lab in results {
                        let Some(lab) = lab.as_object() else { continue };
                        let value = lab.get("value").and_then(value_as_f64);
                        result.lab_results.push(NormalizedLabResult {
                            test_name: str_field(lab, "test").unwrap_or_default(),
                            loinc_code: None,
                            value,
                            unit: str_field(lab, "unit"),
                            date: collection_date.clone(),
                            flag: str_field(lab, "flag"),
                        });
                    }
                }
            }
        }
    }

    // Safety screenings
    if let Some(screening_data) = get_obj(root, "pre_biologic_screening") {
        if let Some(tb) = get_obj(&screening_data, "tuberculosis_screening") {
            result.completed_screenings.push(NormalizedScreening {
                screening_type: "tb".to_string(),
                completed: str_field(&tb, "status")
                    .map(|s| s.to_uppercase() == "COMPLETE")
                    .unwrap_or(false),
                result_negative: str_field(&tb, "result").map(|s| s.to_lowercase() == "negative"),
                date: None,
            });
        }
        if let Some(hep_b) = get_obj(&screening_data, "hepatitis_b_screening") {
            result.completed_screenings.push(NormalizedScreening {
                screening_type: "hepatitis_b".to_string(),
                completed: str_field(&hep_b, "status")
                    .map(|s| s.to_uppercase() == "COMPLETE")
                    .unwrap_or(false),
                result_negative: hep_b.get("cleared_for_biologic").and_then(Value::as_bool),
                date: None,
            });
        }
        if let Some(hep_c) = get_obj(&screening_data, "hepatitis_c_screening") {
            result.completed_screenings.push(NormalizedScreening {
                screening_type: "hepatitis_c".to_string(),
                completed: str_field(&hep_c, "status")
                    .map(|s| s.to_uppercase() == "COMPLETE")
                    .unwrap_or(false),
                result_negative: str_field(&hep_c, "result").map(|s| {
                    let s = s.to_lowercase();
                    s == "non-reactive" || s == "negative"
                }),
                date: None,
            });
        }
    }

    // Prescriber
    if let Some(prescriber) = get_obj(root, "prescriber") {
        result.prescriber_specialty = str_field(&prescriber, "specialty");
        result.prescriber_npi = str_field(&prescriber, "npi");
    }

    // Functional scores (disease activity)
    if let Some(da) = &disease_activity {
        if let Some(cdai) = da.get("cdai_score").and_then(value_as_f64) {
            result.functional_scores.push(NormalizedFunctionalScore {
                score_type: "CDAI".to_string(),
                score_value: Some(cdai),
                interpretation: str_field(da, "cdai_interpretation"),
            });
        }
    }

    // Imaging / procedures
    if let Some(procedures) = get_obj(root, "procedures") {
        if let Some(colonoscopy) = get_obj(&procedures, "colonoscopy") {
            let endo_score = get_obj(&colonoscopy, "endoscopic_score");
            result.imaging_results.push(NormalizedImagingResult {
                modality: "colonoscopy".to_string(),
                date: str_field(&colonoscopy, "procedure_date"),
                findings_summary: str_field(&colonoscopy, "impression"),
                score_type: endo_score.as_ref().and_then(|e| str_field(e, "score_type")),
                score_value: endo_score.as_ref().and_then(|e| e.get("score_value")).and_then(value_as_f64),
            });
        }
    }

    // Site of care
    if let Some(med_request) = get_obj(root, "medication_request") {
        result.site_of_care = str_field(&med_request, "site_of_care");
    }

    // Biomarkers / genetic tests / program enrollments are cross-therapeutic
    // extensions with no fixed raw-document shape in the source system;
    // they pass through only when present as already-normalized arrays,
    // allowing callers (e.g. pa-scenarios fixtures) to supply them directly.
    if let Some(biomarkers) = root.get("biomarkers").and_then(Value::as_array) {
        for b in biomarkers {
            if let Ok(parsed) = serde_json::from_value::<NormalizedBiomarker>(b.clone()) {
                result.biomarkers.push(parsed);
            }
        }
    }
    if let Some(enrollments) = root.get("program_enrollments").and_then(Value::as_array) {
        result.program_enrollments = enrollments
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    Ok(result)
}

fn get_obj(map: &serde_json::Map<String, Value>, key: &str) -> Option<serde_json::Map<String, Value>> {
    map.get(key).and_then(Value::as_object).cloned()
}

fn str_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// Integer-floor years between a date-of-birth string (`YYYY-MM-DD`) and the
/// clock's current date. Returns `None` for unparseable dates rather than
/// defaulting to zero.
fn calculate_age(dob_str: &str, clock: &dyn Clock) -> Option<i64> {
    let dob = NaiveDate::parse_from_str(dob_str, "%Y-%m-%d").ok()?;
    let today = clock.today();
    today.years_since(dob).map(|years| years as i64)
}

/// Normalizes treatment outcome strings to the controlled vocabulary.
/// Preserves granular outcome types since the evaluator checks them
/// explicitly; only spelling/formatting variants are collapsed.
pub fn normalize_outcome(raw_outcome: &str) -> String {
    let normalized = raw_outcome.to_lowercase();
    let normalized = normalized.trim();
    match normalized {
        "failed" | "failure" => "failed",
        "inadequate_response" | "inadequate response" => "inadequate_response",
        "partial_response" | "partial response" => "partial_response",
        "intolerant" | "intolerance" => "intolerant",
        "contraindicated" | "contraindication" => "contraindicated",
        "steroid_dependent" | "steroid-dependent" | "steroid dependent" => "steroid_dependent",
        other => return other.to_string(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2026, 7, 27).unwrap())
    }

    #[test]
    fn rejects_non_object_root() {
        let err = normalize_patient_data(&json!([1, 2, 3]), &clock()).unwrap_err();
        assert!(matches!(err, NormalizeError::NotAMapping));
    }

    #[test]
    fn missing_fields_stay_unset_not_defaulted() {
        let normalized = normalize_patient_data(&json!({}), &clock()).unwrap();
        assert_eq!(normalized.age_years, None);
        assert_eq!(normalized.gender, None);
        assert!(normalized.diagnosis_codes.is_empty());
    }

    #[test]
    fn age_from_date_of_birth() {
        let raw = json!({
            "demographics": { "date_of_birth": "1987-01-01" }
        });
        let normalized = normalize_patient_data(&raw, &clock()).unwrap();
        assert_eq!(normalized.age_years, Some(39));
    }

    #[test]
    fn age_from_explicit_field_when_no_dob() {
        let raw = json!({ "demographics": { "age": 42 } });
        let normalized = normalize_patient_data(&raw, &clock()).unwrap();
        assert_eq!(normalized.age_years, Some(42));
    }

    #[test]
    fn outcome_variants_normalize_to_controlled_vocabulary() {
        assert_eq!(normalize_outcome("Steroid-Dependent"), "steroid_dependent");
        assert_eq!(normalize_outcome("Failure"), "failed");
        assert_eq!(normalize_outcome("something_else"), "something_else");
    }

    #[test]
    fn lab_panels_are_flattened_with_numeric_coercion() {
        let raw = json!({
            "laboratory_results": {
                "collection_date": "2026-01-01",
                "panels": {
                    "cbc": {
                        "results": [
                            { "test": "WBC", "value": "7.2", "unit": "k/uL", "flag": null }
                        ]
                    }
                }
            }
        });
        let normalized = normalize_patient_data(&raw, &clock()).unwrap();
        assert_eq!(normalized.lab_results.len(), 1);
        assert_eq!(normalized.lab_results[0].value, Some(7.2));
        assert_eq!(normalized.lab_results[0].date.as_deref(), Some("2026-01-01"));
    }

    #[test]
    fn tb_screening_negative_and_complete() {
        let raw = json!({
            "pre_biologic_screening": {
                "tuberculosis_screening": { "status": "complete", "result": "Negative" }
            }
        });
        let normalized = normalize_patient_data(&raw, &clock()).unwrap();
        let tb = &normalized.completed_screenings[0];
        assert_eq!(tb.screening_type, "tb");
        assert!(tb.completed);
        assert_eq!(tb.result_negative, Some(true));
    }

    #[test]
    fn completed_screening_without_result_stays_unset_not_false() {
        let raw = json!({
            "pre_biologic_screening": {
                "tuberculosis_screening": { "status": "complete" }
            }
        });
        let normalized = normalize_patient_data(&raw, &clock()).unwrap();
        let tb = &normalized.completed_screenings[0];
        assert!(tb.completed);
        assert_eq!(tb.result_negative, None);
    }
}
