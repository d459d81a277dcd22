//! Individual criterion evaluators and the dispatch that selects among them.
//!
//! Every evaluator here is a pure function of `(criterion, patient)`. None
//! of them can fail: an evaluator that cannot determine a verdict from the
//! data it has returns `Verdict::InsufficientData` rather than an error, so
//! that missing documentation drives gap analysis instead of denial.

use pa_contracts::{AtomicCriterion, CriterionEvaluation, CriterionType, NormalizedPatientData, Verdict};

use crate::matching::{find_lab_result, find_matched_treatment, find_screening};
use crate::numeric::{compare_numeric, safe_float};

const FAILED_OUTCOMES: &[&str] = &["failed", "inadequate_response", "partial_response", "steroid_dependent"];

const SPECIALTY_KEYWORDS: &[&str] =
    &["gastroenterolog", "rheumatolog", "dermatolog", "neurolog", "oncolog"];

/// Dispatches a single criterion to its evaluator. Unlike the registry this
/// mirrors, there is no way to register an unknown `CriterionType` — the
/// enum is exhaustively matched, so every variant always has exactly one
/// evaluator at compile time.
pub fn evaluate_criterion(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    match criterion.criterion_type {
        CriterionType::Age => evaluate_age(criterion, patient),
        CriterionType::Gender => evaluate_gender(criterion, patient),
        CriterionType::DiagnosisConfirmed => evaluate_diagnosis_confirmed(criterion, patient),
        CriterionType::DiagnosisSeverity => evaluate_diagnosis_severity(criterion, patient),
        CriterionType::PriorTreatmentTried => evaluate_prior_treatment_tried(criterion, patient),
        CriterionType::PriorTreatmentFailed => evaluate_prior_treatment_failed(criterion, patient),
        CriterionType::PriorTreatmentIntolerant => evaluate_prior_treatment_intolerant(criterion, patient),
        CriterionType::PriorTreatmentContraindicated => evaluate_prior_treatment_contraindicated(criterion, patient),
        CriterionType::PriorTreatmentDuration => evaluate_prior_treatment_duration(criterion, patient),
        CriterionType::LabValue => evaluate_lab_value(criterion, patient),
        CriterionType::LabTestCompleted => evaluate_lab_test_completed(criterion, patient),
        CriterionType::SafetyScreeningCompleted => evaluate_safety_screening_completed(criterion, patient),
        CriterionType::SafetyScreeningNegative => evaluate_safety_screening_negative(criterion, patient),
        CriterionType::PrescriberSpecialty | CriterionType::PrescriberConsultation => {
            evaluate_prescriber_specialty(criterion, patient)
        }
        CriterionType::DocumentationPresent | CriterionType::ClinicalMarkerPresent => {
            manual_review_required(criterion, "Documentation presence requires manual verification")
        }
        CriterionType::DiseaseDuration => {
            manual_review_required(criterion, "Disease duration requires clinical notes review")
        }
        CriterionType::ConcurrentTherapy | CriterionType::NoConcurrentTherapy => {
            manual_review_required(criterion, "Concurrent therapy status requires clinical review")
        }
        CriterionType::Custom => manual_review_required(criterion, "Custom criterion requires manual evaluation"),
    }
}

fn insufficient(criterion: &AtomicCriterion, reasoning: impl Into<String>) -> CriterionEvaluation {
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        Verdict::InsufficientData,
        reasoning,
        criterion.is_required,
    )
}

fn manual_review_required(criterion: &AtomicCriterion, reasoning: &str) -> CriterionEvaluation {
    insufficient(criterion, reasoning)
}

fn evaluate_age(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    let Some(age) = patient.age_years else {
        return insufficient(criterion, "Patient age not available");
    };
    let Some(raw_threshold) = criterion.threshold_value else {
        return insufficient(criterion, "No threshold defined in criterion");
    };
    let Some(threshold) = safe_float(raw_threshold) else {
        return insufficient(criterion, format!("Non-numeric threshold value: {raw_threshold}"));
    };
    let met = compare_numeric(criterion.comparison_operator, age as f64, threshold, criterion.threshold_value_upper);
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::NotMet },
        format!(
            "Age {age} {} {:?} {threshold}",
            if met { "meets" } else { "does not meet" },
            criterion.comparison_operator
        ),
        criterion.is_required,
    )
    .with_evidence(vec![format!("Patient age: {age} years")])
}

fn evaluate_gender(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    let Some(gender) = patient.gender.as_deref().filter(|g| !g.is_empty()) else {
        return insufficient(criterion, "Patient gender not available");
    };
    let allowed: Vec<String> = criterion.allowed_values.iter().map(|v| v.to_lowercase()).collect();
    let met = allowed.is_empty() || allowed.iter().any(|v| v == &gender.to_lowercase());
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::NotMet },
        format!(
            "Gender '{gender}' {} in allowed values {allowed:?}",
            if met { "is" } else { "is not" }
        ),
        criterion.is_required,
    )
    .with_evidence(vec![format!("Patient gender: {gender}")])
}

fn evaluate_diagnosis_confirmed(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    if patient.diagnosis_codes.is_empty() {
        return insufficient(criterion, "No diagnosis codes available");
    }
    let criterion_codes: Vec<String> = criterion
        .clinical_codes
        .iter()
        .map(|c| c.code.to_uppercase().replace('.', ""))
        .collect();

    let mut matched = false;
    let mut evidence = Vec::new();
    if criterion_codes.is_empty() {
        matched = true;
        evidence.push(format!("Patient has diagnosis codes: {:?}", patient.diagnosis_codes));
    } else {
        for pc in &patient.diagnosis_codes {
            let pc_norm = pc.to_uppercase().replace('.', "");
            if criterion_codes
                .iter()
                .any(|cc| pc_norm == *cc || pc_norm.starts_with(cc.as_str()) || cc.starts_with(pc_norm.as_str()))
            {
                matched = true;
                evidence.push(format!("Diagnosis {pc} matches criterion code"));
            }
        }
    }

    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if matched { Verdict::Met } else { Verdict::NotMet },
        format!("Diagnosis {} against criterion codes", if matched { "confirmed" } else { "not confirmed" }),
        criterion.is_required,
    )
    .with_evidence(evidence)
}

fn evaluate_diagnosis_severity(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    let Some(severity) = patient.disease_severity.as_deref().filter(|s| !s.is_empty()) else {
        return insufficient(criterion, "Disease severity not documented");
    };
    let normalize = |s: &str| s.to_lowercase().replace('-', "_").replace(' ', "_");
    let severity_norm = normalize(severity);
    let allowed: Vec<String> = criterion.allowed_values.iter().map(|v| normalize(v)).collect();

    let met = if !allowed.is_empty() {
        allowed.iter().any(|a| a == &severity_norm)
    } else {
        let desc = criterion.description.to_lowercase();
        (desc.contains("moderate") && severity_norm.contains("moderate"))
            || (desc.contains("severe") && severity_norm.contains("severe"))
    };

    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::NotMet },
        format!("Severity '{severity}' {} criterion", if met { "matches" } else { "does not match" }),
        criterion.is_required,
    )
    .with_evidence(vec![format!("Disease severity: {severity}")])
}

fn evaluate_prior_treatment_tried(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return insufficient(criterion, "No prior treatment history available");
    }
    let matched = find_matched_treatment(criterion, &patient.prior_treatments).is_some();
    let names: Vec<&str> = patient.prior_treatments.iter().map(|t| t.medication_name.as_str()).collect();
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if matched { Verdict::Met } else { Verdict::NotMet },
        format!("Prior treatment {} matching criterion", if matched { "found" } else { "not found" }),
        criterion.is_required,
    )
    .with_evidence(vec![format!("Prior treatments: {names:?}")])
}

fn evaluate_prior_treatment_failed(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return insufficient(criterion, "No prior treatment history available");
    }
    let Some(tx) = find_matched_treatment(criterion, &patient.prior_treatments) else {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::NotMet,
            "No matching treatment found in history",
            criterion.is_required,
        );
    };
    let outcome = tx.outcome.as_deref().unwrap_or("");
    if FAILED_OUTCOMES.contains(&outcome) {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            format!("Treatment {} failed with outcome: {outcome}", tx.medication_name),
            criterion.is_required,
        )
        .with_evidence(vec![format!("{}: outcome={outcome}", tx.medication_name)]);
    }
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        Verdict::NotMet,
        "Treatment was tried but failure not documented",
        criterion.is_required,
    )
    .with_evidence(vec![format!("Treatment found but outcome not a failure: {outcome}")])
}

fn evaluate_prior_treatment_intolerant(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientData,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return insufficient(criterion, "No prior treatment history available");
    }
    let tx = find_matched_treatment(criterion, &patient.prior_treatments);
    if let Some(tx) = tx.filter(|t| t.outcome.as_deref() == Some("intolerant")) {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            format!("Patient was intolerant to {}", tx.medication_name),
            criterion.is_required,
        )
        .with_evidence(vec![format!("{}: intolerant", tx.medication_name)]);
    }
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        Verdict::NotMet,
        "Intolerance not documented for matched treatment",
        criterion.is_required,
    )
}

fn evaluate_prior_treatment_contraindicated(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientData,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return insufficient(criterion, "No prior treatment history available");
    }
    let tx = find_matched_treatment(criterion, &patient.prior_treatments);
    if let Some(tx) = tx.filter(|t| t.outcome.as_deref() == Some("contraindicated")) {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            format!("Contraindication documented for {}", tx.medication_name),
            criterion.is_required,
        )
        .with_evidence(vec![format!("{}: contraindicated", tx.medication_name)]);
    }
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        Verdict::NotMet,
        "Contraindication not documented for matched treatment",
        criterion.is_required,
    )
}

fn evaluate_prior_treatment_duration(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientData,
) -> CriterionEvaluation {
    if patient.prior_treatments.is_empty() {
        return insufficient(criterion, "No prior treatment history available");
    }
    let Some(tx) = find_matched_treatment(criterion, &patient.prior_treatments) else {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::NotMet,
            "No matching treatment found",
            criterion.is_required,
        );
    };
    let Some(duration_weeks) = tx.duration_weeks else {
        return insufficient(criterion, format!("Duration not documented for {}", tx.medication_name));
    };

    let threshold_days = criterion.threshold_value.and_then(safe_float).map(|v| v as i64);
    let min_days = criterion.minimum_duration_days.map(|d| d as i64).or(threshold_days);
    let Some(min_days) = min_days else {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            "No minimum duration specified; treatment documented",
            criterion.is_required,
        )
        .with_evidence(vec![format!("{}: {duration_weeks} weeks", tx.medication_name)]);
    };

    let min_weeks = min_days as f64 / 7.0;
    let met = (duration_weeks as f64) >= min_weeks;
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::NotMet },
        format!(
            "Duration {duration_weeks}w {} minimum {min_weeks:.0}w",
            if met { "meets" } else { "does not meet" }
        ),
        criterion.is_required,
    )
    .with_evidence(vec![format!(
        "{}: {duration_weeks} weeks (required: {min_weeks:.0} weeks)",
        tx.medication_name
    )])
}

fn evaluate_lab_value(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    if patient.lab_results.is_empty() {
        return insufficient(criterion, "No lab results available");
    }
    let Some(lab) = find_lab_result(criterion, &patient.lab_results).filter(|l| l.value.is_some()) else {
        return insufficient(criterion, format!("Lab result '{}' not found in patient data", criterion.name));
    };
    let value = lab.value.expect("filtered on Some above");
    let unit = lab.unit.as_deref().unwrap_or("");

    let Some(raw_threshold) = criterion.threshold_value else {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            "Lab present; no threshold to compare",
            criterion.is_required,
        )
        .with_evidence(vec![format!("{}: {value} {unit}", lab.test_name)]);
    };
    let Some(threshold) = safe_float(raw_threshold) else {
        return insufficient(criterion, format!("Non-numeric threshold value: {raw_threshold}"));
    };
    let met = compare_numeric(criterion.comparison_operator, value, threshold, criterion.threshold_value_upper);
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::NotMet },
        format!(
            "Lab {} = {value} {} threshold {:?} {threshold}",
            lab.test_name,
            if met { "meets" } else { "does not meet" },
            criterion.comparison_operator
        ),
        criterion.is_required,
    )
    .with_evidence(vec![format!("{}: {value} {unit}", lab.test_name)])
}

fn evaluate_lab_test_completed(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    if patient.lab_results.is_empty() {
        return insufficient(criterion, "No lab results available");
    }
    let lab = find_lab_result(criterion, &patient.lab_results);
    let met = lab.is_some();
    let evidence = match lab {
        Some(l) => format!("Lab {} found", l.test_name),
        None => format!("Lab '{}' not found", criterion.name),
    };
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::InsufficientData },
        format!("Lab test {}", if met { "completed" } else { "not found" }),
        criterion.is_required,
    )
    .with_evidence(vec![evidence])
}

fn evaluate_safety_screening_completed(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientData,
) -> CriterionEvaluation {
    if patient.completed_screenings.is_empty() {
        return insufficient(criterion, "No screening data available");
    }
    let screening = find_screening(criterion, &patient.completed_screenings);
    if let Some(s) = screening.filter(|s| s.completed) {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            format!("Safety screening {} completed", s.screening_type),
            criterion.is_required,
        )
        .with_evidence(vec![format!("Screening '{}' completed", s.screening_type)]);
    }
    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if screening.is_none() { Verdict::InsufficientData } else { Verdict::NotMet },
        format!("Screening {}", if screening.is_none() { "not found" } else { "not completed" }),
        criterion.is_required,
    )
}

fn evaluate_safety_screening_negative(
    criterion: &AtomicCriterion,
    patient: &NormalizedPatientData,
) -> CriterionEvaluation {
    if patient.completed_screenings.is_empty() {
        return insufficient(criterion, "No screening data available");
    }
    let screening = find_screening(criterion, &patient.completed_screenings);
    if let Some(s) = screening.filter(|s| s.completed && s.result_negative == Some(true)) {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::Met,
            format!("Safety screening {} negative", s.screening_type),
            criterion.is_required,
        )
        .with_evidence(vec![format!("Screening '{}' completed and negative", s.screening_type)]);
    }
    if let Some(s) = screening.filter(|s| s.completed && s.result_negative == Some(false)) {
        return CriterionEvaluation::new(
            &criterion.criterion_id,
            &criterion.name,
            Verdict::NotMet,
            format!("Safety screening {} not negative", s.screening_type),
            criterion.is_required,
        )
        .with_evidence(vec![format!("Screening '{}' positive/not negative", s.screening_type)]);
    }
    insufficient(criterion, "Screening result not available")
}

fn evaluate_prescriber_specialty(criterion: &AtomicCriterion, patient: &NormalizedPatientData) -> CriterionEvaluation {
    let Some(specialty) = patient.prescriber_specialty.as_deref().filter(|s| !s.is_empty()) else {
        return insufficient(criterion, "Prescriber specialty not available");
    };
    let allowed: Vec<String> = criterion.allowed_values.iter().map(|v| v.to_lowercase()).collect();
    let specialty_lower = specialty.to_lowercase();

    let met = if !allowed.is_empty() {
        allowed.iter().any(|v| v == &specialty_lower)
    } else {
        let desc = criterion.description.to_lowercase();
        let name = criterion.name.to_lowercase();
        SPECIALTY_KEYWORDS
            .iter()
            .any(|kw| (desc.contains(kw) || name.contains(kw)) && specialty_lower.contains(kw))
    };

    CriterionEvaluation::new(
        &criterion.criterion_id,
        &criterion.name,
        if met { Verdict::Met } else { Verdict::NotMet },
        format!("Specialty '{specialty}' {} requirement", if met { "matches" } else { "does not match" }),
        criterion.is_required,
    )
    .with_evidence(vec![format!("Prescriber specialty: {specialty}")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::{ClinicalCode, ComparisonOperator, NormalizedLabResult, NormalizedScreening, NormalizedTreatment};

    fn patient() -> NormalizedPatientData {
        NormalizedPatientData::default()
    }

    #[test]
    fn age_insufficient_without_patient_age() {
        let criterion = AtomicCriterion::new("c1", CriterionType::Age, "demographic");
        let result = evaluate_criterion(&criterion, &patient());
        assert_eq!(result.verdict, Verdict::InsufficientData);
    }

    #[test]
    fn age_met_above_threshold() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::Age, "demographic");
        criterion.threshold_value = Some(18.0);
        let mut p = patient();
        p.age_years = Some(25);
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::Met);
    }

    #[test]
    fn age_not_met_below_threshold() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::Age, "demographic");
        criterion.threshold_value = Some(18.0);
        let mut p = patient();
        p.age_years = Some(12);
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::NotMet);
    }

    #[test]
    fn diagnosis_confirmed_matches_icd10_prefix() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::DiagnosisConfirmed, "diagnosis");
        criterion.clinical_codes = vec![ClinicalCode::new("ICD10", "K50")];
        let mut p = patient();
        p.diagnosis_codes = vec!["K50.10".to_string()];
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::Met);
    }

    #[test]
    fn diagnosis_confirmed_insufficient_without_codes() {
        let criterion = AtomicCriterion::new("c1", CriterionType::DiagnosisConfirmed, "diagnosis");
        assert_eq!(evaluate_criterion(&criterion, &patient()).verdict, Verdict::InsufficientData);
    }

    #[test]
    fn prior_treatment_failed_met_when_outcome_failed() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::PriorTreatmentFailed, "step");
        criterion.drug_names = vec!["methotrexate".to_string()];
        let mut p = patient();
        p.prior_treatments = vec![NormalizedTreatment {
            medication_name: "Methotrexate".to_string(),
            outcome: Some("failed".to_string()),
            ..Default::default()
        }];
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::Met);
    }

    #[test]
    fn lab_value_compares_against_threshold() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::LabValue, "lab");
        criterion.name = "CRP".to_string();
        criterion.comparison_operator = ComparisonOperator::Gte;
        criterion.threshold_value = Some(5.0);
        let mut p = patient();
        p.lab_results = vec![NormalizedLabResult {
            test_name: "CRP".to_string(),
            value: Some(8.0),
            ..Default::default()
        }];
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::Met);
    }

    #[test]
    fn safety_screening_negative_requires_completed_and_negative() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::SafetyScreeningNegative, "safety");
        criterion.name = "TB screening".to_string();
        let mut p = patient();
        p.completed_screenings = vec![NormalizedScreening {
            screening_type: "tb".to_string(),
            completed: true,
            result_negative: Some(true),
            date: None,
        }];
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::Met);
    }

    #[test]
    fn documentation_present_always_insufficient() {
        let criterion = AtomicCriterion::new("c1", CriterionType::DocumentationPresent, "doc");
        assert_eq!(evaluate_criterion(&criterion, &patient()).verdict, Verdict::InsufficientData);
    }

    #[test]
    fn prescriber_consultation_delegates_to_specialty_logic() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::PrescriberConsultation, "prescriber");
        criterion.allowed_values = vec!["rheumatology".to_string()];
        let mut p = patient();
        p.prescriber_specialty = Some("Rheumatology".to_string());
        assert_eq!(evaluate_criterion(&criterion, &p).verdict, Verdict::Met);
    }
}
