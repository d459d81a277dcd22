use pa_contracts::{AtomicCriterion, NormalizedLabResult, NormalizedScreening, NormalizedTreatment};

const NOISE_WORDS: &[&str] = &[
    "test", "level", "value", "result", "lab", "blood", "serum", "plasma", "the", "and", "for",
    "with",
];

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// Finds the first patient treatment matching this criterion. Walks the
/// patient's treatment list once, in order, checking all priority rules
/// against each treatment before moving to the next — so an earlier
/// treatment wins as soon as it satisfies any rule, regardless of whether a
/// later treatment would satisfy a higher-priority one.
pub fn find_matched_treatment<'p>(
    criterion: &AtomicCriterion,
    patient_treatments: &'p [NormalizedTreatment],
) -> Option<&'p NormalizedTreatment> {
    let drug_names: Vec<String> = criterion.drug_names.iter().map(|s| s.to_lowercase()).collect();
    let drug_classes: Vec<String> = criterion.drug_classes.iter().map(|s| s.to_lowercase()).collect();
    let description = criterion.description.to_lowercase();
    let name = criterion.name.to_lowercase();

    for tx in patient_treatments {
        let tx_name = tx.medication_name.to_lowercase();
        let tx_class = tx.drug_class.as_deref().map(str::to_lowercase).unwrap_or_default();

        // 1. Exact drug name match.
        if drug_names.iter().any(|d| d == &tx_name) {
            return Some(tx);
        }
        // 2. Substring match either direction against any criterion drug name (no length floor).
        if drug_names.iter().any(|d| tx_name.contains(d.as_str()) || d.contains(tx_name.as_str())) {
            return Some(tx);
        }
        // 3. Exact drug class match.
        if !tx_class.is_empty() && drug_classes.iter().any(|c| c == &tx_class) {
            return Some(tx);
        }
        // 4. Treatment name (>=4 chars) as substring of criterion description/name.
        if tx_name.len() >= 4 && (description.contains(&tx_name) || name.contains(&tx_name)) {
            return Some(tx);
        }
        // 5. Any word (>=4 chars) from the treatment's drug class appears in the description.
        if !tx_class.is_empty() && words(&tx_class).iter().any(|w| w.len() >= 4 && description.contains(w.as_str())) {
            return Some(tx);
        }
    }

    None
}

/// Finds a matching lab result by LOINC code first (a full pass over every
/// result, since a precise code match anywhere outranks any name-based
/// match), then falls back to name-based matching in a second pass.
pub fn find_lab_result<'p>(
    criterion: &AtomicCriterion,
    lab_results: &'p [NormalizedLabResult],
) -> Option<&'p NormalizedLabResult> {
    let criterion_codes: Vec<&str> = criterion
        .clinical_codes
        .iter()
        .filter(|c| c.system.eq_ignore_ascii_case("LOINC"))
        .map(|c| c.code.as_str())
        .collect();

    if let Some(found) = lab_results.iter().find(|l| {
        l.loinc_code
            .as_deref()
            .map(|code| criterion_codes.contains(&code))
            .unwrap_or(false)
    }) {
        return Some(found);
    }

    let name = criterion.name.to_lowercase();
    let description = criterion.description.to_lowercase();
    let keywords: Vec<String> = words(&name)
        .into_iter()
        .filter(|w| w.len() >= 4 && !NOISE_WORDS.contains(&w.as_str()))
        .collect();

    for lab in lab_results {
        let test = lab.test_name.to_lowercase();

        if test == name {
            return Some(lab);
        }
        if test.len() >= 4 && (name.contains(&test) || description.contains(&test)) {
            return Some(lab);
        }
        if name.len() >= 4 && test.contains(&name) {
            return Some(lab);
        }
        if test.len() < 4 && test.chars().all(char::is_alphabetic) {
            if words(&name).contains(&test) || words(&description).contains(&test) {
                return Some(lab);
            }
        }
        if !keywords.is_empty() {
            let lab_tokens = words(&test);
            if keywords.iter().any(|k| lab_tokens.contains(k)) {
                return Some(lab);
            }
        }
    }

    None
}

/// Finds a matching screening: either the screening's own type string
/// appears in the criterion's name/description, or one of a small set of
/// layperson aliases for tuberculosis/hepatitis screenings does.
pub fn find_screening<'p>(
    criterion: &AtomicCriterion,
    screenings: &'p [NormalizedScreening],
) -> Option<&'p NormalizedScreening> {
    let combined = format!("{} {}", criterion.name.to_lowercase(), criterion.description.to_lowercase());

    screenings.iter().find(|screening| {
        let st = screening.screening_type.to_lowercase();
        if combined.contains(&st) {
            return true;
        }
        match st.as_str() {
            "tb" => combined.contains("tb") || combined.contains("tuberculosis"),
            "hepatitis_b" => combined.contains("hepatitis b") || combined.contains("hep b"),
            "hepatitis_c" => combined.contains("hepatitis c") || combined.contains("hep c"),
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::CriterionType;

    fn treatment(name: &str, class: Option<&str>) -> NormalizedTreatment {
        NormalizedTreatment {
            medication_name: name.to_string(),
            drug_class: class.map(str::to_string),
            duration_weeks: None,
            outcome: Some("failed".to_string()),
            adequate_trial: true,
        }
    }

    #[test]
    fn matches_on_drug_name_membership() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::PriorTreatmentFailed, "cat");
        criterion.drug_names = vec!["prednisone".to_string()];
        let treatments = vec![treatment("Prednisone", None)];
        let found = find_matched_treatment(&criterion, &treatments);
        assert!(found.is_some());
    }

    #[test]
    fn matches_on_drug_class_when_name_does_not_match() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::PriorTreatmentFailed, "cat");
        criterion.drug_classes = vec!["corticosteroid".to_string()];
        let treatments = vec![treatment("SomeBrand", Some("Corticosteroid"))];
        let found = find_matched_treatment(&criterion, &treatments);
        assert!(found.is_some());
    }

    #[test]
    fn short_tokens_do_not_false_positive_match() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::PriorTreatmentFailed, "cat");
        criterion.description = "IV administration required".to_string();
        let treatments = vec![treatment("IV", None)];
        let found = find_matched_treatment(&criterion, &treatments);
        assert!(found.is_none());
    }

    #[test]
    fn earlier_treatment_wins_over_later_higher_priority_match() {
        // tx[0] only matches via the description-substring rule (priority 4);
        // tx[1] would match via exact drug-name equality (priority 1). The
        // first treatment in traversal order still wins, matching the
        // single-pass-per-item semantics this function preserves.
        let mut criterion = AtomicCriterion::new("c1", CriterionType::PriorTreatmentFailed, "cat");
        criterion.drug_names = vec!["adalimumab".to_string()];
        criterion.description = "prior infliximab therapy".to_string();
        let treatments = vec![treatment("Infliximab", None), treatment("Adalimumab", None)];
        let found = find_matched_treatment(&criterion, &treatments).unwrap();
        assert_eq!(found.medication_name, "Infliximab");
    }

    #[test]
    fn lab_matches_on_loinc_code() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::LabValue, "cat");
        criterion.clinical_codes = vec![pa_contracts::ClinicalCode::new("LOINC", "1234-5")];
        let labs = vec![NormalizedLabResult {
            test_name: "Unrelated".to_string(),
            loinc_code: Some("1234-5".to_string()),
            value: Some(1.0),
            unit: None,
            date: None,
            flag: None,
        }];
        assert!(find_lab_result(&criterion, &labs).is_some());
    }

    #[test]
    fn loinc_match_outranks_name_match_earlier_in_list() {
        let mut criterion = AtomicCriterion::new("c1", CriterionType::LabValue, "cat");
        criterion.name = "CRP".to_string();
        criterion.clinical_codes = vec![pa_contracts::ClinicalCode::new("LOINC", "1988-5")];
        let labs = vec![
            NormalizedLabResult { test_name: "CRP".to_string(), loinc_code: None, value: Some(1.0), unit: None, date: None, flag: None },
            NormalizedLabResult { test_name: "Unrelated".to_string(), loinc_code: Some("1988-5".to_string()), value: Some(2.0), unit: None, date: None, flag: None },
        ];
        let found = find_lab_result(&criterion, &labs).unwrap();
        assert_eq!(found.value, Some(2.0));
    }
}
