use std::collections::HashMap;

use pa_contracts::{DigitizedPolicy, GroupEvaluation, PolicyEvaluationResult, Verdict};
use pa_core::{evaluate_policy, normalize_patient_data, Clock};
use pa_diff::{ChangeType, PolicyDiffResult};

use crate::types::{PatientImpact, PolicyImpactReport, RiskLevel};

/// One active case to re-evaluate under both policy versions: a raw patient
/// payload plus an optional case identifier.
#[derive(Debug, Clone)]
pub struct ActiveCase {
    pub case_id: Option<String>,
    pub patient_data: serde_json::Value,
}

/// Assesses how a set of active cases would be affected by moving from
/// `old_policy` to `new_policy`.
///
/// Re-evaluation is the source of truth: `old_assessments`/`new_assessments`
/// are a pure optimization to skip recomputation for cases a caller already
/// evaluated, never a behavioral shortcut — a case missing from the map is
/// simply evaluated fresh.
pub fn analyze_impact(
    diff: &PolicyDiffResult,
    old_policy: &DigitizedPolicy,
    new_policy: &DigitizedPolicy,
    active_cases: &[ActiveCase],
    clock: &dyn Clock,
    old_assessments: Option<&HashMap<String, PolicyEvaluationResult>>,
    new_assessments: Option<&HashMap<String, PolicyEvaluationResult>>,
) -> PolicyImpactReport {
    tracing::info!(cases_count = active_cases.len(), "analyzing policy impact");

    let mut patient_impacts = Vec::new();
    let mut verdict_flips = 0usize;
    let mut at_risk = 0usize;
    let mut evaluated_count = 0usize;

    for case in active_cases {
        if case.patient_data.as_object().map(|m| m.is_empty()).unwrap_or(true) {
            tracing::debug!(case_id = ?case.case_id, "skipping case with empty patient data");
            continue;
        }

        let normalized = match normalize_patient_data(&case.patient_data, clock) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::debug!(case_id = ?case.case_id, error = %e, "skipping case with unparseable patient data");
                continue;
            }
        };

        evaluated_count += 1;

        let old_result = case
            .case_id
            .as_deref()
            .and_then(|id| old_assessments.and_then(|m| m.get(id)))
            .cloned()
            .unwrap_or_else(|| evaluate_policy(old_policy, &normalized));
        let new_result = case
            .case_id
            .as_deref()
            .and_then(|id| new_assessments.and_then(|m| m.get(id)))
            .cloned()
            .unwrap_or_else(|| evaluate_policy(new_policy, &normalized));

        let old_verdict = old_result.overall_verdict;
        let new_verdict = new_result.overall_verdict;
        let verdict_changed = old_verdict != new_verdict;
        let affected_criteria = find_affected_criteria(&old_result, &new_result, diff);

        let (risk_level, recommended_action) = if verdict_changed && old_verdict == Verdict::Met && new_verdict != Verdict::Met {
            verdict_flips += 1;
            (RiskLevel::VerdictFlip, "re-evaluate case immediately; prepare preemptive appeal".to_string())
        } else if verdict_changed && new_verdict == Verdict::NotMet && old_verdict == Verdict::InsufficientData {
            at_risk += 1;
            (
                RiskLevel::AtRisk,
                "case deteriorated from insufficient data to not met; review changed criteria".to_string(),
            )
        } else if !affected_criteria.is_empty() && new_verdict == Verdict::InsufficientData {
            at_risk += 1;
            (RiskLevel::AtRisk, "gather additional documentation for changed criteria".to_string())
        } else {
            (RiskLevel::NoImpact, "no action needed".to_string())
        };

        let patient_id = normalized
            .patient_id
            .clone()
            .or_else(|| case.case_id.clone())
            .unwrap_or_else(|| "unknown".to_string());

        patient_impacts.push(PatientImpact {
            patient_id,
            case_id: case.case_id.clone(),
            patient_name: patient_name(&case.patient_data),
            current_verdict: old_verdict,
            projected_verdict: new_verdict,
            verdict_changed,
            affected_criteria,
            risk_level,
            recommended_action,
        });
    }

    let impacted_cases = patient_impacts.iter().filter(|p| p.risk_level != RiskLevel::NoImpact).count();

    let mut action_items = Vec::new();
    if verdict_flips > 0 {
        action_items.push(format!("URGENT: {verdict_flips} case(s) may flip from APPROVED to NOT MET under new policy"));
    }
    if at_risk > 0 {
        action_items.push(format!("WARNING: {at_risk} case(s) at risk — gather additional documentation"));
    }
    if diff.summary.breaking_changes > 0 {
        action_items.push(format!("Review {} breaking change(s) in policy", diff.summary.breaking_changes));
    }

    tracing::info!(
        total = active_cases.len(),
        impacted = impacted_cases,
        verdict_flips,
        at_risk,
        "impact analysis complete"
    );

    PolicyImpactReport {
        diff: diff.clone(),
        total_active_cases: evaluated_count,
        impacted_cases,
        verdict_flips,
        at_risk_cases: at_risk,
        patient_impacts,
        action_items,
    }
}

fn patient_name(patient_data: &serde_json::Value) -> String {
    let demographics = patient_data.get("demographics");
    let first = demographics.and_then(|d| d.get("first_name")).and_then(|v| v.as_str()).unwrap_or("");
    let last = demographics.and_then(|d| d.get("last_name")).and_then(|v| v.as_str()).unwrap_or("");
    let name = format!("{first} {last}");
    let trimmed = name.trim();
    if trimmed.is_empty() {
        "Unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Criterion ids touched by the diff whose per-criterion verdict actually
/// differs between the two evaluations — walked recursively through every
/// indication's group tree, its subgroups, and the exclusion list.
fn find_affected_criteria(old_result: &PolicyEvaluationResult, new_result: &PolicyEvaluationResult, diff: &PolicyDiffResult) -> Vec<String> {
    let changed_ids: std::collections::HashSet<&str> = diff
        .criterion_changes
        .iter()
        .filter(|c| c.change_type != ChangeType::Unchanged)
        .map(|c| c.criterion_id.as_str())
        .chain(
            diff.step_therapy_changes
                .iter()
                .filter(|c| c.change_type != ChangeType::Unchanged)
                .map(|c| c.requirement_id.as_str()),
        )
        .chain(
            diff.exclusion_changes
                .iter()
                .filter(|c| c.change_type != ChangeType::Unchanged)
                .map(|c| c.exclusion_id.as_str()),
        )
        .collect();

    let old_verdicts = collect_all_verdicts(old_result);
    let new_verdicts = collect_all_verdicts(new_result);

    changed_ids
        .into_iter()
        .filter(|id| old_verdicts.get(*id) != new_verdicts.get(*id))
        .map(str::to_string)
        .collect()
}

fn collect_all_verdicts(result: &PolicyEvaluationResult) -> HashMap<String, Verdict> {
    let mut verdicts = HashMap::new();

    fn collect_from_group(group: &GroupEvaluation, verdicts: &mut HashMap<String, Verdict>) {
        for cr in &group.criteria_results {
            verdicts.insert(cr.criterion_id.clone(), cr.verdict);
        }
        for sg in &group.subgroup_results {
            collect_from_group(sg, verdicts);
        }
    }

    for ie in &result.indication_evaluations {
        if let Some(group) = &ie.approval_criteria_result {
            collect_from_group(group, &mut verdicts);
        }
    }
    for ee in &result.exclusion_evaluations {
        verdicts.insert(ee.criterion_id.clone(), ee.verdict);
    }
    verdicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::{AtomicCriterion, ClinicalCode, ComparisonOperator, CriterionGroup, CriterionType, IndicationCriteria, LogicalOperator};
    use pa_core::FixedClock;
    use pa_diff::PolicyDiffer;
    use std::collections::BTreeMap;

    fn make_policy(age_threshold: f64) -> DigitizedPolicy {
        let mut age = AtomicCriterion::new("AGE_TEST", CriterionType::Age, "demographics");
        age.comparison_operator = ComparisonOperator::Gte;
        age.threshold_value = Some(age_threshold);
        age.is_required = true;

        let mut diag = AtomicCriterion::new("DIAG_TEST", CriterionType::DiagnosisConfirmed, "diagnosis");
        diag.clinical_codes = vec![ClinicalCode::new("ICD-10", "K50.10")];
        diag.is_required = true;

        let mut atomic_criteria = BTreeMap::new();
        atomic_criteria.insert("AGE_TEST".to_string(), age);
        atomic_criteria.insert("DIAG_TEST".to_string(), diag);

        let mut criterion_groups = BTreeMap::new();
        criterion_groups.insert(
            "GRP_INITIAL".to_string(),
            CriterionGroup {
                group_id: "GRP_INITIAL".into(),
                name: "Initial".into(),
                operator: LogicalOperator::And,
                criteria: vec!["AGE_TEST".into(), "DIAG_TEST".into()],
                subgroups: Vec::new(),
                negated: false,
            },
        );

        let mut policy = DigitizedPolicy::new("TEST", "TestPayer", "TestDrug");
        policy.atomic_criteria = atomic_criteria;
        policy.criterion_groups = criterion_groups;
        policy.indications = vec![IndicationCriteria {
            indication_id: "IND_TEST".into(),
            indication_name: "Test Indication".into(),
            indication_codes: Vec::new(),
            initial_approval_criteria: "GRP_INITIAL".into(),
            continuation_criteria: None,
            initial_approval_duration_months: Some(6),
            continuation_duration_months: None,
            dosing_requirements: Vec::new(),
            min_age_years: None,
            max_age_years: None,
        }];
        policy
    }

    fn case(age: i64, case_id: &str) -> ActiveCase {
        ActiveCase {
            case_id: Some(case_id.to_string()),
            patient_data: serde_json::json!({
                "patient_id": format!("patient_{case_id}"),
                "demographics": {"first_name": "John", "last_name": "Doe", "age": age},
                "diagnoses": [{"icd10_code": "K50.10"}],
            }),
        }
    }

    #[test]
    fn verdict_flip_detected_when_patient_falls_below_new_threshold() {
        let old_policy = make_policy(18.0);
        let new_policy = make_policy(21.0);
        let diff = PolicyDiffer::new().diff(&old_policy, &new_policy);
        let clock = FixedClock(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let report = analyze_impact(&diff, &old_policy, &new_policy, &[case(20, "case_001")], &clock, None, None);

        assert_eq!(report.total_active_cases, 1);
        assert_eq!(report.verdict_flips, 1);
        assert_eq!(report.patient_impacts[0].risk_level, RiskLevel::VerdictFlip);
    }

    #[test]
    fn no_impact_when_still_meets_tightened_criteria() {
        let old_policy = make_policy(18.0);
        let new_policy = make_policy(21.0);
        let diff = PolicyDiffer::new().diff(&old_policy, &new_policy);
        let clock = FixedClock(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let report = analyze_impact(&diff, &old_policy, &new_policy, &[case(30, "case_002")], &clock, None, None);

        assert_eq!(report.verdict_flips, 0);
        assert_eq!(report.patient_impacts[0].risk_level, RiskLevel::NoImpact);
    }

    #[test]
    fn identical_policy_produces_no_flips() {
        let policy = make_policy(6.0);
        let diff = PolicyDiffer::new().diff(&policy, &policy);
        let clock = FixedClock(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let report = analyze_impact(&diff, &policy, &policy, &[case(25, "case_dc")], &clock, None, None);
        assert_eq!(report.verdict_flips, 0);
    }

    #[test]
    fn empty_patient_data_is_skipped_not_counted() {
        let policy = make_policy(18.0);
        let diff = PolicyDiffer::new().diff(&policy, &policy);
        let clock = FixedClock(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let empty_case = ActiveCase { case_id: Some("empty".into()), patient_data: serde_json::json!({}) };

        let report = analyze_impact(&diff, &policy, &policy, &[empty_case], &clock, None, None);
        assert_eq!(report.total_active_cases, 0);
        assert!(report.patient_impacts.is_empty());
    }
}
