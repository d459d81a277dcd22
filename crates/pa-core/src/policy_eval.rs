//! Top-level policy evaluation: per-indication group evaluation, exclusion
//! checks, step therapy, readiness scoring, and gap analysis.

use pa_contracts::{
    CriterionEvaluation, DigitizedPolicy, Gap, GapType, GroupEvaluation, IndicationEvaluation,
    NormalizedPatientData, PolicyEvaluationResult, StepTherapyEvaluation, StepTherapyRequirementEvaluation, Verdict,
};

use crate::evaluator::evaluate_criterion;
use crate::group::evaluate_group;

const FAILED_OUTCOMES: &[&str] = &["failed", "inadequate_response", "partial_response", "steroid_dependent"];

/// Evaluates every step-therapy requirement on `policy` against `patient`.
/// A policy with no step-therapy requirements is vacuously satisfied.
pub fn evaluate_step_therapy(policy: &DigitizedPolicy, patient: &NormalizedPatientData) -> StepTherapyEvaluation {
    if policy.step_therapy_requirements.is_empty() {
        return StepTherapyEvaluation { required: false, satisfied: true, requirements: Vec::new() };
    }

    let mut requirements = Vec::new();
    let mut all_satisfied = true;

    for req in &policy.step_therapy_requirements {
        let required_items: Vec<&str> = req
            .required_drugs
            .iter()
            .chain(req.required_drug_classes.iter())
            .map(String::as_str)
            .collect();

        let mut drugs_tried = 0u32;
        let mut drugs_failed = 0u32;

        for item in &required_items {
            let item_lower = item.to_lowercase();
            for tx in &patient.prior_treatments {
                let tx_name = tx.medication_name.to_lowercase();
                let tx_class = tx.drug_class.as_deref().map(str::to_lowercase).unwrap_or_default();
                if tx_name.contains(&item_lower) || tx_class.contains(&item_lower) {
                    drugs_tried += 1;
                    let outcome = tx.outcome.as_deref().unwrap_or("");
                    if FAILED_OUTCOMES.contains(&outcome)
                        || (outcome == "intolerant" && req.intolerance_acceptable)
                        || (outcome == "contraindicated" && req.contraindication_acceptable)
                    {
                        drugs_failed += 1;
                    }
                    break;
                }
            }
        }

        let satisfied = drugs_failed >= req.minimum_trials;
        if !satisfied {
            all_satisfied = false;
        }

        requirements.push(StepTherapyRequirementEvaluation {
            requirement_id: req.requirement_id.clone(),
            indication: req.indication.clone(),
            minimum_trials: req.minimum_trials,
            drugs_tried,
            drugs_failed,
            satisfied,
            reasoning: format!(
                "{drugs_failed}/{} required trials documented",
                req.minimum_trials
            ),
        });
    }

    StepTherapyEvaluation { required: true, satisfied: all_satisfied, requirements }
}

/// Recursively flattens a group evaluation tree into the list of every
/// `CriterionEvaluation` it contains, depth-first.
fn collect_all_criteria_evals(group: Option<&GroupEvaluation>) -> Vec<CriterionEvaluation> {
    let Some(group) = group else { return Vec::new() };
    let mut results = group.criteria_results.clone();
    for sg in &group.subgroup_results {
        results.extend(collect_all_criteria_evals(Some(sg)));
    }
    results
}

/// Evaluates a patient against every indication, exclusion, and step-therapy
/// requirement in a digitized policy, producing a single deterministic
/// result.
#[tracing::instrument(skip_all, fields(policy_id = %policy.policy_id, patient_id = patient.patient_id.as_deref().unwrap_or("unknown")))]
pub fn evaluate_policy(policy: &DigitizedPolicy, patient: &NormalizedPatientData) -> PolicyEvaluationResult {
    let mut indication_evaluations = Vec::with_capacity(policy.indications.len());

    for indication in &policy.indications {
        let group_result = policy
            .get_group(&indication.initial_approval_criteria)
            .map(|root_group| evaluate_group(root_group, policy, patient));

        let all_criteria = collect_all_criteria_evals(group_result.as_ref());
        let met_count = all_criteria.iter().filter(|c| c.verdict == Verdict::Met).count() as u32;
        let total_count = all_criteria.len() as u32;
        let unmet: Vec<_> = all_criteria.iter().filter(|c| c.verdict == Verdict::NotMet).cloned().collect();
        let insufficient: Vec<_> =
            all_criteria.iter().filter(|c| c.verdict == Verdict::InsufficientData).cloned().collect();

        let overall = group_result.as_ref().map(|g| g.verdict).unwrap_or(Verdict::InsufficientData);

        indication_evaluations.push(IndicationEvaluation {
            indication_id: indication.indication_id.clone(),
            indication_name: indication.indication_name.clone(),
            overall_verdict: overall,
            approval_criteria_result: group_result,
            criteria_met_count: met_count,
            criteria_total_count: total_count,
            unmet_criteria: unmet,
            insufficient_criteria: insufficient,
        });
    }

    let exclusion_evaluations: Vec<CriterionEvaluation> = policy
        .exclusions
        .iter()
        .flat_map(|excl| excl.trigger_criteria.iter())
        .filter_map(|trigger_id| policy.get_criterion(trigger_id))
        .map(|criterion| evaluate_criterion(criterion, patient))
        .collect();

    let step_therapy_evaluation = evaluate_step_therapy(policy, patient);

    let all_evals: Vec<CriterionEvaluation> = indication_evaluations
        .iter()
        .flat_map(|ie| collect_all_criteria_evals(ie.approval_criteria_result.as_ref()))
        .collect();
    let total = all_evals.len();
    let met = all_evals.iter().filter(|e| e.verdict == Verdict::Met).count();
    let overall_readiness = if total > 0 { met as f64 / total as f64 } else { 0.0 };
    let overall_readiness = (overall_readiness * 1000.0).round() / 1000.0;

    let overall_verdict = if indication_evaluations.is_empty() {
        Verdict::InsufficientData
    } else {
        let mut best = Verdict::NotMet;
        let mut has_real_evaluation = false;
        for ie in &indication_evaluations {
            match ie.overall_verdict {
                Verdict::Met => {
                    best = Verdict::Met;
                    has_real_evaluation = true;
                    break;
                }
                Verdict::InsufficientData => {
                    best = Verdict::InsufficientData;
                    has_real_evaluation = true;
                }
                Verdict::NotMet => {
                    has_real_evaluation = true;
                }
                Verdict::NotApplicable => {}
            }
        }
        if !has_real_evaluation {
            Verdict::NotApplicable
        } else {
            best
        }
    };

    let mut gaps = Vec::new();
    for ie in &indication_evaluations {
        for ic in &ie.insufficient_criteria {
            gaps.push(Gap {
                criterion_id: ic.criterion_id.clone(),
                criterion_name: ic.criterion_name.clone(),
                indication: ie.indication_name.clone(),
                gap_type: GapType::InsufficientData,
                action: format!("Obtain documentation for: {}", ic.criterion_name),
            });
        }
        for uc in &ie.unmet_criteria {
            if uc.is_required {
                gaps.push(Gap {
                    criterion_id: uc.criterion_id.clone(),
                    criterion_name: uc.criterion_name.clone(),
                    indication: ie.indication_name.clone(),
                    gap_type: GapType::NotMet,
                    action: format!("Address unmet criterion: {}", uc.criterion_name),
                });
            }
        }
    }

    tracing::debug!(overall_readiness, gap_count = gaps.len(), "policy evaluation complete");

    PolicyEvaluationResult {
        policy_id: policy.policy_id.clone(),
        patient_id: patient.patient_id.clone().or(Some("unknown".to_string())),
        indication_evaluations,
        exclusion_evaluations,
        step_therapy_evaluation: Some(step_therapy_evaluation),
        overall_readiness,
        overall_verdict,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pa_contracts::{AtomicCriterion, CriterionGroup, CriterionType, IndicationCriteria, LogicalOperator, StepTherapyRequirement};

    fn simple_policy() -> DigitizedPolicy {
        let mut policy = DigitizedPolicy::new("p1", "Acme", "Humira");
        let mut criterion = AtomicCriterion::new("age1", CriterionType::Age, "demographic");
        criterion.threshold_value = Some(18.0);
        criterion.is_required = true;
        policy.atomic_criteria.insert("age1".to_string(), criterion);

        let mut group = CriterionGroup::new("root", "Root", LogicalOperator::And);
        group.criteria.push("age1".to_string());
        policy.criterion_groups.insert("root".to_string(), group);

        policy.indications.push(IndicationCriteria {
            indication_id: "ind1".to_string(),
            indication_name: "Rheumatoid Arthritis".to_string(),
            indication_codes: Vec::new(),
            initial_approval_criteria: "root".to_string(),
            continuation_criteria: None,
            initial_approval_duration_months: None,
            continuation_duration_months: None,
            dosing_requirements: Vec::new(),
            min_age_years: None,
            max_age_years: None,
        });
        policy
    }

    #[test]
    fn met_criterion_produces_full_readiness_and_met_verdict() {
        let policy = simple_policy();
        let mut patient = NormalizedPatientData::default();
        patient.age_years = Some(30);
        let result = evaluate_policy(&policy, &patient);
        assert_eq!(result.overall_verdict, Verdict::Met);
        assert_eq!(result.overall_readiness, 1.0);
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn unmet_required_criterion_produces_a_gap() {
        let policy = simple_policy();
        let mut patient = NormalizedPatientData::default();
        patient.age_years = Some(10);
        let result = evaluate_policy(&policy, &patient);
        assert_eq!(result.overall_verdict, Verdict::NotMet);
        assert_eq!(result.gaps.len(), 1);
        assert_eq!(result.gaps[0].gap_type, GapType::NotMet);
    }

    #[test]
    fn missing_data_surfaces_insufficient_data_gap_not_denial() {
        let policy = simple_policy();
        let patient = NormalizedPatientData::default();
        let result = evaluate_policy(&policy, &patient);
        assert_eq!(result.overall_verdict, Verdict::InsufficientData);
        assert_eq!(result.gaps.len(), 1);
        assert_eq!(result.gaps[0].gap_type, GapType::InsufficientData);
    }

    #[test]
    fn patient_id_defaults_to_unknown_when_absent() {
        let policy = simple_policy();
        let patient = NormalizedPatientData::default();
        let result = evaluate_policy(&policy, &patient);
        assert_eq!(result.patient_id.as_deref(), Some("unknown"));
    }

    #[test]
    fn step_therapy_vacuously_satisfied_when_no_requirements() {
        let policy = simple_policy();
        let patient = NormalizedPatientData::default();
        let result = evaluate_step_therapy(&policy, &patient);
        assert!(!result.required);
        assert!(result.satisfied);
    }

    #[test]
    fn step_therapy_requires_minimum_trials_of_failures() {
        let mut policy = simple_policy();
        policy.step_therapy_requirements.push(StepTherapyRequirement {
            requirement_id: "st1".to_string(),
            indication: "ind1".to_string(),
            required_drugs: vec!["methotrexate".to_string(), "sulfasalazine".to_string()],
            required_drug_classes: Vec::new(),
            minimum_trials: 2,
            minimum_duration_days: None,
            failure_required: true,
            intolerance_acceptable: false,
            contraindication_acceptable: false,
        });
        let mut patient = NormalizedPatientData::default();
        patient.prior_treatments = vec![
            pa_contracts::NormalizedTreatment {
                medication_name: "Methotrexate".to_string(),
                outcome: Some("failed".to_string()),
                ..Default::default()
            },
            pa_contracts::NormalizedTreatment {
                medication_name: "Sulfasalazine".to_string(),
                outcome: Some("inadequate_response".to_string()),
                ..Default::default()
            },
        ];
        let result = evaluate_step_therapy(&policy, &patient);
        assert!(result.required);
        assert!(result.satisfied);
        assert_eq!(result.requirements[0].drugs_failed, 2);
    }
}
