//! Recursive evaluation of `CriterionGroup` DAGs and logical combination of
//! child verdicts.

use std::collections::HashSet;

use pa_contracts::{CriterionGroup, DigitizedPolicy, GroupEvaluation, LogicalOperator, NormalizedPatientData, Verdict};

use crate::evaluator::evaluate_criterion;

/// Evaluates a criterion group recursively, combining its direct criteria
/// and subgroups per the group's logical operator.
///
/// Cycle detection is path-local: a group id is inserted into `visited`
/// before its children are evaluated and removed again once they have been
/// (but before combining verdicts), so the same group can be reached twice
/// via different paths in a diamond-shaped DAG without being mistaken for a
/// cycle — only a genuine ancestor-is-descendant cycle trips the guard.
pub fn evaluate_group(group: &CriterionGroup, policy: &DigitizedPolicy, patient: &NormalizedPatientData) -> GroupEvaluation {
    let mut visited = HashSet::new();
    evaluate_group_inner(group, policy, patient, &mut visited)
}

fn evaluate_group_inner(
    group: &CriterionGroup,
    policy: &DigitizedPolicy,
    patient: &NormalizedPatientData,
    visited: &mut HashSet<String>,
) -> GroupEvaluation {
    if visited.contains(&group.group_id) {
        return GroupEvaluation {
            group_id: group.group_id.clone(),
            operator: group.operator,
            verdict: Verdict::InsufficientData,
            reasoning: "Circular group reference detected".to_string(),
            criteria_results: Vec::new(),
            subgroup_results: Vec::new(),
        };
    }
    visited.insert(group.group_id.clone());

    let criteria_results: Vec<_> = group
        .criteria
        .iter()
        .filter_map(|cid| policy.get_criterion(cid))
        .map(|criterion| evaluate_criterion(criterion, patient))
        .collect();

    let subgroup_results: Vec<_> = group
        .subgroups
        .iter()
        .filter_map(|sid| policy.get_group(sid))
        .map(|sg| evaluate_group_inner(sg, policy, patient, visited))
        .collect();

    visited.remove(&group.group_id);

    let all_verdicts: Vec<Verdict> = criteria_results
        .iter()
        .map(|r| r.verdict)
        .chain(subgroup_results.iter().map(|r| r.verdict))
        .collect();
    let verdict = combine_verdicts(&all_verdicts, group.operator, group.negated);

    GroupEvaluation {
        group_id: group.group_id.clone(),
        operator: group.operator,
        verdict,
        reasoning: String::new(),
        criteria_results,
        subgroup_results,
    }
}

/// Combines child verdicts under a logical operator. `NOT_APPLICABLE`
/// entries are transparent to AND/OR — they are dropped before combination
/// — but `NOT` inspects the first verdict of the *original*, unfiltered
/// list, since a NOT group always has exactly one logical child.
pub fn combine_verdicts(verdicts: &[Verdict], operator: LogicalOperator, negated: bool) -> Verdict {
    if verdicts.is_empty() {
        return Verdict::NotApplicable;
    }

    let effective: Vec<Verdict> = verdicts.iter().copied().filter(|v| *v != Verdict::NotApplicable).collect();
    if effective.is_empty() {
        return Verdict::NotApplicable;
    }

    let mut result = match operator {
        LogicalOperator::And => {
            if effective.iter().all(|v| *v == Verdict::Met) {
                Verdict::Met
            } else if effective.iter().any(|v| *v == Verdict::NotMet) {
                Verdict::NotMet
            } else {
                Verdict::InsufficientData
            }
        }
        LogicalOperator::Or => {
            if effective.iter().any(|v| *v == Verdict::Met) {
                Verdict::Met
            } else if effective.iter().all(|v| *v == Verdict::NotMet) {
                Verdict::NotMet
            } else {
                Verdict::InsufficientData
            }
        }
        LogicalOperator::Not => match verdicts[0] {
            Verdict::Met => Verdict::NotMet,
            Verdict::NotMet => Verdict::Met,
            other => other,
        },
    };

    if negated {
        result = match result {
            Verdict::Met => Verdict::NotMet,
            Verdict::NotMet => Verdict::Met,
            other => other,
        };
    }

    result
}
