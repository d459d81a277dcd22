use std::collections::BTreeSet;

use pa_contracts::{AtomicCriterion, ClinicalCode, ComparisonOperator, DigitizedPolicy, Exclusion, IndicationCriteria, StepTherapyRequirement};

use crate::types::{
    ChangeType, CriterionChange, DiffSummary, ExclusionChange, FieldDiff, IndicationChange,
    PolicyDiffResult, Severity, SeverityAssessment, StepTherapyChange,
};

/// Structural differ over two `DigitizedPolicy` versions.
///
/// Keeps no state between calls — every rule is a pure function of the two
/// inputs, matching the original source's stateless `PolicyDiffer`.
#[derive(Debug, Default)]
pub struct PolicyDiffer;

impl PolicyDiffer {
    pub fn new() -> Self {
        Self
    }

    pub fn diff(&self, old: &DigitizedPolicy, new: &DigitizedPolicy) -> PolicyDiffResult {
        let criterion_changes = diff_criteria(old, new);
        let step_therapy_changes = diff_step_therapy(&old.step_therapy_requirements, &new.step_therapy_requirements);
        let exclusion_changes = diff_exclusions(&old.exclusions, &new.exclusions);
        let indication_changes = diff_indications(&old.indications, &new.indications);

        let added_count = criterion_changes.iter().filter(|c| c.change_type == ChangeType::Added).count();
        let removed_count = criterion_changes.iter().filter(|c| c.change_type == ChangeType::Removed).count();
        let modified_count = criterion_changes.iter().filter(|c| c.change_type == ChangeType::Modified).count();
        let unchanged_count = criterion_changes.iter().filter(|c| c.change_type == ChangeType::Unchanged).count();

        let non_unchanged_severities = criterion_changes
            .iter()
            .filter(|c| c.change_type != ChangeType::Unchanged)
            .map(|c| c.severity)
            .chain(step_therapy_changes.iter().filter(|c| c.change_type != ChangeType::Unchanged).map(|c| c.severity))
            .chain(exclusion_changes.iter().filter(|c| c.change_type != ChangeType::Unchanged).map(|c| c.severity))
            .chain(indication_changes.iter().filter(|c| c.change_type != ChangeType::Unchanged).map(|c| c.severity));

        let mut breaking_changes = 0usize;
        let mut material_changes = 0usize;
        for severity in non_unchanged_severities {
            match severity {
                Severity::Breaking => breaking_changes += 1,
                Severity::Material => material_changes += 1,
                Severity::Minor => {}
            }
        }

        let severity_assessment = if breaking_changes > 0 {
            SeverityAssessment::HighImpact
        } else if material_changes > 0 {
            SeverityAssessment::MediumImpact
        } else {
            SeverityAssessment::LowImpact
        };

        let summary = DiffSummary {
            total_criteria_old: old.atomic_criteria.len(),
            total_criteria_new: new.atomic_criteria.len(),
            added_count,
            removed_count,
            modified_count,
            unchanged_count,
            breaking_changes,
            material_changes,
            severity_assessment,
        };

        tracing::info!(
            added = added_count,
            removed = removed_count,
            modified = modified_count,
            breaking = breaking_changes,
            material = material_changes,
            "policy diff computed"
        );

        PolicyDiffResult {
            criterion_changes,
            step_therapy_changes,
            exclusion_changes,
            indication_changes,
            summary,
        }
    }
}

fn code_set(codes: &[ClinicalCode]) -> BTreeSet<(String, String)> {
    codes.iter().map(|c| (c.system.clone(), c.code.clone())).collect()
}

/// Direction-aware threshold tightening: `None` when the rule doesn't apply
/// (operator doesn't carry a directional threshold, or nothing moved).
fn threshold_severity(old: &AtomicCriterion, new: &AtomicCriterion) -> Option<Severity> {
    match new.comparison_operator {
        ComparisonOperator::Gte | ComparisonOperator::Gt => match (old.threshold_value, new.threshold_value) {
            (Some(o), Some(n)) if n > o => Some(Severity::Breaking),
            (Some(o), Some(n)) if n < o => Some(Severity::Material),
            _ => None,
        },
        ComparisonOperator::Lte | ComparisonOperator::Lt => match (old.threshold_value, new.threshold_value) {
            (Some(o), Some(n)) if n < o => Some(Severity::Breaking),
            (Some(o), Some(n)) if n > o => Some(Severity::Material),
            _ => None,
        },
        ComparisonOperator::Between => {
            let old_lower = old.threshold_value;
            let new_lower = new.threshold_value;
            let old_upper = old.threshold_value_upper;
            let new_upper = new.threshold_value_upper;
            let lower_tightened = matches!((old_lower, new_lower), (Some(o), Some(n)) if n > o);
            let upper_tightened = matches!((old_upper, new_upper), (Some(o), Some(n)) if n < o);
            let lower_loosened = matches!((old_lower, new_lower), (Some(o), Some(n)) if n < o);
            let upper_loosened = matches!((old_upper, new_upper), (Some(o), Some(n)) if n > o);
            if lower_tightened || upper_tightened {
                Some(Severity::Breaking)
            } else if lower_loosened || upper_loosened {
                Some(Severity::Material)
            } else {
                None
            }
        }
        ComparisonOperator::Eq | ComparisonOperator::Neq | ComparisonOperator::In | ComparisonOperator::NotIn => {
            if old.threshold_value != new.threshold_value || old.allowed_values != new.allowed_values {
                Some(Severity::Material)
            } else {
                None
            }
        }
    }
}

fn compare_criterion(old: &AtomicCriterion, new: &AtomicCriterion) -> (ChangeType, Severity, Vec<FieldDiff>) {
    let mut diffs = Vec::new();
    let mut severity = Severity::Minor;

    if old.name != new.name {
        diffs.push(FieldDiff::new("name", &old.name, &new.name));
    }
    if old.description != new.description {
        diffs.push(FieldDiff::new("description", &old.description, &new.description));
    }
    if old.policy_text != new.policy_text {
        diffs.push(FieldDiff::new("policy_text", &old.policy_text, &new.policy_text));
    }

    if old.comparison_operator != new.comparison_operator
        || old.threshold_value != new.threshold_value
        || old.threshold_value_upper != new.threshold_value_upper
    {
        diffs.push(FieldDiff::new("threshold_value", old.threshold_value, new.threshold_value));
        if let Some(s) = threshold_severity(old, new) {
            severity = severity.escalate(s);
        } else if old.comparison_operator != new.comparison_operator {
            severity = severity.escalate(Severity::Material);
        }
    }

    let old_codes = code_set(&old.clinical_codes);
    let new_codes = code_set(&new.clinical_codes);
    if old_codes != new_codes {
        diffs.push(FieldDiff::new("clinical_codes", &old.clinical_codes, &new.clinical_codes));
        let narrowed = !old_codes.difference(&new_codes).collect::<BTreeSet<_>>().is_empty();
        let expanded = !new_codes.difference(&old_codes).collect::<BTreeSet<_>>().is_empty();
        let code_severity = if narrowed {
            Severity::Breaking
        } else if expanded {
            Severity::Material
        } else {
            Severity::Minor
        };
        severity = severity.escalate(code_severity);
    }

    if old.is_required != new.is_required {
        diffs.push(FieldDiff::new("is_required", old.is_required, new.is_required));
        let required_severity = if !old.is_required && new.is_required { Severity::Breaking } else { Severity::Minor };
        severity = severity.escalate(required_severity);
    }

    if old.allowed_values != new.allowed_values {
        diffs.push(FieldDiff::new("allowed_values", &old.allowed_values, &new.allowed_values));
        severity = severity.escalate(Severity::Material);
    }
    if old.drug_names != new.drug_names || old.drug_classes != new.drug_classes {
        diffs.push(FieldDiff::new("drug_names", &old.drug_names, &new.drug_names));
        severity = severity.escalate(Severity::Material);
    }
    if old.minimum_duration_days != new.minimum_duration_days {
        diffs.push(FieldDiff::new("minimum_duration_days", old.minimum_duration_days, new.minimum_duration_days));
        severity = severity.escalate(Severity::Material);
    }
    if old.criterion_type != new.criterion_type {
        diffs.push(FieldDiff::new("criterion_type", format!("{:?}", old.criterion_type), format!("{:?}", new.criterion_type)));
        severity = severity.escalate(Severity::Breaking);
    }

    let change_type = if diffs.is_empty() { ChangeType::Unchanged } else { ChangeType::Modified };
    if change_type == ChangeType::Unchanged {
        severity = Severity::Minor;
    }
    (change_type, severity, diffs)
}

fn diff_criteria(old: &DigitizedPolicy, new: &DigitizedPolicy) -> Vec<CriterionChange> {
    let mut changes = Vec::new();
    for (id, old_criterion) in &old.atomic_criteria {
        match new.atomic_criteria.get(id) {
            Some(new_criterion) => {
                let (change_type, severity, field_diffs) = compare_criterion(old_criterion, new_criterion);
                changes.push(CriterionChange { criterion_id: id.clone(), change_type, severity, field_diffs });
            }
            None => {
                changes.push(CriterionChange {
                    criterion_id: id.clone(),
                    change_type: ChangeType::Removed,
                    severity: Severity::Minor,
                    field_diffs: Vec::new(),
                });
            }
        }
    }
    for (id, new_criterion) in &new.atomic_criteria {
        if !old.atomic_criteria.contains_key(id) {
            let severity = if new_criterion.is_required { Severity::Breaking } else { Severity::Minor };
            changes.push(CriterionChange { criterion_id: id.clone(), change_type: ChangeType::Added, severity, field_diffs: Vec::new() });
        }
    }
    changes
}

fn diff_step_therapy(old: &[StepTherapyRequirement], new: &[StepTherapyRequirement]) -> Vec<StepTherapyChange> {
    let mut changes = Vec::new();
    for old_req in old {
        match new.iter().find(|r| r.requirement_id == old_req.requirement_id) {
            Some(new_req) => {
                let mut diffs = Vec::new();
                let mut severity = Severity::Minor;
                if old_req.minimum_trials != new_req.minimum_trials {
                    diffs.push(FieldDiff::new("minimum_trials", old_req.minimum_trials, new_req.minimum_trials));
                    severity = severity.escalate(if new_req.minimum_trials > old_req.minimum_trials {
                        Severity::Breaking
                    } else {
                        Severity::Material
                    });
                }
                if old_req.required_drugs != new_req.required_drugs || old_req.required_drug_classes != new_req.required_drug_classes {
                    diffs.push(FieldDiff::new("required_drugs", &old_req.required_drugs, &new_req.required_drugs));
                    severity = severity.escalate(Severity::Material);
                }
                if old_req.minimum_duration_days != new_req.minimum_duration_days {
                    diffs.push(FieldDiff::new("minimum_duration_days", old_req.minimum_duration_days, new_req.minimum_duration_days));
                    severity = severity.escalate(Severity::Material);
                }
                if old_req.failure_required != new_req.failure_required
                    || old_req.intolerance_acceptable != new_req.intolerance_acceptable
                    || old_req.contraindication_acceptable != new_req.contraindication_acceptable
                {
                    diffs.push(FieldDiff::new("failure_required", old_req.failure_required, new_req.failure_required));
                    severity = severity.escalate(Severity::Material);
                }
                let change_type = if diffs.is_empty() { ChangeType::Unchanged } else { ChangeType::Modified };
                if change_type == ChangeType::Unchanged {
                    severity = Severity::Minor;
                }
                changes.push(StepTherapyChange { requirement_id: old_req.requirement_id.clone(), change_type, severity, field_diffs: diffs });
            }
            None => {
                changes.push(StepTherapyChange {
                    requirement_id: old_req.requirement_id.clone(),
                    change_type: ChangeType::Removed,
                    severity: Severity::Minor,
                    field_diffs: Vec::new(),
                });
            }
        }
    }
    for new_req in new {
        if !old.iter().any(|r| r.requirement_id == new_req.requirement_id) {
            changes.push(StepTherapyChange {
                requirement_id: new_req.requirement_id.clone(),
                change_type: ChangeType::Added,
                severity: Severity::Breaking,
                field_diffs: Vec::new(),
            });
        }
    }
    changes
}

fn diff_exclusions(old: &[Exclusion], new: &[Exclusion]) -> Vec<ExclusionChange> {
    let mut changes = Vec::new();
    for old_excl in old {
        match new.iter().find(|e| e.exclusion_id == old_excl.exclusion_id) {
            Some(new_excl) => {
                let old_triggers: BTreeSet<_> = old_excl.trigger_criteria.iter().cloned().collect();
                let new_triggers: BTreeSet<_> = new_excl.trigger_criteria.iter().cloned().collect();
                if old_triggers == new_triggers {
                    changes.push(ExclusionChange {
                        exclusion_id: old_excl.exclusion_id.clone(),
                        change_type: ChangeType::Unchanged,
                        severity: Severity::Minor,
                        field_diffs: Vec::new(),
                    });
                } else {
                    let expanded = !new_triggers.difference(&old_triggers).collect::<BTreeSet<_>>().is_empty();
                    let narrowed = !old_triggers.difference(&new_triggers).collect::<BTreeSet<_>>().is_empty();
                    let severity = if expanded { Severity::Breaking } else if narrowed { Severity::Minor } else { Severity::Minor };
                    changes.push(ExclusionChange {
                        exclusion_id: old_excl.exclusion_id.clone(),
                        change_type: ChangeType::Modified,
                        severity,
                        field_diffs: vec![FieldDiff::new("trigger_criteria", &old_excl.trigger_criteria, &new_excl.trigger_criteria)],
                    });
                }
            }
            None => {
                changes.push(ExclusionChange {
                    exclusion_id: old_excl.exclusion_id.clone(),
                    change_type: ChangeType::Removed,
                    severity: Severity::Minor,
                    field_diffs: Vec::new(),
                });
            }
        }
    }
    for new_excl in new {
        if !old.iter().any(|e| e.exclusion_id == new_excl.exclusion_id) {
            changes.push(ExclusionChange {
                exclusion_id: new_excl.exclusion_id.clone(),
                change_type: ChangeType::Added,
                severity: Severity::Breaking,
                field_diffs: Vec::new(),
            });
        }
    }
    changes
}

fn diff_indications(old: &[IndicationCriteria], new: &[IndicationCriteria]) -> Vec<IndicationChange> {
    let mut changes = Vec::new();
    for old_ind in old {
        match new.iter().find(|i| i.indication_id == old_ind.indication_id) {
            Some(new_ind) => {
                let mut diffs = Vec::new();
                let mut severity = Severity::Minor;
                if old_ind.initial_approval_criteria != new_ind.initial_approval_criteria {
                    diffs.push(FieldDiff::new("initial_approval_criteria", &old_ind.initial_approval_criteria, &new_ind.initial_approval_criteria));
                    severity = severity.escalate(Severity::Breaking);
                }
                if old_ind.min_age_years != new_ind.min_age_years || old_ind.max_age_years != new_ind.max_age_years {
                    diffs.push(FieldDiff::new("min_age_years", old_ind.min_age_years, new_ind.min_age_years));
                    severity = severity.escalate(Severity::Material);
                }
                if old_ind.initial_approval_duration_months != new_ind.initial_approval_duration_months
                    || old_ind.continuation_duration_months != new_ind.continuation_duration_months
                    || old_ind.continuation_criteria != new_ind.continuation_criteria
                    || old_ind.dosing_requirements != new_ind.dosing_requirements
                    || old_ind.indication_codes != new_ind.indication_codes
                {
                    diffs.push(FieldDiff::new(
                        "initial_approval_duration_months",
                        old_ind.initial_approval_duration_months,
                        new_ind.initial_approval_duration_months,
                    ));
                    severity = severity.escalate(Severity::Material);
                }
                let change_type = if diffs.is_empty() { ChangeType::Unchanged } else { ChangeType::Modified };
                if change_type == ChangeType::Unchanged {
                    severity = Severity::Minor;
                }
                changes.push(IndicationChange { indication_id: old_ind.indication_id.clone(), change_type, severity, field_diffs: diffs });
            }
            None => {
                changes.push(IndicationChange {
                    indication_id: old_ind.indication_id.clone(),
                    change_type: ChangeType::Removed,
                    severity: Severity::Breaking,
                    field_diffs: Vec::new(),
                });
            }
        }
    }
    for new_ind in new {
        if !old.iter().any(|i| i.indication_id == new_ind.indication_id) {
            changes.push(IndicationChange {
                indication_id: new_ind.indication_id.clone(),
                change_type: ChangeType::Added,
                severity: Severity::Material,
                field_diffs: Vec::new(),
            });
        }
    }
    changes
}
