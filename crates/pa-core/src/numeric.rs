use pa_contracts::ComparisonOperator;

/// Rejects NaN, +/-infinity; `f64` has no boolean variant so rejecting
/// booleans masquerading as thresholds is enforced by callers parsing from
/// `serde_json::Value` rather than here (a `Value::Bool` is never routed to
/// this function in the first place).
pub fn safe_float(value: f64) -> Option<f64> {
    if value.is_nan() || value.is_infinite() {
        None
    } else {
        Some(value)
    }
}

/// Evaluates `value <op> threshold` (with `upper` used only by `between`,
/// `in`, and `not_in`). Returns `None` when the operator cannot be resolved
/// safely (e.g. `between` with an unparseable upper bound degrades to
/// `gte`, which never returns `None` given a present, safe `value`).
pub fn compare_numeric(
    op: ComparisonOperator,
    value: f64,
    threshold: f64,
    upper: Option<f64>,
) -> bool {
    match op {
        ComparisonOperator::Gte => value >= threshold,
        ComparisonOperator::Gt => value > threshold,
        ComparisonOperator::Lt => value < threshold,
        ComparisonOperator::Lte => value <= threshold,
        ComparisonOperator::Eq => (value - threshold).abs() < f64::EPSILON,
        ComparisonOperator::Neq => (value - threshold).abs() >= f64::EPSILON,
        ComparisonOperator::Between => match upper.and_then(safe_float) {
            Some(upper) => value >= threshold && value <= upper,
            // Degrade to `gte` when the upper bound is missing or unparseable.
            None => value >= threshold,
        },
        ComparisonOperator::In => {
            (value - threshold).abs() < f64::EPSILON
                || upper.map(|u| (value - u).abs() < f64::EPSILON).unwrap_or(false)
        }
        ComparisonOperator::NotIn => {
            !((value - threshold).abs() < f64::EPSILON
                || upper.map(|u| (value - u).abs() < f64::EPSILON).unwrap_or(false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nan_and_infinite() {
        assert_eq!(safe_float(f64::NAN), None);
        assert_eq!(safe_float(f64::INFINITY), None);
        assert_eq!(safe_float(1.5), Some(1.5));
    }

    #[test]
    fn between_degrades_to_gte_without_upper() {
        assert!(compare_numeric(ComparisonOperator::Between, 20.0, 18.0, None));
        assert!(!compare_numeric(ComparisonOperator::Between, 10.0, 18.0, None));
    }

    #[test]
    fn between_is_inclusive_on_both_bounds() {
        assert!(compare_numeric(ComparisonOperator::Between, 18.0, 18.0, Some(21.0)));
        assert!(compare_numeric(ComparisonOperator::Between, 21.0, 18.0, Some(21.0)));
        assert!(!compare_numeric(ComparisonOperator::Between, 22.0, 18.0, Some(21.0)));
    }
}
