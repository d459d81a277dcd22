//! Clinical code format validation. Only the *shape* of a code is checked —
//! the core never verifies that a code exists in the terminology it claims
//! to belong to (§1 Non-goal: "re-implementing clinical terminologies").

use regex::Regex;
use std::sync::OnceLock;

fn icd10_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z]\d{2}(\.[a-z0-9]{1,4})?$").unwrap())
}

fn hcpcs_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z]\d{4}$").unwrap())
}

fn cpt_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{5}$").unwrap())
}

fn loinc_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+-\d$").unwrap())
}

/// Validates `code`'s format against the conventions of `system`. Unknown
/// systems accept any non-empty token — this function never claims a code
/// is semantically valid, only that it is shaped like one.
pub fn validate_code_format(system: &str, code: &str) -> bool {
    match system.to_uppercase().as_str() {
        "ICD-10" | "ICD-10-CM" => icd10_pattern().is_match(code),
        "HCPCS" => hcpcs_pattern().is_match(code),
        "CPT" => cpt_pattern().is_match(code),
        "LOINC" => loinc_pattern().is_match(code),
        "NDC" | "RXNORM" | "SNOMED" => !code.trim().is_empty(),
        _ => !code.trim().is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icd10_accepts_bare_and_dotted_forms() {
        assert!(validate_code_format("ICD-10", "K50"));
        assert!(validate_code_format("ICD-10-CM", "K50.10"));
        assert!(validate_code_format("ICD-10", "M05.79"));
    }

    #[test]
    fn icd10_rejects_leading_digit_only_strings() {
        assert!(!validate_code_format("ICD-10", "123"));
        assert!(!validate_code_format("ICD-10", "50.10"));
    }

    #[test]
    fn hcpcs_requires_one_letter_and_four_digits() {
        assert!(validate_code_format("HCPCS", "J1745"));
        assert!(validate_code_format("HCPCS", "Q5103"));
        assert!(!validate_code_format("HCPCS", "J174"));
        assert!(!validate_code_format("HCPCS", "12345"));
    }

    #[test]
    fn cpt_requires_exactly_five_digits() {
        assert!(validate_code_format("CPT", "99213"));
        assert!(!validate_code_format("CPT", "9921"));
        assert!(!validate_code_format("CPT", "992133"));
    }

    #[test]
    fn loinc_requires_check_digit_suffix() {
        assert!(validate_code_format("LOINC", "71774-4"));
        assert!(!validate_code_format("LOINC", "717744"));
        assert!(!validate_code_format("LOINC", "71774-"));
    }

    #[test]
    fn unknown_system_accepts_any_non_empty_token() {
        assert!(validate_code_format("FOO-BAR", "whatever"));
        assert!(!validate_code_format("FOO-BAR", ""));
        assert!(!validate_code_format("FOO-BAR", "   "));
    }

    #[test]
    fn ndc_and_rxnorm_and_snomed_accept_any_non_empty_token() {
        assert!(validate_code_format("NDC", "0069-3150-83"));
        assert!(validate_code_format("RxNorm", "308136"));
        assert!(validate_code_format("SNOMED", "386661006"));
    }
}
