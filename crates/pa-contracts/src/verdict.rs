use serde::{Deserialize, Serialize};

/// Outcome of evaluating a single criterion, group, or indication.
///
/// The evaluator never collapses missing data into `NotMet` — see the
/// error-vs-missing-data duality described at the crate root. `NotApplicable`
/// is distinct from all three: it means the criterion/group was not relevant
/// to this evaluation path at all (e.g. dropped from a combinator, or an
/// unresolved group/criterion reference), and is transparent to its siblings
/// during combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Met,
    NotMet,
    InsufficientData,
    NotApplicable,
}

impl Verdict {
    /// Ranking used by `overall_verdict`'s best-over-indications rule:
    /// Met > InsufficientData > NotMet.
    pub fn rank(self) -> u8 {
        match self {
            Verdict::Met => 2,
            Verdict::InsufficientData => 1,
            Verdict::NotMet => 0,
            Verdict::NotApplicable => 0,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Met => "met",
            Verdict::NotMet => "not_met",
            Verdict::InsufficientData => "insufficient_data",
            Verdict::NotApplicable => "not_applicable",
        };
        write!(f, "{s}")
    }
}
