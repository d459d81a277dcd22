//! Structural differ between two versions of a digitized policy.
//!
//! Pure and stateless like the rest of the evaluation core: no I/O, no
//! injected clock, safe to call from any thread. Severity grading follows
//! the rule that loosening a policy is never worse than `minor` and
//! tightening it is graded by how directly it can flip an existing
//! approval — see `differ::compare_criterion` for the per-field rules.

pub mod differ;
pub mod types;

pub use differ::PolicyDiffer;
pub use types::{
    ChangeType, CriterionChange, DiffSummary, ExclusionChange, FieldDiff, IndicationChange,
    PolicyDiffResult, Severity, SeverityAssessment, StepTherapyChange,
};
