//! Deterministic patient normalization and policy evaluation.
//!
//! Everything here is a pure function over its inputs except for age
//! computation, which reads the current date through an injected [`Clock`].
//! No criterion evaluator, group combinator, or policy orchestrator ever
//! fails: data the evaluator cannot act on produces
//! `Verdict::InsufficientData`, never a `Result::Err` — see
//! [`normalize::normalize_patient_data`] for the one place this crate's
//! public surface is actually fallible, and why.

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod matching;
pub mod normalize;
pub mod numeric;
pub mod policy_eval;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::NormalizeError;
pub use evaluator::evaluate_criterion;
pub use group::{combine_verdicts, evaluate_group};
pub use normalize::normalize_patient_data;
pub use policy_eval::{evaluate_policy, evaluate_step_therapy};
