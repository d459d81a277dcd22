//! Policy Digitalization and Evaluation Core — Demo CLI
//!
//! A thin command-line surface over the library crates: digitalize a raw
//! policy draft, evaluate a patient against a stored or file-loaded policy,
//! diff two policy versions, or project the impact of a policy change on a
//! set of active cases. Every subcommand does real work through the public
//! API named in the design's external-interfaces section — nothing here
//! re-implements pipeline, evaluator, differ, or impact-analyzer logic.
//!
//! Usage:
//!   pa-cli demo
//!   pa-cli digitalize --payer "Acme Health" --medication Humira --source draft.json
//!   pa-cli evaluate --policy policy.json --patient patient.json
//!   pa-cli diff --old old_policy.json --new new_policy.json
//!   pa-cli impact --old old_policy.json --new new_policy.json --cases cases.json

mod collaborators;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pa_contracts::DigitizedPolicy;
use pa_core::{evaluate_policy, normalize_patient_data, SystemClock};
use pa_diff::PolicyDiffer;
use pa_impact::{analyze_impact, ActiveCase};
use pa_pipeline::{PipelineConfig, PolicyDigitalizationPipeline, SourceType};
use pa_repository::InMemoryPolicyRepository;

use collaborators::{JsonPassthroughExtractor, NoOpValidationModel};
use error::{parse_json, read_to_string, CliResult};

#[derive(Parser)]
#[command(
    name = "pa-cli",
    about = "Policy digitalization and evaluation core — demo CLI",
    long_about = "Digitize policy drafts, evaluate patients, diff policy versions, and project\n\
                  change impact, all through the deterministic evaluation core.\n\n\
                  Subcommands:\n\
                  demo        — run seed scenarios S1-S4 and print a summary\n\
                  digitalize  — run the 3-pass pipeline over a draft JSON file\n\
                  evaluate    — evaluate a patient record against a policy\n\
                  diff        — structurally diff two policy versions\n\
                  impact      — assess which active cases a policy change affects"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run seed scenarios S1-S4 and print a one-line verdict per scenario.
    Demo,
    /// Run the digitalization pipeline over a structured draft JSON file.
    Digitalize {
        #[arg(long)]
        payer: String,
        #[arg(long)]
        medication: String,
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        skip_validation: bool,
    },
    /// Evaluate a normalized (or raw) patient record against a policy file.
    Evaluate {
        #[arg(long)]
        policy: PathBuf,
        #[arg(long)]
        patient: PathBuf,
    },
    /// Structurally diff two policy version files.
    Diff {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
    },
    /// Assess the impact of moving from one policy version to another on a
    /// set of active cases.
    Impact {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
        #[arg(long)]
        cases: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Demo => run_demo(),
        Command::Digitalize { payer, medication, source, skip_validation } => {
            run_digitalize(&payer, &medication, &source, skip_validation).await
        }
        Command::Evaluate { policy, patient } => run_evaluate(&policy, &patient),
        Command::Diff { old, new } => run_diff(&old, &new),
        Command::Impact { old, new, cases } => run_impact(&old, &new, &cases),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pa-cli error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_demo() -> CliResult<()> {
    println!("Policy Digitalization and Evaluation Core — seed scenarios");
    println!("============================================================");

    let clock = pa_scenarios::scenario_clock();

    {
        let policy = pa_scenarios::make_crohns_policy("latest", 6.0);
        let patient = normalize_patient_data(&pa_scenarios::crohns_patient_payload(39), &clock)?;
        let result = evaluate_policy(&policy, &patient);
        println!(
            "S1 clean approval:         verdict={:?} readiness={:.2}",
            result.overall_verdict, result.overall_readiness
        );
    }
    {
        let v1 = pa_scenarios::make_crohns_policy("v1", 6.0);
        let v2 = pa_scenarios::make_crohns_policy("v2", 21.0);
        let patient = normalize_patient_data(&pa_scenarios::crohns_patient_payload(20), &clock)?;
        let under_v1 = evaluate_policy(&v1, &patient);
        let under_v2 = evaluate_policy(&v2, &patient);
        println!(
            "S2 age threshold tightens: v1={:?} v2={:?}",
            under_v1.overall_verdict, under_v2.overall_verdict
        );
    }
    {
        let policy = pa_scenarios::make_tb_screening_policy();
        let patient = normalize_patient_data(&pa_scenarios::patient_with_no_screenings(), &clock)?;
        let result = evaluate_policy(&policy, &patient);
        println!("S3 missing screening:      verdict={:?} (never not_met)", result.overall_verdict);
    }
    {
        let policy = pa_scenarios::make_step_therapy_policy(1, true);
        let patient = normalize_patient_data(&pa_scenarios::patient_intolerant_to_azathioprine(), &clock)?;
        let result = evaluate_policy(&policy, &patient);
        let satisfied = result.step_therapy_evaluation.map(|s| s.satisfied).unwrap_or(false);
        println!("S4 step therapy (intolerance accepted): satisfied={satisfied}");
    }

    Ok(())
}

async fn run_digitalize(payer: &str, medication: &str, source: &Path, skip_validation: bool) -> CliResult<()> {
    let source_text = read_to_string(source)?;

    let pipeline = PolicyDigitalizationPipeline::new(
        JsonPassthroughExtractor,
        NoOpValidationModel,
        InMemoryPolicyRepository::new(),
        PipelineConfig::default(),
    );

    let result = pipeline.digitalize_policy(&source_text, SourceType::Text, skip_validation).await?;
    println!(
        "digitized {}/{}: {} criteria, {} indications, quality={}",
        payer, medication, result.criteria_count, result.indications_count, result.extraction_quality
    );
    println!("{}", serde_json::to_string_pretty(&result.policy).expect("policy always serializes"));
    Ok(())
}

fn load_policy(path: &Path) -> CliResult<DigitizedPolicy> {
    let text = read_to_string(path)?;
    parse_json(path, &text)
}

fn run_evaluate(policy_path: &Path, patient_path: &Path) -> CliResult<()> {
    let policy = load_policy(policy_path)?;
    let raw_patient: serde_json::Value = parse_json(patient_path, &read_to_string(patient_path)?)?;

    let clock = SystemClock;
    let patient = normalize_patient_data(&raw_patient, &clock)?;
    let result = evaluate_policy(&policy, &patient);

    println!("{}", serde_json::to_string_pretty(&result).expect("evaluation result always serializes"));
    Ok(())
}

fn run_diff(old_path: &Path, new_path: &Path) -> CliResult<()> {
    let old = load_policy(old_path)?;
    let new = load_policy(new_path)?;

    let diff = PolicyDiffer::new().diff(&old, &new);
    println!("{}", serde_json::to_string_pretty(&diff).expect("diff result always serializes"));
    Ok(())
}

fn run_impact(old_path: &Path, new_path: &Path, cases_path: &Path) -> CliResult<()> {
    let old = load_policy(old_path)?;
    let new = load_policy(new_path)?;

    let raw_cases: Vec<serde_json::Value> = parse_json(cases_path, &read_to_string(cases_path)?)?;
    let active_cases: Vec<ActiveCase> = raw_cases
        .into_iter()
        .map(|v| ActiveCase {
            case_id: v.get("case_id").and_then(|c| c.as_str()).map(str::to_string),
            patient_data: v.get("patient_data").cloned().unwrap_or(v),
        })
        .collect();

    let diff = PolicyDiffer::new().diff(&old, &new);
    let clock = SystemClock;
    let report = analyze_impact(&diff, &old, &new, &active_cases, &clock, None, None);

    println!("{}", serde_json::to_string_pretty(&report).expect("impact report always serializes"));
    Ok(())
}
