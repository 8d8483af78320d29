use crate::infra::{build_engine, read_input, Engine};
use clap::{Args, Subcommand};
use policy_engine::catalog::{PolicyId, PolicySetId, RuleId};
use policy_engine::config::AppConfig;
use policy_engine::error::AppError;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub(crate) enum EvaluateTarget {
    /// Evaluate a single policy and print its decision, offer and trace
    Policy(TargetArgs),
    /// Evaluate a policy set and print the unified decision
    PolicySet(PolicySetArgs),
    /// Run one rule in isolation
    Rule(TargetArgs),
}

#[derive(Args, Debug)]
pub(crate) struct TargetArgs {
    /// Identifier of the policy, policy set or rule
    pub(crate) id: String,
    /// Input document (JSON). Use `-` to read from stdin.
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Catalog to load instead of APP_CATALOG_PATH or the bundled demo
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct PolicySetArgs {
    #[command(flatten)]
    pub(crate) target: TargetArgs,
    /// Also print the per-policy details of the evaluation
    #[arg(long)]
    pub(crate) details: bool,
}

pub(crate) fn run_evaluate(target: EvaluateTarget) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    match target {
        EvaluateTarget::Policy(args) => {
            let engine = engine_for(&args, &config)?;
            let input = read_input(&args.input)?;
            let evaluation = engine.evaluate_policy(&PolicyId(args.id), &input)?;
            print_json(&evaluation)
        }
        EvaluateTarget::PolicySet(PolicySetArgs { target: args, details }) => {
            let engine = engine_for(&args, &config)?;
            let input = read_input(&args.input)?;
            let evaluation = engine.evaluate_policy_set(&PolicySetId(args.id), &input)?;
            print_json(&evaluation)?;
            if details {
                print_json(&evaluation.details)?;
            }
            Ok(())
        }
        EvaluateTarget::Rule(args) => {
            let engine = engine_for(&args, &config)?;
            let input = read_input(&args.input)?;
            let outcome = engine.test_rule(&RuleId(args.id), &input)?;
            print_json(&outcome)
        }
    }
}

fn engine_for(args: &TargetArgs, config: &AppConfig) -> Result<Engine, AppError> {
    let catalog = args.catalog.as_deref().or(config.catalog_path.as_deref());
    let (engine, _) = build_engine(catalog, config.engine, config.execution_log_capacity)?;
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
