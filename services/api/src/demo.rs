use crate::infra::build_engine;
use clap::Args;
use policy_engine::catalog::PolicySetId;
use policy_engine::config::{EngineConfig, DEFAULT_EXECUTION_LOG_CAPACITY};
use policy_engine::error::AppError;
use policy_engine::Offer;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Catalog to run the demo against. Defaults to the bundled loan catalog.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Only run this policy set (defaults to every set in the catalog)
    #[arg(long)]
    pub(crate) policy_set: Option<String>,
}

struct DemoApplicant {
    label: &'static str,
    input: Value,
}

fn demo_applicants() -> Vec<DemoApplicant> {
    vec![
        DemoApplicant {
            label: "Prime salaried applicant",
            input: json!({
                "age": 36,
                "bureau": { "score": 826, "delinquencies": [] },
                "income": { "monthly": 140000 },
                "employment": { "type": "SALARIED" },
                "kyc": { "pan": "AAPFU0939F" }
            }),
        },
        DemoApplicant {
            label: "Near-prime self-employed applicant",
            input: json!({
                "age": 44,
                "bureau": { "score": 702, "delinquencies": ["2023-11 DPD30"] },
                "income": { "monthly": 82000 },
                "employment": { "type": "SELF_EMPLOYED" },
                "kyc": { "pan": "BNZPM2501G" }
            }),
        },
        DemoApplicant {
            label: "Young applicant with a malformed PAN",
            input: json!({
                "age": 19,
                "bureau": { "score": 771 },
                "employment": { "type": "SALARIED" },
                "kyc": { "pan": "12345" }
            }),
        },
    ]
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog,
        policy_set,
    } = args;

    let (engine, log) = build_engine(
        catalog.as_deref(),
        EngineConfig::default(),
        DEFAULT_EXECUTION_LOG_CAPACITY,
    )?;
    let policy_sets = match policy_set {
        Some(id) => vec![PolicySetId(id)],
        None => engine.store().policy_set_ids(),
    };
    let applicants = demo_applicants();

    println!("Lending policy engine demo");
    for policy_set_id in &policy_sets {
        println!("\nPolicy set {policy_set_id}");
        for applicant in &applicants {
            let evaluation = match engine.evaluate_policy_set(policy_set_id, &applicant.input) {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    println!("- {}: evaluation failed ({err})", applicant.label);
                    continue;
                }
            };

            println!(
                "- {}: {}",
                applicant.label,
                evaluation.decision.status.label()
            );
            match &evaluation.offer {
                Some(offer) => println!("  Offer: {}", describe_offer(offer)),
                None => println!("  Offer: none"),
            }
            for reason in &evaluation.decision.reasons {
                println!("  Reason: {reason}");
            }
            if let Some(name) = &evaluation.details.selected_offer_policy_name {
                println!(
                    "  Selected offer policy: {} (priority {})",
                    name,
                    evaluation
                        .details
                        .selected_offer_policy_priority
                        .unwrap_or_default()
                );
            }
        }
    }

    println!(
        "\nExecution log captured {} evaluation(s)",
        log.records().len()
    );
    Ok(())
}

fn describe_offer(offer: &Offer) -> String {
    let mut parts = Vec::new();
    if let Some(amount) = offer.loan_amount {
        parts.push(format!("amount {amount:.0}"));
    }
    if let Some(rate) = offer.rate_of_interest {
        parts.push(format!("rate {rate:.2}%"));
    }
    if let Some(fee) = offer.processing_fee {
        parts.push(format!("fee {fee:.0}"));
    }
    if let Some(tenure) = offer.tenure {
        parts.push(format!("{tenure} months"));
    }
    if let Some(emi) = offer.emi {
        parts.push(format!("EMI {emi:.0}"));
    }
    if parts.is_empty() {
        "no terms".to_string()
    } else {
        parts.join(" | ")
    }
}
