use std::sync::atomic::Ordering;

use serde_json::json;

use super::common::{applicant, build_engine, loan_store, policy, store_with, CountingStore};
use crate::catalog::{PolicyId, PolicyType, Rule, RuleId};
use crate::config::EngineConfig;
use crate::evaluation::{
    DecisionStatus, EvaluationError, ExtractionError, Offer, OperatorCatalog, PolicyEvaluator,
};

#[test]
fn eligibility_approves_qualified_applicants() {
    let (engine, _) = build_engine();

    let evaluation = engine
        .evaluate_policy(&PolicyId::from("p-eligibility"), &applicant(25, 720))
        .expect("evaluates");

    assert_eq!(evaluation.decision.status, DecisionStatus::Approved);
    assert!(evaluation.decision.reasons.is_empty());
    assert_eq!(evaluation.policy_type, PolicyType::Boolean);
    assert!(evaluation.offer.is_none());
    assert_eq!(evaluation.extracted_features.len(), 2);
}

#[test]
fn eligibility_rejects_with_the_failing_rule() {
    let (engine, _) = build_engine();

    let evaluation = engine
        .evaluate_policy(&PolicyId::from("p-eligibility"), &applicant(18, 720))
        .expect("evaluates");

    assert_eq!(evaluation.decision.status, DecisionStatus::Rejected);
    assert_eq!(evaluation.decision.reasons.len(), 1);
    assert!(evaluation.decision.reasons[0].contains("Adult applicant"));
}

#[test]
fn offer_policies_apply_the_first_matching_condition() {
    let (engine, _) = build_engine();
    let id = PolicyId::from("p-standard-offer");

    let strong = engine
        .evaluate_policy(&id, &applicant(30, 730))
        .expect("evaluates");
    assert_eq!(
        strong.offer,
        Some(Offer {
            loan_amount: Some(300000.0),
            rate_of_interest: Some(12.0),
            tenure: Some(36),
            ..Offer::default()
        })
    );

    let fair = engine
        .evaluate_policy(&id, &applicant(30, 705))
        .expect("evaluates");
    assert_eq!(
        fair.offer,
        Some(Offer {
            loan_amount: Some(250000.0),
            rate_of_interest: Some(13.0),
            tenure: Some(36),
            ..Offer::default()
        })
    );

    let plain = engine
        .evaluate_policy(&id, &applicant(30, 660))
        .expect("evaluates");
    assert_eq!(plain.offer.and_then(|offer| offer.loan_amount), Some(200000.0));
}

#[test]
fn rejected_offer_policies_carry_no_offer() {
    let (engine, _) = build_engine();

    let evaluation = engine
        .evaluate_policy(&PolicyId::from("p-standard-offer"), &applicant(30, 600))
        .expect("evaluates");

    assert_eq!(evaluation.decision.status, DecisionStatus::Rejected);
    assert!(evaluation.offer.is_none());
}

#[test]
fn approved_offer_policy_without_mapping_yields_an_empty_offer() {
    let store = store_with(|document| {
        for policy in &mut document.policies {
            if policy.id == PolicyId::from("p-prime-offer") {
                policy.output_mapping = None;
            }
        }
    });
    let operators = OperatorCatalog::builtin();
    let prime = policy(&store, "p-prime-offer");

    let evaluation = PolicyEvaluator::new(&store, &operators, EngineConfig::default())
        .evaluate(&prime, &applicant(30, 780))
        .expect("evaluates");

    assert!(evaluation.decision.is_approved());
    assert_eq!(evaluation.offer, Some(Offer::default()));
}

#[test]
fn unknown_policies_are_not_found() {
    let (engine, _) = build_engine();

    let err = engine
        .evaluate_policy(&PolicyId::from("p-missing"), &applicant(30, 700))
        .expect_err("no such policy");

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "policy 'p-missing' not found");
}

#[test]
fn dangling_rule_references_are_not_found() {
    let store = store_with(|document| {
        document.rules.retain(|rule| rule.id != RuleId::from("r-score"));
    });
    let operators = OperatorCatalog::builtin();
    let eligibility = policy(&store, "p-eligibility");

    let err = PolicyEvaluator::new(&store, &operators, EngineConfig::default())
        .evaluate(&eligibility, &applicant(30, 700))
        .expect_err("rule removed");

    match err {
        EvaluationError::NotFound { kind, id } => {
            assert_eq!(kind, "rule");
            assert_eq!(id, "r-score");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn incompatible_rules_are_invalid() {
    let store = store_with(|document| {
        document.rules.push(Rule {
            id: RuleId::from("r-score-prefix"),
            name: "Score prefix".to_string(),
            description: None,
            feature_id: "f-credit-score".into(),
            operator_code: "STARTS_WITH".to_string(),
            operand: Some(json!("7")),
        });
        document.policies[0].root_node = crate::catalog::DecisionNode::leaf("r-score-prefix");
    });
    let operators = OperatorCatalog::builtin();
    let eligibility = policy(&store, "p-eligibility");

    let err = PolicyEvaluator::new(&store, &operators, EngineConfig::default())
        .evaluate(&eligibility, &applicant(30, 700))
        .expect_err("text operator on a numeric feature");

    assert!(err.is_validation());
    match err {
        EvaluationError::InvalidRule { rule, reason } => {
            assert_eq!(rule, "Score prefix");
            assert!(reason.contains("NUMERIC"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_operands_are_invalid() {
    let store = store_with(|document| {
        document.rules.push(Rule {
            id: RuleId::from("r-age-band"),
            name: "Age band".to_string(),
            description: None,
            feature_id: "f-age".into(),
            operator_code: "BETWEEN".to_string(),
            operand: Some(json!([21])),
        });
        document.policies[0].root_node = crate::catalog::DecisionNode::leaf("r-age-band");
    });
    let operators = OperatorCatalog::builtin();
    let eligibility = policy(&store, "p-eligibility");

    let err = PolicyEvaluator::new(&store, &operators, EngineConfig::default())
        .evaluate(&eligibility, &applicant(30, 700))
        .expect_err("BETWEEN needs two bounds");

    assert!(matches!(err, EvaluationError::InvalidRule { .. }));
}

#[test]
fn missing_input_fails_extraction() {
    let (engine, _) = build_engine();

    let err = engine
        .evaluate_policy(&PolicyId::from("p-eligibility"), &json!({ "age": 30 }))
        .expect_err("credit score absent");

    match err {
        EvaluationError::Extraction(ExtractionError::MissingFeatures(names)) => {
            assert_eq!(names, vec!["creditScore".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn rules_are_fetched_in_a_single_batch() {
    let store = CountingStore::new(loan_store());
    let operators = OperatorCatalog::builtin();
    let eligibility = policy(&loan_store(), "p-eligibility");

    PolicyEvaluator::new(&store, &operators, EngineConfig::default())
        .evaluate(&eligibility, &applicant(30, 700))
        .expect("evaluates");

    assert_eq!(store.rule_batches.load(Ordering::SeqCst), 1);
    assert_eq!(store.single_rule_lookups.load(Ordering::SeqCst), 0);
    assert_eq!(store.feature_lookups.load(Ordering::SeqCst), 2);
}

#[test]
fn evaluation_serializes_with_a_typed_trace() {
    let (engine, _) = build_engine();

    let evaluation = engine
        .evaluate_policy(&PolicyId::from("p-eligibility"), &applicant(18, 720))
        .expect("evaluates");
    let body = serde_json::to_value(&evaluation).expect("serializes");

    assert_eq!(body["policyId"], "p-eligibility");
    assert_eq!(body["decision"]["status"], "REJECTED");
    assert_eq!(body["extractedFeatures"]["age"], 18);
    assert_eq!(body["treeResult"]["nodeType"], "COMPOSITE");
    assert_eq!(body["treeResult"]["operator"], "AND");
    let leaf = &body["treeResult"]["childResults"][0];
    assert_eq!(leaf["nodeType"], "LEAF");
    assert_eq!(leaf["ruleId"], "r-adult");
    assert_eq!(leaf["featureValue"], 18);
    assert_eq!(leaf["operatorCode"], "GTE");
    assert_eq!(leaf["result"], false);
}
