use serde::{Deserialize, Serialize};

use super::features::ExtractedFeatures;
use crate::catalog::{OfferFields, OutputMapping};

/// Loan terms computed by an approved offer policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub loan_amount: Option<f64>,
    pub rate_of_interest: Option<f64>,
    pub processing_fee: Option<f64>,
    pub tenure: Option<u32>,
    pub emi: Option<f64>,
}

impl Offer {
    /// Overwrite the fields `fields` sets, leaving the others untouched.
    pub fn apply(&mut self, fields: &OfferFields) {
        if let Some(value) = fields.loan_amount {
            self.loan_amount = Some(value);
        }
        if let Some(value) = fields.rate_of_interest {
            self.rate_of_interest = Some(value);
        }
        if let Some(value) = fields.processing_fee {
            self.processing_fee = Some(value);
        }
        if let Some(value) = fields.tenure {
            self.tenure = Some(value);
        }
        if let Some(value) = fields.emi {
            self.emi = Some(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.loan_amount.is_none()
            && self.rate_of_interest.is_none()
            && self.processing_fee.is_none()
            && self.tenure.is_none()
            && self.emi.is_none()
    }
}

/// Default output overlaid with the first conditional output that matches.
pub fn compute_offer(mapping: Option<&OutputMapping>, features: &ExtractedFeatures) -> Offer {
    let mut offer = Offer::default();
    let Some(mapping) = mapping else {
        return offer;
    };

    offer.apply(&mapping.default_output);
    if let Some(conditional) = mapping
        .conditional_outputs
        .iter()
        .find(|conditional| condition_holds(&conditional.condition, features))
    {
        offer.apply(&conditional.output);
    }
    offer
}

/// `<feature><op><threshold>` with op one of `>=`, `<=`, `>`, `<`. Blank
/// conditions always hold; malformed ones never do.
pub(crate) fn condition_holds(condition: &str, features: &ExtractedFeatures) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }

    let comparators: [(&str, fn(f64, f64) -> bool); 4] = [
        (">=", |value, threshold| value >= threshold),
        ("<=", |value, threshold| value <= threshold),
        (">", |value, threshold| value > threshold),
        ("<", |value, threshold| value < threshold),
    ];

    let Some((symbol, test)) = comparators
        .iter()
        .find(|(symbol, _)| condition.contains(*symbol))
    else {
        return false;
    };
    let Some((name, threshold)) = condition.split_once(symbol) else {
        return false;
    };
    let Ok(threshold) = threshold.trim().parse::<f64>() else {
        return false;
    };

    features
        .get(name.trim())
        .and_then(|value| value.as_f64())
        .map_or(false, |value| test(value, threshold))
}
