//! Financial amount validation and payment-status derivation.
//!
//! Amounts must be coherent before any enrollment write persists:
//! non-negative, paid within total, aid within total. The payment status
//! is always derived from the amounts — it is never client-writable, and
//! `refunded` survives derivation as long as the amounts stand still
//! (refunds are an explicit administrative flow, not an arithmetic one).
//!
//! Validation failures name fields and bounds only; amounts never appear
//! in the returned reasons.

use regent_types::{Operation, Record, RecordData};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinancialRules {
    pub total_field: String,
    pub paid_field: String,
    pub aid_field: String,
    pub status_field: String,
}

impl Default for FinancialRules {
    fn default() -> Self {
        Self {
            total_field: "total_amount".into(),
            paid_field: "amount_paid".into(),
            aid_field: "financial_aid_amount".into(),
            status_field: "payment_status".into(),
        }
    }
}

impl FinancialRules {
    /// Check amount coherence over the resolved candidate data.
    pub fn validate(&self, operation: Operation, data: &RecordData) -> Result<(), String> {
        if operation == Operation::Create && !data.is_set(&self.total_field) {
            return Err(format!("{} is required", self.total_field));
        }

        let mut amount = |field: &str| -> Result<Option<f64>, String> {
            match data.get_set(field) {
                None => Ok(None),
                Some(_) => match data.get_f64(field) {
                    Some(value) if value < 0.0 => {
                        Err(format!("{field} must not be negative"))
                    }
                    Some(value) => Ok(Some(value)),
                    None => Err(format!("{field} must be a number")),
                },
            }
        };

        let total = amount(&self.total_field)?;
        let paid = amount(&self.paid_field)?;
        let aid = amount(&self.aid_field)?;

        if let (Some(total), Some(paid)) = (total, paid) {
            if paid > total {
                return Err(format!(
                    "{} must not exceed {}",
                    self.paid_field, self.total_field
                ));
            }
        }
        if let (Some(total), Some(aid)) = (total, aid) {
            if aid > total {
                return Err(format!(
                    "{} must not exceed {}",
                    self.aid_field, self.total_field
                ));
            }
        }
        Ok(())
    }

    /// Derive the payment status from the amounts. Returns `None` when the
    /// record carries no total (nothing to derive from).
    pub fn derive_status(&self, data: &RecordData, existing: Option<&Record>) -> Option<String> {
        let total = data.get_f64(&self.total_field)?;
        let paid = data.get_f64(&self.paid_field).unwrap_or(0.0);

        if let Some(record) = existing {
            let amounts_unchanged = record.data.get_f64(&self.total_field) == Some(total)
                && record.data.get_f64(&self.paid_field).unwrap_or(0.0) == paid;
            if amounts_unchanged && record.data.get_str(&self.status_field) == Some("refunded") {
                return Some("refunded".to_string());
            }
        }

        let status = if paid <= 0.0 {
            "unpaid"
        } else if paid < total {
            "partial"
        } else {
            "paid"
        };
        Some(status.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regent_types::RecordType;
    use serde_json::json;

    fn data(total: f64, paid: f64) -> RecordData {
        let mut data = RecordData::new();
        data.set("total_amount", json!(total));
        data.set("amount_paid", json!(paid));
        data
    }

    #[test]
    fn test_derivation_tiers() {
        let rules = FinancialRules::default();
        assert_eq!(
            rules.derive_status(&data(1000.0, 0.0), None).as_deref(),
            Some("unpaid")
        );
        assert_eq!(
            rules.derive_status(&data(1000.0, 400.0), None).as_deref(),
            Some("partial")
        );
        assert_eq!(
            rules.derive_status(&data(1000.0, 1000.0), None).as_deref(),
            Some("paid")
        );
    }

    #[test]
    fn test_paid_over_total_rejected() {
        let rules = FinancialRules::default();
        let result = rules.validate(Operation::Update, &data(1000.0, 1200.0));
        assert!(result.is_err());
        // No amounts leak into the reason.
        let reason = result.unwrap_err();
        assert!(!reason.contains("1000"));
        assert!(!reason.contains("1200"));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let rules = FinancialRules::default();
        assert!(rules.validate(Operation::Update, &data(1000.0, -1.0)).is_err());
    }

    #[test]
    fn test_total_required_on_create_only() {
        let rules = FinancialRules::default();
        let empty = RecordData::new();
        assert!(rules.validate(Operation::Create, &empty).is_err());
        assert!(rules.validate(Operation::Update, &empty).is_ok());
    }

    #[test]
    fn test_aid_within_total() {
        let rules = FinancialRules::default();
        let mut data = data(1000.0, 0.0);
        data.set("financial_aid_amount", json!(1500.0));
        assert!(rules.validate(Operation::Update, &data).is_err());
        data.set("financial_aid_amount", json!(500.0));
        assert!(rules.validate(Operation::Update, &data).is_ok());
    }

    #[test]
    fn test_non_numeric_amount_rejected() {
        let rules = FinancialRules::default();
        let mut data = RecordData::new();
        data.set("total_amount", json!("lots"));
        assert!(rules.validate(Operation::Update, &data).is_err());
    }

    #[test]
    fn test_refunded_survives_unrelated_updates() {
        let rules = FinancialRules::default();
        let record = Record::new("enr-1", RecordType::Enrollment)
            .with_field("total_amount", json!(1000.0))
            .with_field("amount_paid", json!(1000.0))
            .with_field("payment_status", "refunded");

        // Amounts unchanged: refunded stands.
        assert_eq!(
            rules
                .derive_status(&record.data.clone(), Some(&record))
                .as_deref(),
            Some("refunded")
        );

        // Amounts changed: derivation takes over again.
        let mut changed = record.data.clone();
        changed.set("amount_paid", json!(400.0));
        assert_eq!(
            rules.derive_status(&changed, Some(&record)).as_deref(),
            Some("partial")
        );
    }
}
