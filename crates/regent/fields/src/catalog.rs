//! Default guards for the governed record types.
//!
//! Timestamps stamped by workflow edges (`confirmed_at`, `completed_at`,
//! `cancelled_at`, `archived_at`, `published_at`) are declared here as
//! trigger-stamped fields so the stamp composes with immutability: the
//! first crossing stamps, every later write is reverted.

use crate::{CreateSource, FieldGuard, ImmutabilityMode, ImmutableField};
use regent_types::RecordType;
use serde_json::json;

fn stamp_when(field: &str, companion: &str, enters: &[&str]) -> ImmutableField {
    ImmutableField::new(
        field,
        ImmutabilityMode::StampWhen {
            companion: companion.to_string(),
            enters: enters.iter().map(|v| json!(v)).collect(),
        },
    )
}

pub fn enrollment_guard() -> FieldGuard {
    FieldGuard::new(RecordType::Enrollment)
        .rule(ImmutableField::new("enrollment_id", ImmutabilityMode::OnceSet).required())
        .rule(
            ImmutableField::new(
                "created_by",
                ImmutabilityMode::SetOnCreate(CreateSource::Actor),
            )
            .required(),
        )
        .rule(
            ImmutableField::new(
                "enrolled_at",
                ImmutabilityMode::SetOnCreate(CreateSource::Timestamp),
            )
            .required(),
        )
        .rule(stamp_when("confirmed_at", "status", &["confirmed"]))
        .rule(stamp_when("completed_at", "status", &["completed"]))
        .rule(stamp_when(
            "cancelled_at",
            "status",
            &["cancelled", "withdrawn"],
        ))
        .rule(ImmutableField::new(
            "certificate_issued",
            ImmutabilityMode::LatchTrue,
        ))
        .rule(ImmutableField::new(
            "certificate_url",
            ImmutabilityMode::OnceSet,
        ))
        .rule(ImmutableField::new(
            "certificate_issued_at",
            ImmutabilityMode::StampWhen {
                companion: "certificate_issued".to_string(),
                enters: vec![json!(true)],
            },
        ))
}

pub fn lead_guard() -> FieldGuard {
    FieldGuard::new(RecordType::Lead)
        .rule(ImmutableField::new("lead_id", ImmutabilityMode::OnceSet).required())
        // Anonymous intake leaves this unset; it is still never
        // client-writable.
        .rule(ImmutableField::new(
            "created_by",
            ImmutabilityMode::SetOnCreate(CreateSource::Actor),
        ))
        .rule(ImmutableField::new(
            "consent_given_at",
            ImmutabilityMode::SetOnCreate(CreateSource::Timestamp),
        ))
        .rule(ImmutableField::new("consent_ip", ImmutabilityMode::OnceSet))
        .rule(ImmutableField::new(
            "gdpr_consent",
            ImmutabilityMode::LatchTrue,
        ))
        .rule(stamp_when("converted_at", "status", &["converted"]))
}

pub fn template_guard() -> FieldGuard {
    FieldGuard::new(RecordType::Template)
        .rule(
            ImmutableField::new(
                "created_by",
                ImmutabilityMode::SetOnCreate(CreateSource::Actor),
            )
            .required(),
        )
        .rule(stamp_when("archived_at", "status", &["archived"]))
}

pub fn course_run_guard() -> FieldGuard {
    FieldGuard::new(RecordType::CourseRun)
        .rule(ImmutableField::new(
            "created_by",
            ImmutabilityMode::SetOnCreate(CreateSource::Actor),
        ))
        .rule(stamp_when("published_at", "status", &["published"]))
}

pub fn media_guard() -> FieldGuard {
    FieldGuard::new(RecordType::Media).rule(ImmutableField::new(
        "created_by",
        ImmutabilityMode::SetOnCreate(CreateSource::Actor),
    ))
}

pub fn faq_guard() -> FieldGuard {
    FieldGuard::new(RecordType::Faq).rule(ImmutableField::new(
        "created_by",
        ImmutabilityMode::SetOnCreate(CreateSource::Actor),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use regent_types::{ActorId, Operation, Record, RecordData};

    fn now() -> DateTime<Utc> {
        "2025-03-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_enrollment_create_stamps_and_owns() {
        let mut incoming = RecordData::new();
        incoming.set("enrollment_id", "ENR-20250301-0001");
        incoming.set("status", "pending");

        let resolution = enrollment_guard()
            .resolve(
                Operation::Create,
                Some(&ActorId::new("advisor-1")),
                incoming,
                None,
                now(),
            )
            .unwrap();
        assert_eq!(resolution.data.get_str("created_by"), Some("advisor-1"));
        assert_eq!(
            resolution.data.get_str("enrolled_at"),
            Some(now().to_rfc3339().as_str())
        );
        // Pending entry stamps nothing else.
        assert!(!resolution.data.is_set("confirmed_at"));
        assert!(!resolution.data.is_set("cancelled_at"));
    }

    #[test]
    fn test_withdrawn_stamps_cancelled_at() {
        let record = Record::new("enr-1", RecordType::Enrollment)
            .with_field("enrollment_id", "ENR-1")
            .with_field("created_by", "u-1")
            .with_field("enrolled_at", "2025-01-01T00:00:00+00:00")
            .with_status("confirmed")
            .with_field("confirmed_at", "2025-01-02T00:00:00+00:00");
        let mut candidate = record.data.clone();
        candidate.set("status", "withdrawn");

        let resolution = enrollment_guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert!(resolution.data.is_set("cancelled_at"));
        // The confirmation stamp survives the withdrawal.
        assert_eq!(
            resolution.data.get_str("confirmed_at"),
            Some("2025-01-02T00:00:00+00:00")
        );
    }

    #[test]
    fn test_certificate_chain() {
        let record = Record::new("enr-1", RecordType::Enrollment)
            .with_field("enrollment_id", "ENR-1")
            .with_field("created_by", "u-1")
            .with_field("enrolled_at", "2025-01-01T00:00:00+00:00")
            .with_status("completed");
        let mut candidate = record.data.clone();
        candidate.set("certificate_issued", true);
        candidate.set("certificate_url", "https://certs.example/enr-1.pdf");

        let resolution = enrollment_guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(resolution.data.get_bool("certificate_issued"), Some(true));
        assert!(resolution.data.is_set("certificate_issued_at"));
        assert!(resolution
            .stamped
            .contains(&"certificate_issued_at".to_string()));
    }

    #[test]
    fn test_template_archive_stamp_is_single_shot() {
        let record = Record::new("t-1", RecordType::Template)
            .with_field("created_by", "mkt-1")
            .with_status("active");
        let mut candidate = record.data.clone();
        candidate.set("status", "archived");

        let first = template_guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        let archived_at = first.data.get_str("archived_at").unwrap().to_string();

        // A later write cannot move it.
        let record = Record::new("t-1", RecordType::Template)
            .with_field("created_by", "mkt-1")
            .with_status("archived")
            .with_field("archived_at", archived_at.clone());
        let mut candidate = record.data.clone();
        candidate.set("archived_at", "1999-01-01T00:00:00+00:00");
        let later: DateTime<Utc> = "2025-06-01T00:00:00Z".parse().unwrap();

        let second = template_guard()
            .resolve(Operation::Update, None, candidate, Some(&record), later)
            .unwrap();
        assert_eq!(
            second.data.get_str("archived_at"),
            Some(archived_at.as_str())
        );
        assert_eq!(second.reverted, vec!["archived_at".to_string()]);
    }

    #[test]
    fn test_lead_consent_is_immutable_evidence() {
        let record = Record::new("l-1", RecordType::Lead)
            .with_field("lead_id", "LEAD-1")
            .with_field("gdpr_consent", true)
            .with_field("consent_given_at", "2025-01-01T00:00:00+00:00")
            .with_field("consent_ip", "203.0.113.9");
        let mut candidate = record.data.clone();
        candidate.set("gdpr_consent", false);
        candidate.set("consent_ip", "198.51.100.1");

        let resolution = lead_guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(resolution.data.get_bool("gdpr_consent"), Some(true));
        assert_eq!(resolution.data.get_str("consent_ip"), Some("203.0.113.9"));
        assert_eq!(resolution.reverted.len(), 2);
    }
}
