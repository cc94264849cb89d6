//! Regent Fields - the field guard
//!
//! One authoritative enforcer for system-managed field values. The outer
//! layers (UI read-only markers, transport-level rejection) are optional
//! fast paths; whatever they miss ends here, where a locked field is
//! reverted to its stored value no matter who is writing. Immutability is a
//! business invariant, not an access-control statement — an admin's write
//! to a frozen field is reverted exactly like anyone else's.
//!
//! The guard resolves a *candidate* record (the existing snapshot with the
//! incoming patch overlaid) into the value set that may be persisted:
//!
//! - create-time fields are taken from the authenticated actor or the
//!   clock, ignoring client-supplied values entirely;
//! - frozen fields are reverted to their stored value, and the revert is
//!   reported rather than failing the write;
//! - trigger-stamped fields are set exactly once, when their companion
//!   field crosses into the trigger state;
//! - a required create-time field missing from the stored snapshot fails
//!   the whole operation — silent back-fill would mask an integrity bug.

#![deny(unsafe_code)]

pub mod catalog;

pub use catalog::{
    course_run_guard, enrollment_guard, faq_guard, lead_guard, media_guard, template_guard,
};

use chrono::{DateTime, Utc};
use regent_types::{ActorId, Operation, Record, RecordData, RecordType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

// ── Rules ────────────────────────────────────────────────────────────

/// Where a create-time field's value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateSource {
    /// The authenticated actor's identity.
    Actor,
    /// The current time.
    Timestamp,
}

/// How a field is protected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ImmutabilityMode {
    /// Assigned by the system at creation; client input for the field is
    /// ignored entirely. Frozen thereafter.
    SetOnCreate(CreateSource),
    /// Writable until it first holds a value; frozen thereafter.
    OnceSet,
    /// A boolean that may flip to `true` once and never back.
    LatchTrue,
    /// Stamped with the current time when the companion field crosses into
    /// one of the listed values; frozen thereafter. Re-entering the same
    /// state never re-stamps.
    StampWhen {
        companion: String,
        enters: Vec<Value>,
    },
}

/// A protected field of one record type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImmutableField {
    pub field: String,
    pub mode: ImmutabilityMode,
    /// Whether the field must exist on every stored snapshot after
    /// creation. A missing required field is data corruption.
    pub required_after_create: bool,
}

impl ImmutableField {
    pub fn new(field: impl Into<String>, mode: ImmutabilityMode) -> Self {
        Self {
            field: field.into(),
            mode,
            required_after_create: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required_after_create = true;
        self
    }
}

// ── Resolution ───────────────────────────────────────────────────────

/// The guard's output: the value set to persist, plus what it changed.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub data: RecordData,
    /// Fields whose incoming value was discarded in favor of the stored
    /// one. Logged, never fatal.
    pub reverted: Vec<String>,
    /// Fields stamped by a trigger during this resolution.
    pub stamped: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FieldError {
    /// A field that should have been set at creation is missing from the
    /// stored record. The operation fails rather than back-filling.
    #[error("data integrity violation: required field {field} missing on {record_type} record")]
    MissingRequired {
        record_type: RecordType,
        field: String,
    },
}

// ── Guard ────────────────────────────────────────────────────────────

/// The immutability rule set for one record type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldGuard {
    pub record_type: RecordType,
    rules: Vec<ImmutableField>,
}

impl FieldGuard {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: ImmutableField) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ImmutableField] {
        &self.rules
    }

    /// Resolve a candidate value set against the stored snapshot.
    ///
    /// `candidate` must already be the merged view (stored data with the
    /// incoming patch overlaid); `existing` is `None` for creation.
    pub fn resolve(
        &self,
        operation: Operation,
        actor: Option<&ActorId>,
        candidate: RecordData,
        existing: Option<&Record>,
        now: DateTime<Utc>,
    ) -> Result<Resolution, FieldError> {
        let mut resolution = Resolution {
            data: candidate,
            reverted: Vec::new(),
            stamped: Vec::new(),
        };

        match existing {
            None => self.resolve_create(operation, actor, now, &mut resolution)?,
            Some(record) => self.resolve_update(record, now, &mut resolution)?,
        }

        Ok(resolution)
    }

    fn resolve_create(
        &self,
        _operation: Operation,
        actor: Option<&ActorId>,
        now: DateTime<Utc>,
        resolution: &mut Resolution,
    ) -> Result<(), FieldError> {
        for rule in &self.rules {
            match &rule.mode {
                ImmutabilityMode::SetOnCreate(CreateSource::Actor) => match actor {
                    Some(actor) => {
                        if resolution.data.is_set(&rule.field) {
                            debug!(field = %rule.field, "client-supplied create value ignored");
                        }
                        resolution
                            .data
                            .set(rule.field.clone(), Value::String(actor.0.clone()));
                    }
                    None => {
                        if rule.required_after_create {
                            return Err(FieldError::MissingRequired {
                                record_type: self.record_type,
                                field: rule.field.clone(),
                            });
                        }
                        // Anonymous creation: the field stays unset, and
                        // any client-supplied value is still dropped.
                        resolution.data.remove(&rule.field);
                    }
                },
                ImmutabilityMode::SetOnCreate(CreateSource::Timestamp) => {
                    resolution
                        .data
                        .set(rule.field.clone(), Value::String(now.to_rfc3339()));
                    resolution.stamped.push(rule.field.clone());
                }
                ImmutabilityMode::OnceSet | ImmutabilityMode::LatchTrue => {
                    // First write; whatever the candidate carries stands.
                }
                ImmutabilityMode::StampWhen { companion, enters } => {
                    let triggered = resolution
                        .data
                        .get_set(companion)
                        .is_some_and(|v| enters.contains(v));
                    if triggered && !resolution.data.is_set(&rule.field) {
                        resolution
                            .data
                            .set(rule.field.clone(), Value::String(now.to_rfc3339()));
                        resolution.stamped.push(rule.field.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_update(
        &self,
        record: &Record,
        now: DateTime<Utc>,
        resolution: &mut Resolution,
    ) -> Result<(), FieldError> {
        for rule in &self.rules {
            // The latch freezes on `true` only; a stored `false` is still
            // writable in the one permitted direction.
            if rule.mode == ImmutabilityMode::LatchTrue {
                if record.data.get_bool(&rule.field) == Some(true) {
                    if resolution.data.get_bool(&rule.field) != Some(true) {
                        warn!(
                            record = %record.id,
                            record_type = %self.record_type,
                            field = %rule.field,
                            "immutable field write reverted"
                        );
                        resolution.reverted.push(rule.field.clone());
                    }
                    resolution.data.set(rule.field.clone(), Value::Bool(true));
                }
                continue;
            }

            let stored = record.data.get_set(&rule.field).cloned();

            match stored {
                Some(stored_value) => {
                    // Frozen: the stored value wins over any incoming one.
                    let candidate_value = resolution.data.get_set(&rule.field);
                    if candidate_value != Some(&stored_value) {
                        warn!(
                            record = %record.id,
                            record_type = %self.record_type,
                            field = %rule.field,
                            "immutable field write reverted"
                        );
                        resolution.reverted.push(rule.field.clone());
                    }
                    resolution.data.set(rule.field.clone(), stored_value);
                }
                None => {
                    if rule.required_after_create {
                        return Err(FieldError::MissingRequired {
                            record_type: self.record_type,
                            field: rule.field.clone(),
                        });
                    }
                    match &rule.mode {
                        ImmutabilityMode::StampWhen { companion, enters } => {
                            // Stamp only when the companion crosses *into*
                            // the trigger set; a no-op transition that is
                            // already inside it never re-stamps.
                            let was_in = record
                                .data
                                .get_set(companion)
                                .is_some_and(|v| enters.contains(v));
                            let now_in = resolution
                                .data
                                .get_set(companion)
                                .is_some_and(|v| enters.contains(v));
                            if now_in && !was_in {
                                resolution
                                    .data
                                    .set(rule.field.clone(), Value::String(now.to_rfc3339()));
                                resolution.stamped.push(rule.field.clone());
                            }
                        }
                        ImmutabilityMode::OnceSet
                        | ImmutabilityMode::SetOnCreate(_)
                        | ImmutabilityMode::LatchTrue => {
                            // First set happens now (OnceSet), or the field
                            // legitimately has no value (anonymous create).
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn guard() -> FieldGuard {
        FieldGuard::new(RecordType::Enrollment)
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
            .rule(ImmutableField::new(
                "confirmed_at",
                ImmutabilityMode::StampWhen {
                    companion: "status".into(),
                    enters: vec![json!("confirmed")],
                },
            ))
            .rule(ImmutableField::new(
                "certificate_issued",
                ImmutabilityMode::LatchTrue,
            ))
            .rule(ImmutableField::new(
                "certificate_url",
                ImmutabilityMode::OnceSet,
            ))
    }

    fn now() -> DateTime<Utc> {
        "2025-03-01T10:00:00Z".parse().unwrap()
    }

    fn stored_record() -> Record {
        Record::new("enr-1", RecordType::Enrollment)
            .with_field("created_by", "u-1")
            .with_field("enrolled_at", "2025-01-01T00:00:00+00:00")
            .with_status("pending")
    }

    #[test]
    fn test_create_takes_actor_over_client_value() {
        let mut incoming = RecordData::new();
        incoming.set("created_by", "attacker");

        let resolution = guard()
            .resolve(
                Operation::Create,
                Some(&ActorId::new("u-1")),
                incoming,
                None,
                now(),
            )
            .unwrap();
        assert_eq!(resolution.data.get_str("created_by"), Some("u-1"));
        assert!(resolution.data.is_set("enrolled_at"));
    }

    #[test]
    fn test_frozen_field_reverted_for_any_writer() {
        let record = stored_record();
        let mut candidate = record.data.clone();
        candidate.set("created_by", "someone-else");

        let resolution = guard()
            .resolve(
                Operation::Update,
                Some(&ActorId::new("admin-1")),
                candidate,
                Some(&record),
                now(),
            )
            .unwrap();
        assert_eq!(resolution.data.get_str("created_by"), Some("u-1"));
        assert_eq!(resolution.reverted, vec!["created_by".to_string()]);
    }

    #[test]
    fn test_trigger_stamps_once() {
        let record = stored_record();
        let mut candidate = record.data.clone();
        candidate.set("status", "confirmed");

        let resolution = guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(
            resolution.data.get_str("confirmed_at"),
            Some(now().to_rfc3339().as_str())
        );
        assert_eq!(resolution.stamped, vec!["confirmed_at".to_string()]);
    }

    #[test]
    fn test_noop_transition_does_not_restamp() {
        // Status already confirmed, stamp already taken.
        let record = stored_record()
            .with_status("confirmed")
            .with_field("confirmed_at", "2025-02-01T00:00:00+00:00");
        let candidate = record.data.clone();

        let resolution = guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(
            resolution.data.get_str("confirmed_at"),
            Some("2025-02-01T00:00:00+00:00")
        );
        assert!(resolution.stamped.is_empty());
    }

    #[test]
    fn test_latch_never_unlatches() {
        let record = stored_record().with_field("certificate_issued", true);
        let mut candidate = record.data.clone();
        candidate.set("certificate_issued", false);

        let resolution = guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(resolution.data.get_bool("certificate_issued"), Some(true));
        assert!(resolution
            .reverted
            .contains(&"certificate_issued".to_string()));
    }

    #[test]
    fn test_latch_accepts_first_true() {
        let record = stored_record().with_field("certificate_issued", false);
        let mut candidate = record.data.clone();
        candidate.set("certificate_issued", true);

        let resolution = guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(resolution.data.get_bool("certificate_issued"), Some(true));
    }

    #[test]
    fn test_once_set_accepts_first_value_then_freezes() {
        let record = stored_record();
        let mut candidate = record.data.clone();
        candidate.set("certificate_url", "https://certs.example/1");

        let resolution = guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(
            resolution.data.get_str("certificate_url"),
            Some("https://certs.example/1")
        );

        // Second write is reverted.
        let record = stored_record().with_field("certificate_url", "https://certs.example/1");
        let mut candidate = record.data.clone();
        candidate.set("certificate_url", "https://evil.example/x");
        let resolution = guard()
            .resolve(Operation::Update, None, candidate, Some(&record), now())
            .unwrap();
        assert_eq!(
            resolution.data.get_str("certificate_url"),
            Some("https://certs.example/1")
        );
        assert_eq!(resolution.reverted, vec!["certificate_url".to_string()]);
    }

    #[test]
    fn test_missing_required_fails_instead_of_backfilling() {
        let record = Record::new("enr-broken", RecordType::Enrollment).with_status("pending");
        let candidate = record.data.clone();

        let result = guard().resolve(
            Operation::Update,
            Some(&ActorId::new("admin-1")),
            candidate,
            Some(&record),
            now(),
        );
        assert!(matches!(
            result,
            Err(FieldError::MissingRequired { ref field, .. }) if field == "created_by"
        ));
    }

    #[test]
    fn test_anonymous_create_drops_client_owner() {
        let guard = FieldGuard::new(RecordType::Lead).rule(ImmutableField::new(
            "created_by",
            ImmutabilityMode::SetOnCreate(CreateSource::Actor),
        ));
        let mut incoming = RecordData::new();
        incoming.set("created_by", "spoofed");

        let resolution = guard
            .resolve(Operation::Create, None, incoming, None, now())
            .unwrap();
        assert!(!resolution.data.is_set("created_by"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// Once set, arbitrary update attempts leave the field unchanged.
        #[test]
        fn prop_frozen_field_survives_update_storm(attempt in "\\PC*") {
            let record = stored_record();
            let mut candidate = record.data.clone();
            candidate.set("created_by", attempt);

            let resolution = guard()
                .resolve(Operation::Update, None, candidate, Some(&record), now())
                .unwrap();
            prop_assert_eq!(resolution.data.get_str("created_by"), Some("u-1"));
        }
    }
}
