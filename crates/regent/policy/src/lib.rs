//! Regent Policy - role/operation access evaluation
//!
//! Policies are plain data: per record type, a table of (role, operation)
//! rows resolving to an [`Access`] level, plus field rules for the second,
//! independent field-level pass. Evaluation is a pure function of its
//! inputs — identical (role, operation, record, actor) always yields the
//! same decision — so the evaluator needs no locking.
//!
//! Denials carry no detail about which rule triggered. Callers map a
//! [`Decision::Deny`] to a generic "forbidden" outcome; the specific rule
//! is logged here at debug level and goes no further.

#![deny(unsafe_code)]

pub mod defaults;
pub mod protection;

pub use protection::{account_protection_denies, AdminCensus, StaticCensus};

use regent_types::{
    ActorId, Decision, FieldDecision, FieldOperation, Operation, Record, RecordFilter, RecordType,
    Role, ViolationMode,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ── Access levels ────────────────────────────────────────────────────

/// What a (role, operation) row grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Deny,
    Allow,
    /// Only records the actor created.
    OwnerOnly,
    /// Only records assigned to the actor, or unassigned.
    AssignedOrUnassigned,
    /// Only records in the explicitly published state.
    PublishedOnly,
    /// Only records not soft-deleted.
    ActiveOnly,
}

impl Access {
    fn into_decision(self, actor: Option<&ActorId>) -> Decision {
        match self {
            Access::Deny => Decision::Deny,
            Access::Allow => Decision::Allow,
            Access::OwnerOnly => match actor {
                Some(actor) => Decision::AllowWithFilter(RecordFilter::OwnerIs(actor.clone())),
                None => Decision::Deny,
            },
            Access::AssignedOrUnassigned => match actor {
                Some(actor) => {
                    Decision::AllowWithFilter(RecordFilter::AssignedToOrUnassigned(actor.clone()))
                }
                None => Decision::Deny,
            },
            Access::PublishedOnly => Decision::AllowWithFilter(RecordFilter::PublishedOnly),
            Access::ActiveOnly => Decision::AllowWithFilter(RecordFilter::ActiveOnly),
        }
    }
}

// ── Field rules ──────────────────────────────────────────────────────

/// Field-level access for one field of one record type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    /// Roles that may read the field. Empty means every staff role.
    pub read: Vec<Role>,
    /// Roles that may write the field. Empty means system-managed: no
    /// client write is ever accepted.
    pub update: Vec<Role>,
    pub on_violation: ViolationMode,
}

impl FieldRule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            read: Vec::new(),
            update: Vec::new(),
            on_violation: ViolationMode::Strip,
        }
    }

    pub fn readable_by(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.read = roles.into_iter().collect();
        self
    }

    pub fn updatable_by(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.update = roles.into_iter().collect();
        self
    }

    /// A violation rejects the whole write.
    pub fn rejecting(mut self) -> Self {
        self.on_violation = ViolationMode::Reject;
        self
    }

    /// System-managed: nobody writes it through the API; client values are
    /// silently dropped.
    pub fn system_managed(mut self) -> Self {
        self.update = Vec::new();
        self.on_violation = ViolationMode::Strip;
        self
    }
}

// ── Record policy ────────────────────────────────────────────────────

/// The full policy for one record type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordPolicy {
    pub record_type: RecordType,
    rows: Vec<AccessRow>,
    field_rules: Vec<FieldRule>,
    /// Roles allowed to update fields without an explicit rule.
    unlisted_update: Vec<Role>,
    /// Violation mode for fields without an explicit rule.
    unlisted_violation: ViolationMode,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AccessRow {
    role: Role,
    operation: Operation,
    access: Access,
}

impl RecordPolicy {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            rows: Vec::new(),
            field_rules: Vec::new(),
            unlisted_update: Vec::new(),
            unlisted_violation: ViolationMode::Strip,
        }
    }

    pub fn grant(mut self, role: Role, operation: Operation, access: Access) -> Self {
        self.rows.push(AccessRow {
            role,
            operation,
            access,
        });
        self
    }

    /// Grant `access` for `operation` to each role in `roles`.
    pub fn grant_each(
        mut self,
        roles: impl IntoIterator<Item = Role>,
        operation: Operation,
        access: Access,
    ) -> Self {
        for role in roles {
            self.rows.push(AccessRow {
                role,
                operation,
                access,
            });
        }
        self
    }

    pub fn field_rule(mut self, rule: FieldRule) -> Self {
        self.field_rules.push(rule);
        self
    }

    pub fn unlisted_fields(
        mut self,
        update: impl IntoIterator<Item = Role>,
        on_violation: ViolationMode,
    ) -> Self {
        self.unlisted_update = update.into_iter().collect();
        self.unlisted_violation = on_violation;
        self
    }

    fn access_for(&self, role: Role, operation: Operation) -> Access {
        self.rows
            .iter()
            .find(|row| row.role == role && row.operation == operation)
            .map(|row| row.access)
            // No row means no grant.
            .unwrap_or(Access::Deny)
    }

    fn rule_for(&self, field: &str) -> Option<&FieldRule> {
        self.field_rules.iter().find(|rule| rule.field == field)
    }
}

// ── Evaluator ────────────────────────────────────────────────────────

/// Evaluates record-level and field-level access for every governed type.
#[derive(Clone, Debug, Default)]
pub struct PolicyEvaluator {
    policies: HashMap<RecordType, RecordPolicy>,
}

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The education-domain default tables.
    pub fn with_defaults() -> Self {
        defaults::education_defaults()
    }

    pub fn add_policy(&mut self, policy: RecordPolicy) {
        self.policies.insert(policy.record_type, policy);
    }

    pub fn policy(&self, record_type: RecordType) -> Option<&RecordPolicy> {
        self.policies.get(&record_type)
    }

    /// Record-level evaluation.
    ///
    /// When `record` is supplied, scoped grants are resolved against it;
    /// otherwise the caller receives the filter to apply at query time.
    pub fn evaluate(
        &self,
        role: Role,
        operation: Operation,
        record_type: RecordType,
        record: Option<&Record>,
        actor: Option<&ActorId>,
    ) -> Decision {
        let Some(policy) = self.policies.get(&record_type) else {
            debug!(%record_type, "no policy registered, denying");
            return Decision::Deny;
        };

        let decision = policy.access_for(role, operation).into_decision(actor);

        let resolved = match decision {
            Decision::AllowWithFilter(filter) => match record {
                Some(record) => {
                    if filter.matches(record) {
                        Decision::Allow
                    } else {
                        Decision::Deny
                    }
                }
                None => Decision::AllowWithFilter(filter),
            },
            other => other,
        };

        if resolved == Decision::Deny {
            debug!(%role, %operation, %record_type, "record-level access denied");
        }
        resolved
    }

    /// Field-level evaluation — a second pass, independent of the
    /// record-level decision. A role may pass record-level update and still
    /// be denied specific fields.
    pub fn evaluate_field(
        &self,
        role: Role,
        operation: FieldOperation,
        record_type: RecordType,
        field: &str,
    ) -> FieldDecision {
        let Some(policy) = self.policies.get(&record_type) else {
            return FieldDecision::Deny(ViolationMode::Reject);
        };

        match policy.rule_for(field) {
            Some(rule) => match operation {
                FieldOperation::Read => {
                    if rule.read.is_empty() && role.is_staff() {
                        FieldDecision::Allow
                    } else if rule.read.contains(&role) {
                        FieldDecision::Allow
                    } else {
                        FieldDecision::Deny(rule.on_violation)
                    }
                }
                FieldOperation::Update => {
                    if rule.update.contains(&role) {
                        FieldDecision::Allow
                    } else {
                        FieldDecision::Deny(rule.on_violation)
                    }
                }
            },
            None => match operation {
                // Unlisted fields are readable by staff.
                FieldOperation::Read => {
                    if role.is_staff() {
                        FieldDecision::Allow
                    } else {
                        FieldDecision::Deny(policy.unlisted_violation)
                    }
                }
                FieldOperation::Update => {
                    if policy.unlisted_update.contains(&role) {
                        FieldDecision::Allow
                    } else {
                        FieldDecision::Deny(policy.unlisted_violation)
                    }
                }
            },
        }
    }
}
