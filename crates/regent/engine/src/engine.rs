//! The governance facade.
//!
//! [`GovernanceEngine::authorize_and_apply`] is the single entry point a
//! record-mutation pipeline calls before persistence. The order is fixed:
//!
//! 1. record-level policy (plus account self-protection) — short-circuit
//!    deny;
//! 2. field-level policy per touched field — strip or reject per field
//!    configuration;
//! 3. field guard resolution of every protected field;
//! 4. financial checks where configured;
//! 5. workflow transition validation, then the capacity ledger as part of
//!    the same logical step.
//!
//! Everything up to the ledger call is pure; the ledger mutation is the
//! only shared-state effect and runs only after every validation has
//! passed, so an aborted call leaves no partial state. The idempotent
//! claim journal lets a caller replay the ledger step after a crash
//! between ledger commit and record persistence.

use crate::config::{GovernanceConfig, RecordGovernance};
use crate::duplicate::DuplicateResolution;
use chrono::{DateTime, Utc};
use regent_capacity::{AdmissionOutcome, ClaimId, LedgerError, LedgerStore, ResourceId};
use regent_fields::FieldError;
use regent_policy::{account_protection_denies, AdminCensus, PolicyEvaluator};
use regent_types::{
    ActorId, Decision, FieldDecision, FieldOperation, Operation, Record, RecordData, RecordId,
    RecordType, Role, Status, ViolationMode,
};
use regent_workflow::{CapacityEffect, Transition, TransitionError};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

// ── Requests and outcomes ────────────────────────────────────────────

/// One governed mutation, as the persistence layer presents it.
#[derive(Clone, Debug)]
pub struct MutationRequest {
    /// The authenticated actor; `None` for anonymous (public) requests.
    pub actor: Option<ActorId>,
    pub role: Role,
    pub operation: Operation,
    pub record_type: RecordType,
    /// The client's field patch.
    pub incoming: RecordData,
    /// The stored snapshot; required for updates and deletes of existing
    /// records.
    pub existing: Option<Record>,
    /// Request-scoped correlation id for capacity idempotency. Falls back
    /// to the record id, then to a generated id for capacity-bound
    /// creates.
    pub claim: Option<ClaimId>,
}

impl MutationRequest {
    pub fn create(
        role: Role,
        actor: Option<ActorId>,
        record_type: RecordType,
        incoming: RecordData,
    ) -> Self {
        Self {
            actor,
            role,
            operation: Operation::Create,
            record_type,
            incoming,
            existing: None,
            claim: None,
        }
    }

    pub fn update(
        role: Role,
        actor: Option<ActorId>,
        existing: Record,
        incoming: RecordData,
    ) -> Self {
        Self {
            actor,
            role,
            operation: Operation::Update,
            record_type: existing.record_type,
            incoming,
            existing: Some(existing),
            claim: None,
        }
    }

    pub fn delete(role: Role, actor: Option<ActorId>, existing: Record) -> Self {
        Self {
            actor,
            role,
            operation: Operation::Delete,
            record_type: existing.record_type,
            incoming: RecordData::new(),
            existing: Some(existing),
            claim: None,
        }
    }

    pub fn with_claim(mut self, claim: ClaimId) -> Self {
        self.claim = Some(claim);
        self
    }
}

/// A status move the caller must persist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub from: Status,
    pub to: Status,
}

/// How the capacity ledger resolved this mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapacityResolution {
    Admitted {
        resource: ResourceId,
        claim: ClaimId,
        replayed: bool,
    },
    Waitlisted {
        resource: ResourceId,
        claim: ClaimId,
        position: u32,
        replayed: bool,
    },
    Released {
        resource: ResourceId,
        claim: ClaimId,
        promoted: Option<ClaimId>,
    },
}

/// A fully resolved mutation, ready for persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovedMutation {
    pub record_type: RecordType,
    pub operation: Operation,
    /// The complete resolved value set (empty for deletes).
    pub data: RecordData,
    pub status_change: Option<StatusChange>,
    /// Fields stamped during this call.
    pub stamped: Vec<String>,
    /// Fields dropped by field-level policy.
    pub stripped: Vec<String>,
    /// Immutable fields whose incoming value was reverted.
    pub reverted: Vec<String>,
    pub capacity: Option<CapacityResolution>,
}

/// A structured denial. Callers map each variant to a distinct externally
/// visible outcome; none carries policy internals, PII, or amounts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("forbidden")]
    NotPermitted,
    #[error("invalid status transition for {record_type}: {from} -> {to}")]
    InvalidTransition {
        record_type: RecordType,
        from: Status,
        to: Status,
    },
    #[error("precondition failed: {reason}")]
    PreconditionFailed { reason: String },
    #[error("capacity intake closed for resource {resource}")]
    CapacityExceeded { resource: ResourceId },
    /// Indicates corruption, not user error. Fatal: surfaced distinctly
    /// and never retried.
    #[error("data integrity violation on {record_type}: {field}")]
    DataIntegrity {
        record_type: RecordType,
        field: String,
    },
}

impl Denial {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Denial::DataIntegrity { .. })
    }
}

// ── Engine ───────────────────────────────────────────────────────────

/// The composed governance engine.
pub struct GovernanceEngine {
    config: GovernanceConfig,
    policy: PolicyEvaluator,
    ledgers: Arc<LedgerStore>,
    census: Arc<dyn AdminCensus>,
}

impl GovernanceEngine {
    pub fn new(
        config: GovernanceConfig,
        ledgers: Arc<LedgerStore>,
        census: Arc<dyn AdminCensus>,
    ) -> Self {
        let mut policy = PolicyEvaluator::new();
        for governance in config.records() {
            policy.add_policy(governance.policy.clone());
        }
        Self {
            config,
            policy,
            ledgers,
            census,
        }
    }

    /// An engine on the education-domain defaults.
    pub fn with_defaults(ledgers: Arc<LedgerStore>, census: Arc<dyn AdminCensus>) -> Self {
        Self::new(GovernanceConfig::education_defaults(), ledgers, census)
    }

    pub fn ledgers(&self) -> &Arc<LedgerStore> {
        &self.ledgers
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Record-level read authorization; scoped roles receive the filter to
    /// apply at query time.
    pub fn authorize_read(
        &self,
        role: Role,
        record_type: RecordType,
        actor: Option<&ActorId>,
    ) -> Decision {
        self.policy
            .evaluate(role, Operation::Read, record_type, None, actor)
    }

    /// Strip fields the role may not read from a record snapshot.
    pub fn redact_for_read(&self, role: Role, record: &Record) -> RecordData {
        let mut data = record.data.clone();
        let denied: Vec<String> = record
            .data
            .fields()
            .filter(|field| {
                !self
                    .policy
                    .evaluate_field(role, FieldOperation::Read, record.record_type, field)
                    .is_allowed()
            })
            .cloned()
            .collect();
        for field in denied {
            data.remove(&field);
        }
        data
    }

    /// Resolve a lead submission against the configured duplicate window.
    pub fn resolve_duplicate_lead(
        &self,
        now: DateTime<Utc>,
        most_recent: Option<(&RecordId, DateTime<Utc>)>,
    ) -> DuplicateResolution {
        match self
            .config
            .record(RecordType::Lead)
            .and_then(|governance| governance.duplicates.as_ref())
        {
            Some(policy) => policy.resolve(now, most_recent),
            None => DuplicateResolution::CreateNew,
        }
    }

    /// Authorize a mutation and resolve it for persistence.
    pub fn authorize_and_apply(
        &self,
        request: MutationRequest,
    ) -> Result<ApprovedMutation, Denial> {
        self.authorize_and_apply_at(request, Utc::now())
    }

    /// As [`Self::authorize_and_apply`], with an explicit clock.
    pub fn authorize_and_apply_at(
        &self,
        request: MutationRequest,
        now: DateTime<Utc>,
    ) -> Result<ApprovedMutation, Denial> {
        let MutationRequest {
            actor,
            role,
            operation,
            record_type,
            incoming,
            existing,
            claim,
        } = request;

        let Some(governance) = self.config.record(record_type) else {
            warn!(%record_type, "mutation against unconfigured record type");
            return Err(Denial::NotPermitted);
        };

        if operation.mutates() && operation != Operation::Create && existing.is_none() {
            return Err(Denial::DataIntegrity {
                record_type,
                field: "existing_record".into(),
            });
        }

        // (1) record-level policy, with the account self-protection veto.
        if let (Some(actor), Some(record)) = (&actor, &existing) {
            if account_protection_denies(
                actor,
                operation,
                record,
                Some(&incoming),
                self.census.as_ref(),
            ) {
                return Err(Denial::NotPermitted);
            }
        }

        let decision =
            self.policy
                .evaluate(role, operation, record_type, existing.as_ref(), actor.as_ref());
        if !decision.is_allowed() {
            return Err(Denial::NotPermitted);
        }

        match operation {
            Operation::Read => Ok(ApprovedMutation {
                record_type,
                operation,
                data: existing.map(|record| record.data).unwrap_or_default(),
                status_change: None,
                stamped: Vec::new(),
                stripped: Vec::new(),
                reverted: Vec::new(),
                capacity: None,
            }),
            Operation::Delete => self.apply_delete(governance, existing, claim),
            Operation::Create | Operation::Update => self.apply_write(
                governance,
                operation,
                role,
                actor,
                incoming,
                existing,
                claim,
                now,
            ),
        }
    }

    fn apply_delete(
        &self,
        governance: &RecordGovernance,
        existing: Option<Record>,
        claim: Option<ClaimId>,
    ) -> Result<ApprovedMutation, Denial> {
        let mut capacity = None;

        // A hard delete frees any seat the record still holds.
        if let (Some(binding), Some(record)) = (&governance.capacity, &existing) {
            if let Some(resource) = record.data.get_str(&binding.resource_field) {
                let resource = ResourceId::new(resource);
                let claim = claim.unwrap_or_else(|| ClaimId::new(record.id.as_str()));
                match self.ledgers.release(&resource, &claim) {
                    Ok(release) if release.released || release.promoted.is_some() => {
                        capacity = Some(CapacityResolution::Released {
                            resource,
                            claim,
                            promoted: release.promoted,
                        });
                    }
                    Ok(_) => {}
                    Err(error) => {
                        debug!(%error, "no ledger release on delete");
                    }
                }
            }
        }

        Ok(ApprovedMutation {
            record_type: governance.record_type,
            operation: Operation::Delete,
            data: RecordData::new(),
            status_change: None,
            stamped: Vec::new(),
            stripped: Vec::new(),
            reverted: Vec::new(),
            capacity,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_write(
        &self,
        governance: &RecordGovernance,
        operation: Operation,
        role: Role,
        actor: Option<ActorId>,
        incoming: RecordData,
        existing: Option<Record>,
        claim: Option<ClaimId>,
        now: DateTime<Utc>,
    ) -> Result<ApprovedMutation, Denial> {
        let record_type = governance.record_type;

        // (2) field-level pass over the client patch.
        let mut sanitized = incoming.clone();
        let mut stripped = Vec::new();
        for field in incoming.fields() {
            match self
                .policy
                .evaluate_field(role, FieldOperation::Update, record_type, field)
            {
                FieldDecision::Allow => {}
                FieldDecision::Deny(ViolationMode::Strip) => {
                    debug!(%record_type, %field, "disallowed field stripped");
                    sanitized.remove(field);
                    stripped.push(field.clone());
                }
                FieldDecision::Deny(ViolationMode::Reject) => {
                    warn!(%record_type, %field, "disallowed field write rejected");
                    return Err(Denial::NotPermitted);
                }
            }
        }

        // Mint the business identifier; the strip pass above has already
        // discarded any client-supplied value for it.
        if operation == Operation::Create {
            if let Some(generated) = &governance.generated_id {
                if !sanitized.is_set(&generated.field) {
                    let suffix = uuid::Uuid::new_v4().simple().to_string();
                    sanitized.set(
                        generated.field.clone(),
                        format!(
                            "{}-{}-{}",
                            generated.prefix,
                            now.format("%Y%m%d"),
                            suffix[..4].to_uppercase()
                        ),
                    );
                }
            }
        }

        // (3) merge to the candidate view and resolve protected fields.
        let candidate = match &existing {
            Some(record) => record.data.merged_with(&sanitized),
            None => sanitized,
        };
        let resolution = governance
            .guard
            .resolve(operation, actor.as_ref(), candidate, existing.as_ref(), now)
            .map_err(|error| match error {
                FieldError::MissingRequired { record_type, field } => {
                    Denial::DataIntegrity { record_type, field }
                }
            })?;
        let mut candidate = resolution.data;
        let mut stamped = resolution.stamped;
        let reverted = resolution.reverted;

        // (4) financial coherence and derivation.
        if let Some(financial) = &governance.financial {
            financial
                .validate(operation, &candidate)
                .map_err(|reason| Denial::PreconditionFailed { reason })?;
            if let Some(status) = financial.derive_status(&candidate, existing.as_ref()) {
                candidate.set(financial.status_field.clone(), status);
            }
        }

        // (5) workflow transition, then the ledger as one logical step.
        let mut status_change = None;
        let mut capacity_effect = None;
        let mut transition_stamps: Vec<String> = Vec::new();

        if let Some(workflow) = &governance.workflow {
            let current = match &existing {
                Some(record) => record.status().ok_or(Denial::DataIntegrity {
                    record_type,
                    field: "status".into(),
                })?,
                None => workflow.initial.clone(),
            };
            let requested = candidate
                .get_str("status")
                .map(Status::new)
                .unwrap_or_else(|| current.clone());
            if existing.is_none() && !candidate.is_set("status") {
                candidate.set("status", workflow.initial.as_str());
            }

            match workflow.transition(&current, &requested, &candidate) {
                Ok(Transition::NoOp) => {}
                Ok(Transition::Move(effects)) => {
                    for field in &effects.stamps {
                        if !candidate.is_set(field) {
                            candidate.set(field.clone(), now.to_rfc3339());
                            stamped.push(field.clone());
                        }
                    }
                    transition_stamps = effects.stamps;
                    capacity_effect = effects.capacity;
                    status_change = Some(StatusChange {
                        from: current,
                        to: requested,
                    });
                }
                Err(TransitionError::InvalidTransition { from, to, .. }) => {
                    return Err(Denial::InvalidTransition {
                        record_type,
                        from,
                        to,
                    });
                }
                Err(TransitionError::UnknownStatus { status, .. }) => {
                    return Err(Denial::InvalidTransition {
                        record_type,
                        from: current,
                        to: status,
                    });
                }
                Err(TransitionError::PreconditionFailed { reason })
                | Err(TransitionError::ValidationError(reason)) => {
                    return Err(Denial::PreconditionFailed { reason });
                }
            }
        }

        let capacity = match (&governance.capacity, capacity_effect) {
            (Some(binding), Some(effect)) => {
                let resource = candidate.get_str(&binding.resource_field).ok_or_else(|| {
                    Denial::DataIntegrity {
                        record_type,
                        field: binding.resource_field.clone(),
                    }
                })?;
                let resource = ResourceId::new(resource);
                let claim = claim
                    .or_else(|| existing.as_ref().map(|r| ClaimId::new(r.id.as_str())))
                    .unwrap_or_else(ClaimId::generate);
                Some(self.apply_capacity(
                    record_type,
                    effect,
                    resource,
                    claim,
                    &mut candidate,
                    &mut status_change,
                    &mut stamped,
                    &transition_stamps,
                )?)
            }
            _ => None,
        };

        Ok(ApprovedMutation {
            record_type,
            operation,
            data: candidate,
            status_change,
            stamped,
            stripped,
            reverted,
            capacity,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_capacity(
        &self,
        record_type: RecordType,
        effect: CapacityEffect,
        resource: ResourceId,
        claim: ClaimId,
        candidate: &mut RecordData,
        status_change: &mut Option<StatusChange>,
        stamped: &mut Vec<String>,
        transition_stamps: &[String],
    ) -> Result<CapacityResolution, Denial> {
        let ledger_denial = |error: LedgerError| match error {
            LedgerError::UnknownResource(resource) => {
                warn!(%resource, "capacity-bound write against unregistered resource");
                Denial::DataIntegrity {
                    record_type,
                    field: "capacity_ledger".into(),
                }
            }
            LedgerError::Poisoned(_) => Denial::DataIntegrity {
                record_type,
                field: "capacity_ledger".into(),
            },
        };

        match effect {
            CapacityEffect::Admit => {
                let admission = self
                    .ledgers
                    .request_admission(&resource, &claim)
                    .map_err(ledger_denial)?;
                match admission.outcome {
                    AdmissionOutcome::Committed => {
                        candidate.set("waitlist_position", Value::Null);
                        Ok(CapacityResolution::Admitted {
                            resource,
                            claim,
                            replayed: admission.replayed,
                        })
                    }
                    AdmissionOutcome::Waitlisted(position) => {
                        // Lost the seat race: the record lands on the
                        // waitlist instead, and the stamps this transition
                        // took are rolled back — they never persisted.
                        for field in transition_stamps {
                            if stamped.iter().any(|s| s == field) {
                                candidate.remove(field);
                                stamped.retain(|s| s != field);
                            }
                        }
                        candidate.set("status", "waitlisted");
                        candidate.set("waitlist_position", position);
                        *status_change = status_change.take().map(|change| StatusChange {
                            from: change.from,
                            to: Status::new("waitlisted"),
                        });
                        Ok(CapacityResolution::Waitlisted {
                            resource,
                            claim,
                            position,
                            replayed: admission.replayed,
                        })
                    }
                    AdmissionOutcome::Rejected => Err(Denial::CapacityExceeded { resource }),
                }
            }
            CapacityEffect::Waitlist => {
                let admission = self
                    .ledgers
                    .join_waitlist(&resource, &claim)
                    .map_err(ledger_denial)?;
                match admission.outcome {
                    AdmissionOutcome::Waitlisted(position) => {
                        candidate.set("waitlist_position", position);
                        Ok(CapacityResolution::Waitlisted {
                            resource,
                            claim,
                            position,
                            replayed: admission.replayed,
                        })
                    }
                    AdmissionOutcome::Committed => {
                        // Replay of a claim that already holds a seat: the
                        // ledger is the truth, the record follows it.
                        candidate.set("status", "confirmed");
                        candidate.set("waitlist_position", Value::Null);
                        *status_change = status_change.take().map(|change| StatusChange {
                            from: change.from,
                            to: Status::new("confirmed"),
                        });
                        Ok(CapacityResolution::Admitted {
                            resource,
                            claim,
                            replayed: true,
                        })
                    }
                    AdmissionOutcome::Rejected => Err(Denial::CapacityExceeded { resource }),
                }
            }
            CapacityEffect::Release | CapacityEffect::DropWaitlisted => {
                let release = self
                    .ledgers
                    .release(&resource, &claim)
                    .map_err(ledger_denial)?;
                candidate.set("waitlist_position", Value::Null);
                Ok(CapacityResolution::Released {
                    resource,
                    claim,
                    promoted: release.promoted,
                })
            }
        }
    }
}
